use tracing::warn;

use super::delayed::{DelayedCompensation, delayed_compensation};
use super::medical_director::allocate_medical_director;
use super::payroll::{benefits_cost, employer_payroll_taxes};
use super::proration::{
    employee_portion, fte_weight, is_employee_like, is_modelled_year, is_partner_eligible,
};
use super::types::{
    CompensationRow, PhysicianRecord, PoolBreakdown, PracticeSummary, ProjectionSettings,
    RoleKind, RoleState, YearFinancials, clamp_money, round_cents,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmployeeCost {
    pub salary_portion: f64,
    pub bonus: f64,
    pub benefits: f64,
    pub payroll_taxes: f64,
}

impl EmployeeCost {
    pub fn wages(self) -> f64 {
        self.salary_portion + self.bonus
    }

    pub fn total(self) -> f64 {
        self.salary_portion + self.bonus + self.benefits + self.payroll_taxes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicianOutcome {
    pub physician_id: String,
    pub name: String,
    pub role: RoleKind,
    pub fte_weight: f64,
    pub employee_cost: EmployeeCost,
    pub delayed: DelayedCompensation,
    pub pool_share: f64,
    pub medical_director: f64,
    pub buyout: f64,
    pub compensation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearComputation {
    pub year: i32,
    pub breakdown: PoolBreakdown,
    pub physicians: Vec<PhysicianOutcome>,
}

impl YearComputation {
    pub fn total_compensation(&self) -> f64 {
        self.physicians.iter().map(|p| p.compensation).sum()
    }

    pub fn total_pool_shares(&self) -> f64 {
        self.physicians.iter().map(|p| p.pool_share).sum()
    }

    pub fn rows(&self) -> Vec<CompensationRow> {
        self.physicians
            .iter()
            .map(|p| CompensationRow {
                physician_id: p.physician_id.clone(),
                name: p.name.clone(),
                role: p.role,
                compensation: round_cents(p.compensation),
                salary_portion: round_cents(p.employee_cost.salary_portion),
                bonus: round_cents(p.employee_cost.bonus),
                pool_share: round_cents(p.pool_share),
                medical_director: round_cents(p.medical_director),
                buyout: round_cents(p.buyout),
                delayed_compensation: round_cents(p.delayed.amount),
            })
            .collect()
    }

    pub fn rounded_breakdown(&self) -> PoolBreakdown {
        let b = self.breakdown;
        PoolBreakdown {
            base_pool: round_cents(b.base_pool),
            distributable_pool: round_cents(b.distributable_pool),
            total_employee_cost: round_cents(b.total_employee_cost),
            total_buyout_cost: round_cents(b.total_buyout_cost),
            total_delayed_cost: round_cents(b.total_delayed_cost),
            total_medical_director_allocation: round_cents(b.total_medical_director_allocation),
        }
    }
}

/// What the practice spends on a physician's employee time this year. Salary
/// is scaled by the employee portion of the year; a bonus is paid in full.
pub fn employee_cost(
    record: &PhysicianRecord,
    year: i32,
    benefit_growth_pct: f64,
) -> EmployeeCost {
    if !is_employee_like(record) {
        return EmployeeCost::default();
    }
    let portion = employee_portion(record);
    let salary_portion = clamp_money(record.salary) * portion;
    let bonus = clamp_money(record.bonus_amount);
    // The waiting-period rule already prorates a new hire's benefits.
    let benefits = match record.role_state {
        RoleState::NewEmployee { .. } => benefits_cost(record, year, benefit_growth_pct),
        _ => benefits_cost(record, year, benefit_growth_pct) * portion,
    };
    let payroll_taxes = employer_payroll_taxes(salary_portion + bonus, year);
    EmployeeCost {
        salary_portion,
        bonus,
        benefits,
        payroll_taxes,
    }
}

fn buyout_cost(record: &PhysicianRecord) -> f64 {
    match record.role_state {
        RoleState::PartnerRetiring { buyout_cost, .. } => clamp_money(buyout_cost),
        _ => 0.0,
    }
}

/// Runs the full waterfall for one year: employee costs, buyouts, delayed
/// wages and medical director pools come off the top, and what remains is
/// split among partners by FTE weight.
pub fn compute_year(year: &YearFinancials, settings: &ProjectionSettings) -> YearComputation {
    if !is_modelled_year(year.year) {
        warn!(year = year.year, "year outside the modelled calendar; nothing computed");
        return YearComputation {
            year: year.year,
            breakdown: PoolBreakdown::default(),
            physicians: Vec::new(),
        };
    }
    let costs: Vec<EmployeeCost> = year
        .physicians
        .iter()
        .map(|p| employee_cost(p, year.year, settings.benefit_growth_pct))
        .collect();
    let delayed: Vec<DelayedCompensation> = year
        .physicians
        .iter()
        .map(|p| delayed_compensation(p, year.year))
        .collect();
    let weights: Vec<f64> = year
        .physicians
        .iter()
        .map(|p| if is_partner_eligible(p) { fte_weight(p) } else { 0.0 })
        .collect();

    let total_employee_cost: f64 = costs.iter().map(|c| c.total()).sum();
    // A partner who retired in an earlier year carries zero weight and is
    // no longer a cost to this year.
    let total_buyout_cost: f64 = year
        .physicians
        .iter()
        .zip(&weights)
        .filter(|(_, weight)| **weight > 0.0)
        .map(|(p, _)| buyout_cost(p))
        .sum();
    let total_delayed_cost: f64 = delayed.iter().map(|d| d.amount + d.taxes).sum();

    let allocation = allocate_medical_director(
        year.medical_director_pool,
        year.prcs_director_pool,
        year.prcs_director_physician_id.as_deref(),
        &year.physicians,
    );

    let base_pool = (clamp_money(year.therapy_income)
        - clamp_money(year.non_employment_costs)
        - clamp_money(year.non_md_employment_costs)
        - clamp_money(year.misc_employment_costs)
        - clamp_money(year.locum_costs)
        - total_employee_cost
        - total_buyout_cost
        - total_delayed_cost)
        .max(0.0);
    let distributable_pool = (base_pool - allocation.total).max(0.0);

    let weight_sum: f64 = weights.iter().sum();
    let physicians = year
        .physicians
        .iter()
        .zip(costs)
        .zip(delayed)
        .zip(&weights)
        .map(|(((record, cost), delayed), &weight)| {
            let pool_share = if weight_sum > 0.0 {
                distributable_pool * weight / weight_sum
            } else {
                0.0
            };
            let medical_director = allocation.amount_for(&record.id);
            let buyout = buyout_cost(record);
            let compensation = if is_partner_eligible(record) {
                pool_share + medical_director + buyout + cost.wages() + delayed.amount
            } else {
                cost.wages() + delayed.amount
            };
            PhysicianOutcome {
                physician_id: record.id.clone(),
                name: record.name.clone(),
                role: record.kind(),
                fte_weight: weight,
                employee_cost: cost,
                delayed,
                pool_share,
                medical_director,
                buyout,
                compensation,
            }
        })
        .collect();

    YearComputation {
        year: year.year,
        breakdown: PoolBreakdown {
            base_pool,
            distributable_pool,
            total_employee_cost,
            total_buyout_cost,
            total_delayed_cost,
            total_medical_director_allocation: allocation.total,
        },
        physicians,
    }
}

pub fn practice_summary(year: &YearFinancials, computation: &YearComputation) -> PracticeSummary {
    let b = computation.breakdown;
    let total_costs = clamp_money(year.non_employment_costs)
        + clamp_money(year.non_md_employment_costs)
        + clamp_money(year.misc_employment_costs)
        + clamp_money(year.locum_costs)
        + b.total_employee_cost
        + b.total_delayed_cost;
    let income = clamp_money(year.therapy_income);
    PracticeSummary {
        year: year.year,
        therapy_income: round_cents(income),
        total_costs: round_cents(total_costs),
        net_income: round_cents(income - total_costs),
        total_compensation: round_cents(computation.total_compensation()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payroll::annual_benefit_cost;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn partner(id: &str, weeks: f64) -> PhysicianRecord {
        let mut record = PhysicianRecord::new(id, format!("Dr. {id}"), RoleState::Partner);
        record.weeks_vacation = weeks;
        record
    }

    fn employee(id: &str, salary: f64) -> PhysicianRecord {
        let mut record = PhysicianRecord::new(id, format!("Dr. {id}"), RoleState::Employee);
        record.salary = salary;
        record.receives_benefits = true;
        record
    }

    fn bare_year(physicians: Vec<PhysicianRecord>) -> YearFinancials {
        let mut year = YearFinancials::empty(2025);
        year.therapy_income = 3_164_006.93;
        year.non_employment_costs = 229_713.57;
        year.physicians = physicians;
        year
    }

    #[test]
    fn two_partner_split_matches_hand_calculation() {
        let year = bare_year(vec![partner("a", 9.0), partner("b", 11.0)]);
        let result = compute_year(&year, &ProjectionSettings::default());

        let pool = 3_164_006.93 - 229_713.57;
        assert_approx(result.breakdown.distributable_pool, pool);
        assert_approx(result.physicians[0].fte_weight, 43.0 / 52.0);
        assert_approx(result.physicians[1].fte_weight, 41.0 / 52.0);
        assert_approx(result.physicians[0].compensation, pool * 43.0 / 84.0);
        assert_approx(result.physicians[1].compensation, pool * 41.0 / 84.0);
        assert_approx(result.total_pool_shares(), pool);
    }

    #[test]
    fn employee_cost_includes_benefits_and_taxes_but_pay_does_not() {
        let year = bare_year(vec![partner("a", 8.0), employee("e", 400_000.0)]);
        let settings = ProjectionSettings::default();
        let result = compute_year(&year, &settings);

        let taxes = employer_payroll_taxes(400_000.0, 2025);
        let benefits = annual_benefit_cost(2025, settings.benefit_growth_pct);
        assert_approx(
            result.breakdown.total_employee_cost,
            400_000.0 + taxes + benefits,
        );
        assert_approx(result.physicians[1].compensation, 400_000.0);
        assert_approx(result.physicians[1].pool_share, 0.0);
        assert_approx(
            result.physicians[0].compensation,
            3_164_006.93 - 229_713.57 - 400_000.0 - taxes - benefits,
        );
    }

    #[test]
    fn years_outside_the_calendar_compute_nothing() {
        for extreme in [i32::MIN, i32::MAX, 1_000_000] {
            let mut year = bare_year(vec![partner("a", 8.0), employee("e", 400_000.0)]);
            year.year = extreme;
            let result = compute_year(&year, &ProjectionSettings::default());
            assert_eq!(result.year, extreme);
            assert!(result.physicians.is_empty());
            assert_eq!(result.breakdown, PoolBreakdown::default());
        }
    }

    #[test]
    fn terminating_employee_is_prorated() {
        let mut leaving = employee("e", 300_000.0);
        leaving.role_state = RoleState::EmployeeTerminating {
            terminate_portion_of_year: 0.5,
        };
        leaving.bonus_amount = 10_000.0;
        let cost = employee_cost(&leaving, 2025, 5.0);
        assert_approx(cost.salary_portion, 150_000.0);
        assert_approx(cost.bonus, 10_000.0);
        assert_approx(cost.benefits, 16_000.0);
        assert_approx(cost.payroll_taxes, employer_payroll_taxes(160_000.0, 2025));
    }

    #[test]
    fn partners_carry_no_employee_cost() {
        let mut record = partner("a", 8.0);
        record.salary = 500_000.0;
        record.receives_benefits = true;
        assert_eq!(employee_cost(&record, 2025, 5.0), EmployeeCost::default());
    }

    #[test]
    fn fully_retired_partner_still_gets_buyout_but_no_share() {
        let mut retired = partner("r", 8.0);
        retired.role_state = RoleState::PartnerRetiring {
            partner_portion_of_year: 0.0,
            buyout_cost: 75_000.0,
        };
        let year = bare_year(vec![partner("a", 8.0), retired]);
        let result = compute_year(&year, &ProjectionSettings::default());

        assert_approx(result.breakdown.total_buyout_cost, 0.0);
        assert_approx(result.physicians[1].pool_share, 0.0);
        assert_approx(result.physicians[1].compensation, 75_000.0);
        assert_approx(
            result.physicians[0].pool_share,
            result.breakdown.distributable_pool,
        );
    }

    #[test]
    fn retiring_partner_with_weight_costs_the_pool_its_buyout() {
        let mut retiring = partner("r", 0.0);
        retiring.role_state = RoleState::PartnerRetiring {
            partner_portion_of_year: 0.5,
            buyout_cost: 50_000.0,
        };
        let year = bare_year(vec![partner("a", 0.0), retiring]);
        let result = compute_year(&year, &ProjectionSettings::default());

        let pool = 3_164_006.93 - 229_713.57 - 50_000.0;
        assert_approx(result.breakdown.total_buyout_cost, 50_000.0);
        assert_approx(result.breakdown.distributable_pool, pool);
        assert_approx(result.physicians[1].pool_share, pool / 3.0);
        assert_approx(result.physicians[1].compensation, pool / 3.0 + 50_000.0);
    }

    #[test]
    fn medical_director_pools_come_off_the_top() {
        let mut a = partner("a", 0.0);
        a.has_medical_director_hours = true;
        a.medical_director_hours_percentage = 100.0;
        let mut year = bare_year(vec![a, partner("b", 0.0)]);
        year.medical_director_pool = 100_000.0;
        year.prcs_director_pool = 60_000.0;
        year.prcs_director_physician_id = Some("b".to_string());

        let result = compute_year(&year, &ProjectionSettings::default());
        let pool = 3_164_006.93 - 229_713.57 - 160_000.0;
        assert_approx(result.breakdown.total_medical_director_allocation, 160_000.0);
        assert_approx(result.breakdown.distributable_pool, pool);
        assert_approx(result.physicians[0].compensation, pool / 2.0 + 100_000.0);
        assert_approx(result.physicians[1].compensation, pool / 2.0 + 60_000.0);
    }

    #[test]
    fn costs_above_income_floor_the_pool_at_zero() {
        let mut year = bare_year(vec![partner("a", 8.0)]);
        year.non_employment_costs = 5_000_000.0;
        year.medical_director_pool = 10_000.0;
        let result = compute_year(&year, &ProjectionSettings::default());
        assert_approx(result.breakdown.base_pool, 0.0);
        assert_approx(result.breakdown.distributable_pool, 0.0);
        assert_approx(result.physicians[0].pool_share, 0.0);
    }

    #[test]
    fn no_partner_weight_pays_no_shares() {
        let year = bare_year(vec![employee("e", 200_000.0)]);
        let result = compute_year(&year, &ProjectionSettings::default());
        assert!(result.breakdown.distributable_pool > 0.0);
        assert_approx(result.total_pool_shares(), 0.0);
    }

    #[test]
    fn becoming_partner_earns_both_sides_and_delayed_wages() {
        let mut transition = employee("t", 520_000.0);
        transition.role_state = RoleState::EmployeeBecomingPartner {
            employee_portion_of_year: 0.0,
        };
        transition.weeks_vacation = 0.0;
        let year = bare_year(vec![partner("a", 0.0), transition]);
        let result = compute_year(&year, &ProjectionSettings::default());

        let delayed = &result.physicians[1].delayed;
        assert_approx(delayed.amount, 14_000.0);
        assert_approx(
            result.breakdown.total_delayed_cost,
            delayed.amount + delayed.taxes,
        );
        assert_approx(
            result.physicians[1].compensation,
            result.physicians[1].pool_share + 14_000.0,
        );
    }

    #[test]
    fn rows_round_to_cents_only_for_display() {
        let year = bare_year(vec![partner("a", 9.0), partner("b", 11.0)]);
        let result = compute_year(&year, &ProjectionSettings::default());
        let rows = result.rows();
        assert_eq!(rows[0].compensation, round_cents(result.physicians[0].compensation));
        assert_approx_tol(
            rows[0].compensation + rows[1].compensation,
            3_164_006.93 - 229_713.57,
            0.011,
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_pool_shares_conserve_distributable_pool(
            weeks in proptest::collection::vec(0u32..=30, 1..6),
            income in 500_000u32..6_000_000,
            costs in 0u32..2_000_000,
            employee_salary in 0u32..600_000
        ) {
            let mut physicians: Vec<PhysicianRecord> = weeks
                .iter()
                .enumerate()
                .map(|(i, w)| partner(&format!("p{i}"), *w as f64))
                .collect();
            physicians.push(employee("e", employee_salary as f64));
            let mut year = bare_year(physicians);
            year.therapy_income = income as f64;
            year.non_employment_costs = costs as f64;

            let result = compute_year(&year, &ProjectionSettings::default());
            let tol = 1e-6 * result.breakdown.distributable_pool.max(1.0);
            prop_assert!((result.total_pool_shares() - result.breakdown.distributable_pool).abs() <= tol);
            prop_assert!(result.breakdown.distributable_pool >= 0.0);
        }

        #[test]
        fn prop_raising_salary_raises_only_that_employees_cost(
            salary in 0u32..800_000,
            raise in 1u32..100_000,
            other_salary in 0u32..800_000
        ) {
            let before = vec![employee("e", salary as f64), employee("o", other_salary as f64)];
            let mut after = before.clone();
            after[0].salary += raise as f64;

            let cost_before = employee_cost(&before[0], 2026, 5.0).total();
            let cost_after = employee_cost(&after[0], 2026, 5.0).total();
            prop_assert!(cost_after > cost_before);

            let other_before = employee_cost(&before[1], 2026, 5.0).total();
            let other_after = employee_cost(&after[1], 2026, 5.0).total();
            prop_assert!(other_after >= other_before);
        }
    }
}
