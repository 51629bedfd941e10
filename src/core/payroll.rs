use chrono::{Datelike, NaiveDate};

use super::proration::{date_for_portion, days_in_year, year_end};
use super::types::{PhysicianRecord, RoleState, clamp_money};

const FEDERAL_UNEMPLOYMENT_RATE: f64 = 0.006;
const FEDERAL_UNEMPLOYMENT_WAGE_BASE: f64 = 7_000.0;

const SOCIAL_SECURITY_RATE: f64 = 0.062;
const SOCIAL_SECURITY_WAGE_BASES: &[(i32, f64)] = &[
    (2023, 160_200.0),
    (2024, 168_600.0),
    (2025, 176_100.0),
    (2026, 184_500.0),
    (2027, 190_800.0),
    (2028, 197_400.0),
    (2029, 204_300.0),
    (2030, 211_500.0),
];

const MEDICARE_RATE: f64 = 0.0145;

const STATE_UNEMPLOYMENT_RATE: f64 = 0.012;
const STATE_UNEMPLOYMENT_WAGE_BASE: f64 = 72_800.0;
// Employer share of the family-leave premium; shares the social security base.
const STATE_FAMILY_LEAVE_RATE: f64 = 0.00262;
const STATE_EMPLOYMENT_ADMIN_RATE: f64 = 0.0003;
const STATE_WORKFORCE_TRAINING_RATE: f64 = 0.0009;

pub const BENEFITS_BASE_YEAR: i32 = 2025;
pub const BENEFITS_BASE_ANNUAL_COST: f64 = 32_000.0;
const BENEFITS_WAITING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayrollTaxBreakdown {
    pub federal_unemployment: f64,
    pub social_security: f64,
    pub medicare: f64,
    pub state_unemployment: f64,
    pub state_family_leave: f64,
    pub state_flat: f64,
}

impl PayrollTaxBreakdown {
    pub fn total(self) -> f64 {
        self.federal_unemployment
            + self.social_security
            + self.medicare
            + self.state_unemployment
            + self.state_family_leave
            + self.state_flat
    }
}

pub fn social_security_wage_base(year: i32) -> f64 {
    let mut base = SOCIAL_SECURITY_WAGE_BASES[0].1;
    for &(table_year, cap) in SOCIAL_SECURITY_WAGE_BASES {
        if table_year > year {
            break;
        }
        base = cap;
    }
    base
}

pub fn payroll_tax_breakdown(wages: f64, year: i32) -> PayrollTaxBreakdown {
    let wages = clamp_money(wages);
    let ss_base = social_security_wage_base(year);
    PayrollTaxBreakdown {
        federal_unemployment: wages.min(FEDERAL_UNEMPLOYMENT_WAGE_BASE)
            * FEDERAL_UNEMPLOYMENT_RATE,
        social_security: wages.min(ss_base) * SOCIAL_SECURITY_RATE,
        medicare: wages * MEDICARE_RATE,
        state_unemployment: wages.min(STATE_UNEMPLOYMENT_WAGE_BASE) * STATE_UNEMPLOYMENT_RATE,
        state_family_leave: wages.min(ss_base) * STATE_FAMILY_LEAVE_RATE,
        state_flat: wages * (STATE_EMPLOYMENT_ADMIN_RATE + STATE_WORKFORCE_TRAINING_RATE),
    }
}

/// Employer-side payroll taxes on `wages` paid in `year`. Employee-borne
/// surtaxes are not included.
pub fn employer_payroll_taxes(wages: f64, year: i32) -> f64 {
    payroll_tax_breakdown(wages, year).total()
}

pub fn annual_benefit_cost(year: i32, benefit_growth_pct: f64) -> f64 {
    let growth = 1.0 + benefit_growth_pct.max(-100.0) / 100.0;
    let years = year.saturating_sub(BENEFITS_BASE_YEAR);
    (BENEFITS_BASE_ANNUAL_COST * growth.powi(years)).max(0.0)
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// First day of coverage for an employee starting on `start`: the first of
/// the month after a 30-day wait, except that a start on the 1st of any month
/// but February is covered from the 1st of the next month.
pub fn benefit_start_date(start: NaiveDate) -> NaiveDate {
    if start.day() == 1 && start.month() != 2 {
        return first_of_next_month(start);
    }
    first_of_next_month(start + chrono::Duration::days(BENEFITS_WAITING_DAYS))
}

pub fn benefits_cost(record: &PhysicianRecord, year: i32, benefit_growth_pct: f64) -> f64 {
    if !record.receives_benefits {
        return 0.0;
    }
    let annual = annual_benefit_cost(year, benefit_growth_pct);
    match record.role_state {
        RoleState::NewEmployee {
            start_portion_of_year,
        } => {
            let start = date_for_portion(year, start_portion_of_year);
            let coverage_start = benefit_start_date(start);
            if coverage_start.year() > year {
                return 0.0;
            }
            let covered_days = (year_end(year) - coverage_start).num_days() + 1;
            annual * covered_days as f64 / days_in_year(year) as f64
        }
        _ => annual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_employee(start_portion_of_year: f64) -> PhysicianRecord {
        let mut record = PhysicianRecord::new(
            "p1",
            "Dr. New",
            RoleState::NewEmployee {
                start_portion_of_year,
            },
        );
        record.receives_benefits = true;
        record
    }

    #[test]
    fn wage_base_falls_back_to_table_edges() {
        assert_approx(social_security_wage_base(2025), 176_100.0);
        assert_approx(social_security_wage_base(2040), 211_500.0);
        assert_approx(social_security_wage_base(2010), 160_200.0);
    }

    #[test]
    fn payroll_tax_for_small_wage_hits_no_caps() {
        let wages = 5_000.0;
        let expected = wages
            * (0.006 + 0.062 + 0.0145 + 0.012 + 0.00262 + 0.0003 + 0.0009);
        assert_approx(employer_payroll_taxes(wages, 2025), expected);
    }

    #[test]
    fn payroll_tax_caps_each_capped_component() {
        let wages = 500_000.0;
        let taxes = payroll_tax_breakdown(wages, 2025);
        assert_approx(taxes.federal_unemployment, 42.0);
        assert_approx(taxes.social_security, 176_100.0 * 0.062);
        assert_approx(taxes.medicare, 7_250.0);
        assert_approx(taxes.state_unemployment, 873.6);
        assert_approx(taxes.state_family_leave, 176_100.0 * 0.00262);
        assert_approx(taxes.state_flat, 600.0);
    }

    #[test]
    fn payroll_tax_treats_negative_wages_as_zero() {
        assert_approx(employer_payroll_taxes(-100.0, 2025), 0.0);
    }

    #[test]
    fn benefit_start_follows_waiting_period() {
        assert_eq!(benefit_start_date(date(2025, 3, 1)), date(2025, 4, 1));
        assert_eq!(benefit_start_date(date(2025, 4, 1)), date(2025, 5, 1));
        assert_eq!(benefit_start_date(date(2025, 2, 1)), date(2025, 4, 1));
        assert_eq!(benefit_start_date(date(2025, 3, 15)), date(2025, 5, 1));
        assert_eq!(benefit_start_date(date(2025, 12, 10)), date(2026, 2, 1));
    }

    #[test]
    fn annual_benefit_cost_compounds_from_base_year() {
        assert_approx(annual_benefit_cost(2025, 5.0), 32_000.0);
        assert_approx(annual_benefit_cost(2027, 5.0), 32_000.0 * 1.05 * 1.05);
    }

    #[test]
    fn annual_benefit_cost_survives_extreme_years() {
        assert_approx(annual_benefit_cost(i32::MIN, 5.0), 0.0);
        assert_approx(annual_benefit_cost(i32::MIN, 0.0), 32_000.0);
        assert!(annual_benefit_cost(i32::MAX, -5.0).is_finite());
    }

    #[test]
    fn benefits_zero_without_enrollment() {
        let mut record = new_employee(0.0);
        record.receives_benefits = false;
        assert_approx(benefits_cost(&record, 2025, 5.0), 0.0);
    }

    #[test]
    fn new_employee_benefits_are_prorated_from_coverage_start() {
        // Starts 2025-01-01, coverage from 2025-02-01.
        let record = new_employee(0.0);
        let expected = 32_000.0 * 334.0 / 365.0;
        assert_approx(benefits_cost(&record, 2025, 5.0), expected);
    }

    #[test]
    fn late_start_pushes_coverage_out_of_year() {
        let record = new_employee(0.95);
        assert_approx(benefits_cost(&record, 2025, 5.0), 0.0);
    }

    #[test]
    fn established_employee_pays_full_year() {
        let mut record = new_employee(0.0);
        record.role_state = RoleState::Employee;
        assert_approx(benefits_cost(&record, 2026, 0.0), 32_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_payroll_tax_is_monotone_in_wages(
            low in 0u32..600_000,
            extra in 1u32..200_000,
            year in 2020i32..2035
        ) {
            let low = low as f64;
            let high = low + extra as f64;
            prop_assert!(employer_payroll_taxes(high, year) > employer_payroll_taxes(low, year));
        }
    }
}
