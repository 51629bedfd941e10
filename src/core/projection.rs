use tracing::{debug, warn};

use super::defaults::DEFAULT_BASELINE;
use super::types::{
    BaselineMode, FinancialField, HistoricYear, ProjectionSetting, ProjectionSettings,
    ScenarioState, YearFinancials, clamp_money,
};

fn growth_pct(settings: &ProjectionSettings, field: FinancialField) -> Option<f64> {
    match field {
        FinancialField::TherapyIncome => Some(settings.income_growth_pct),
        FinancialField::NonEmploymentCosts => Some(settings.non_employment_costs_growth_pct),
        FinancialField::NonMdEmploymentCosts => {
            Some(settings.non_md_employment_costs_growth_pct)
        }
        FinancialField::MiscEmploymentCosts => Some(settings.misc_employment_costs_growth_pct),
        FinancialField::LocumCosts
        | FinancialField::MedicalDirectorPool
        | FinancialField::PrcsDirectorPool => None,
    }
}

fn flat_amount(settings: &ProjectionSettings, field: FinancialField) -> Option<f64> {
    match field {
        FinancialField::LocumCosts => Some(settings.locum_costs),
        FinancialField::MedicalDirectorPool => Some(settings.medical_director_pool),
        FinancialField::PrcsDirectorPool => Some(settings.prcs_director_pool),
        _ => None,
    }
}

pub fn apply_growth(years: &mut [YearFinancials], settings: &ProjectionSettings) {
    for idx in 1..years.len() {
        let (before, after) = years.split_at_mut(idx);
        let prior = &before[idx - 1];
        let current = &mut after[0];
        for field in FinancialField::ALL {
            if current.is_overridden(field) {
                continue;
            }
            if let Some(pct) = growth_pct(settings, field) {
                let factor = 1.0 + pct.max(-100.0) / 100.0;
                current.set_field(field, prior.field(field) * factor);
            } else if let Some(amount) = flat_amount(settings, field) {
                current.set_field(field, amount);
            }
        }
    }
}

pub fn regrow(mut state: ScenarioState) -> ScenarioState {
    let settings = state.settings.clone();
    apply_growth(&mut state.years, &settings);
    state
}

fn historic_for_mode<'a>(
    mode: BaselineMode,
    baseline_year: i32,
    historic: &'a [HistoricYear],
) -> Option<&'a HistoricYear> {
    let wanted = match mode {
        BaselineMode::CurrentYearActuals => baseline_year,
        BaselineMode::PriorYearActuals => baseline_year.saturating_sub(1),
        BaselineMode::Custom => return None,
    };
    historic.iter().find(|h| h.year == wanted)
}

fn write_baseline(year: &mut YearFinancials, source: &HistoricYear) {
    year.therapy_income = clamp_money(source.therapy_income);
    year.non_employment_costs = clamp_money(source.non_employment_costs);
    year.non_md_employment_costs = clamp_money(source.non_md_employment_costs);
    year.locum_costs = clamp_money(source.locum_costs);
    year.misc_employment_costs = clamp_money(source.misc_employment_costs);
}

/// Seeds the baseline year's aggregates from the actuals selected by the
/// scenario's baseline mode, then regrows the projection. Custom baselines
/// keep their own values.
pub fn seed_baseline(mut state: ScenarioState, historic: &[HistoricYear]) -> ScenarioState {
    let mode = state.baseline_mode;
    let Some(baseline) = state.years.first_mut() else {
        return state;
    };
    if mode != BaselineMode::Custom {
        match historic_for_mode(mode, baseline.year, historic) {
            Some(source) => write_baseline(baseline, source),
            None => {
                warn!(?mode, year = baseline.year, "no historic data for baseline; using default");
                write_baseline(baseline, &DEFAULT_BASELINE);
            }
        }
    }
    regrow(state)
}

pub fn set_baseline_mode(
    mut state: ScenarioState,
    mode: BaselineMode,
    historic: &[HistoricYear],
) -> ScenarioState {
    state.baseline_mode = mode;
    seed_baseline(state, historic)
}

/// Writes a user-entered value. Projected years freeze the field against
/// growth; an edit to the baseline year makes it a custom baseline.
pub fn apply_financial_edit(
    mut state: ScenarioState,
    year: i32,
    field: FinancialField,
    value: f64,
) -> ScenarioState {
    let Some(idx) = state.year_index(year) else {
        debug!(year, ?field, "financial edit for unknown year ignored");
        return state;
    };
    let target = &mut state.years[idx];
    target.set_field(field, value);
    if idx == 0 {
        if matches!(
            field,
            FinancialField::TherapyIncome
                | FinancialField::NonEmploymentCosts
                | FinancialField::NonMdEmploymentCosts
                | FinancialField::LocumCosts
                | FinancialField::MiscEmploymentCosts
        ) {
            state.baseline_mode = BaselineMode::Custom;
        }
    } else {
        target.overridden.insert(field);
    }
    regrow(state)
}

pub fn clear_financial_override(
    mut state: ScenarioState,
    year: i32,
    field: FinancialField,
) -> ScenarioState {
    if let Some(idx) = state.year_index(year) {
        state.years[idx].overridden.remove(&field);
    }
    regrow(state)
}

pub fn apply_projection_setting(
    mut state: ScenarioState,
    setting: ProjectionSetting,
    value: f64,
) -> ScenarioState {
    let pct = if value.is_finite() { value.clamp(-100.0, 100.0) } else { 0.0 };
    let settings = &mut state.settings;
    match setting {
        ProjectionSetting::IncomeGrowthPct => settings.income_growth_pct = pct,
        ProjectionSetting::NonEmploymentCostsGrowthPct => {
            settings.non_employment_costs_growth_pct = pct
        }
        ProjectionSetting::NonMdEmploymentCostsGrowthPct => {
            settings.non_md_employment_costs_growth_pct = pct
        }
        ProjectionSetting::MiscEmploymentCostsGrowthPct => {
            settings.misc_employment_costs_growth_pct = pct
        }
        ProjectionSetting::BenefitGrowthPct => settings.benefit_growth_pct = pct,
        ProjectionSetting::LocumCosts => settings.locum_costs = clamp_money(value),
        ProjectionSetting::MedicalDirectorPool => {
            settings.medical_director_pool = clamp_money(value)
        }
        ProjectionSetting::PrcsDirectorPool => settings.prcs_director_pool = clamp_money(value),
    }
    regrow(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn settings() -> ProjectionSettings {
        ProjectionSettings {
            income_growth_pct: 10.0,
            non_employment_costs_growth_pct: 5.0,
            non_md_employment_costs_growth_pct: 0.0,
            misc_employment_costs_growth_pct: -10.0,
            benefit_growth_pct: 5.0,
            locum_costs: 20_000.0,
            medical_director_pool: 100_000.0,
            prcs_director_pool: 50_000.0,
        }
    }

    fn scenario(count: i32) -> ScenarioState {
        let mut baseline = YearFinancials::empty(2025);
        baseline.therapy_income = 1_000.0;
        baseline.non_employment_costs = 100.0;
        baseline.misc_employment_costs = 50.0;
        baseline.locum_costs = 999.0;
        let mut years = vec![baseline];
        for offset in 1..count {
            years.push(YearFinancials::empty(2025 + offset));
        }
        ScenarioState {
            baseline_mode: BaselineMode::Custom,
            settings: settings(),
            years,
        }
    }

    fn historic() -> Vec<HistoricYear> {
        vec![
            HistoricYear {
                year: 2024,
                therapy_income: 2_000.0,
                non_employment_costs: 200.0,
                non_md_employment_costs: 20.0,
                locum_costs: 2.0,
                misc_employment_costs: 0.2,
            },
            HistoricYear {
                year: 2025,
                therapy_income: 3_000.0,
                non_employment_costs: 300.0,
                non_md_employment_costs: 30.0,
                locum_costs: 3.0,
                misc_employment_costs: 0.3,
            },
        ]
    }

    #[test]
    fn growth_compounds_per_field() {
        let state = regrow(scenario(3));
        assert_approx(state.years[1].therapy_income, 1_100.0);
        assert_approx(state.years[2].therapy_income, 1_210.0);
        assert_approx(state.years[2].non_employment_costs, 110.25);
        assert_approx(state.years[2].misc_employment_costs, 40.5);
    }

    #[test]
    fn baseline_year_is_never_regrown() {
        let state = regrow(scenario(3));
        assert_approx(state.years[0].therapy_income, 1_000.0);
        assert_approx(state.years[0].locum_costs, 999.0);
    }

    #[test]
    fn flat_amounts_fill_projected_years() {
        let state = regrow(scenario(2));
        assert_approx(state.years[1].locum_costs, 20_000.0);
        assert_approx(state.years[1].medical_director_pool, 100_000.0);
        assert_approx(state.years[1].prcs_director_pool, 50_000.0);
    }

    #[test]
    fn override_freezes_field_and_reseeds_growth() {
        let state = apply_financial_edit(scenario(4), 2026, FinancialField::TherapyIncome, 5_000.0);
        assert_approx(state.years[1].therapy_income, 5_000.0);
        assert_approx(state.years[2].therapy_income, 5_500.0);
        assert_approx(state.years[3].therapy_income, 6_050.0);

        let state = apply_projection_setting(state, ProjectionSetting::IncomeGrowthPct, 0.0);
        assert_approx(state.years[1].therapy_income, 5_000.0);
        assert_approx(state.years[3].therapy_income, 5_000.0);
    }

    #[test]
    fn clearing_override_resumes_growth() {
        let state = apply_financial_edit(scenario(3), 2026, FinancialField::TherapyIncome, 5_000.0);
        let state = clear_financial_override(state, 2026, FinancialField::TherapyIncome);
        assert_approx(state.years[1].therapy_income, 1_100.0);
        assert!(!state.years[1].is_overridden(FinancialField::TherapyIncome));
    }

    #[test]
    fn baseline_edit_switches_to_custom() {
        let mut state = scenario(2);
        state.baseline_mode = BaselineMode::CurrentYearActuals;
        let state = apply_financial_edit(state, 2025, FinancialField::TherapyIncome, 2_000.0);
        assert_eq!(state.baseline_mode, BaselineMode::Custom);
        assert!(state.years[0].overridden.is_empty());
        assert_approx(state.years[1].therapy_income, 2_200.0);
    }

    #[test]
    fn baseline_modes_pick_matching_history() {
        let state = set_baseline_mode(scenario(2), BaselineMode::CurrentYearActuals, &historic());
        assert_approx(state.years[0].therapy_income, 3_000.0);
        assert_approx(state.years[1].therapy_income, 3_300.0);

        let state = set_baseline_mode(state, BaselineMode::PriorYearActuals, &historic());
        assert_approx(state.years[0].therapy_income, 2_000.0);

        let state = set_baseline_mode(state, BaselineMode::Custom, &historic());
        assert_approx(state.years[0].therapy_income, 2_000.0);
    }

    #[test]
    fn missing_history_falls_back_to_default_baseline() {
        let state = set_baseline_mode(scenario(2), BaselineMode::PriorYearActuals, &[]);
        assert_approx(state.years[0].therapy_income, DEFAULT_BASELINE.therapy_income);
    }

    #[test]
    fn prior_year_mode_at_earliest_year_falls_back() {
        let mut state = scenario(2);
        state.years[0].year = i32::MIN;
        let state = set_baseline_mode(state, BaselineMode::PriorYearActuals, &historic());
        assert_approx(state.years[0].therapy_income, DEFAULT_BASELINE.therapy_income);
    }

    #[test]
    fn settings_are_clamped() {
        let state = apply_projection_setting(scenario(2), ProjectionSetting::IncomeGrowthPct, -400.0);
        assert_approx(state.settings.income_growth_pct, -100.0);
        assert_approx(state.years[1].therapy_income, 0.0);

        let state = apply_projection_setting(state, ProjectionSetting::LocumCosts, -1.0);
        assert_approx(state.years[1].locum_costs, 0.0);
    }

    #[test]
    fn unknown_year_edit_is_ignored() {
        let before = regrow(scenario(2));
        let after = apply_financial_edit(before.clone(), 2040, FinancialField::TherapyIncome, 1.0);
        assert_eq!(before, after);
    }
}
