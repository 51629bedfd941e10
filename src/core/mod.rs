mod defaults;
mod delayed;
mod engine;
mod error;
mod medical_director;
mod payroll;
mod projection;
mod propagate;
mod proration;
mod scenarios;
mod types;

pub use defaults::{
    CURRENT_YEAR, DEFAULT_BASELINE, PROJECTION_YEARS, default_historic_years, default_roster,
    default_scenario,
};
pub use delayed::{
    DelayedCompensation, DelayedPeriod, PayPeriod, business_days, delayed_compensation,
    hourly_rate, pay_periods_paid_in,
};
pub use engine::{
    EmployeeCost, PhysicianOutcome, YearComputation, compute_year, employee_cost,
    practice_summary,
};
pub use error::SnapshotError;
pub use medical_director::{
    MedicalDirectorAllocation, allocate_medical_director, normalize_percentages,
    percentage_total, rebalance_after_edit, recompute_from_weights,
};
pub use payroll::{
    PayrollTaxBreakdown, annual_benefit_cost, benefit_start_date, benefits_cost,
    employer_payroll_taxes, payroll_tax_breakdown, social_security_wage_base,
};
pub use projection::{
    apply_financial_edit, apply_growth, apply_projection_setting, clear_financial_override,
    seed_baseline, set_baseline_mode,
};
pub use propagate::{PropagationOptions, apply_physician_edit, progressed_role, remove_physician};
pub use proration::{
    date_for_portion, employee_portion, fte_weight, is_employee_like, is_partner_eligible,
    partner_portion,
};
pub use scenarios::{CompensationModel, ScenarioSeed};
pub use types::{
    BaselineMode, CompensationRow, FinancialField, HistoricYear, PhysicianRecord, PoolBreakdown,
    PracticeSummary, ProjectionSetting, ProjectionSettings, RoleKind, RoleState, ScenarioEdit,
    ScenarioKey, ScenarioState, Snapshot, YearFinancials,
};
