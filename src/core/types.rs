use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MAX_VACATION_WEEKS: f64 = 24.0;
pub const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleKind {
    Partner,
    Employee,
    EmployeeBecomingPartner,
    PartnerRetiring,
    NewEmployee,
    EmployeeTerminating,
}

impl RoleKind {
    pub fn label(self) -> &'static str {
        match self {
            RoleKind::Partner => "Partner",
            RoleKind::Employee => "Employee",
            RoleKind::EmployeeBecomingPartner => "Employee to Partner",
            RoleKind::PartnerRetiring => "Retiring Partner",
            RoleKind::NewEmployee => "New Employee",
            RoleKind::EmployeeTerminating => "Departing Employee",
        }
    }
}

/// Lifecycle state of a physician within one year. Each variant carries only
/// the fractional fields that apply to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RoleState {
    Partner,
    Employee,
    EmployeeBecomingPartner {
        employee_portion_of_year: f64,
    },
    PartnerRetiring {
        partner_portion_of_year: f64,
        #[serde(default)]
        buyout_cost: f64,
    },
    NewEmployee {
        start_portion_of_year: f64,
    },
    EmployeeTerminating {
        terminate_portion_of_year: f64,
    },
}

pub const DEFAULT_TRANSITION_PORTION: f64 = 0.5;

impl RoleState {
    pub fn kind(&self) -> RoleKind {
        match self {
            RoleState::Partner => RoleKind::Partner,
            RoleState::Employee => RoleKind::Employee,
            RoleState::EmployeeBecomingPartner { .. } => RoleKind::EmployeeBecomingPartner,
            RoleState::PartnerRetiring { .. } => RoleKind::PartnerRetiring,
            RoleState::NewEmployee { .. } => RoleKind::NewEmployee,
            RoleState::EmployeeTerminating { .. } => RoleKind::EmployeeTerminating,
        }
    }

    /// Fresh state for `kind` with mid-year defaults for its portion fields.
    pub fn from_kind(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Partner => RoleState::Partner,
            RoleKind::Employee => RoleState::Employee,
            RoleKind::EmployeeBecomingPartner => RoleState::EmployeeBecomingPartner {
                employee_portion_of_year: DEFAULT_TRANSITION_PORTION,
            },
            RoleKind::PartnerRetiring => RoleState::PartnerRetiring {
                partner_portion_of_year: DEFAULT_TRANSITION_PORTION,
                buyout_cost: 0.0,
            },
            RoleKind::NewEmployee => RoleState::NewEmployee {
                start_portion_of_year: 0.0,
            },
            RoleKind::EmployeeTerminating => RoleState::EmployeeTerminating {
                terminate_portion_of_year: DEFAULT_TRANSITION_PORTION,
            },
        }
    }

    pub fn leaves_practice(&self) -> bool {
        matches!(
            self,
            RoleState::PartnerRetiring { .. } | RoleState::EmployeeTerminating { .. }
        )
    }

    fn sanitized(self) -> Self {
        match self {
            RoleState::EmployeeBecomingPartner {
                employee_portion_of_year,
            } => RoleState::EmployeeBecomingPartner {
                employee_portion_of_year: clamp_portion(employee_portion_of_year),
            },
            RoleState::PartnerRetiring {
                partner_portion_of_year,
                buyout_cost,
            } => RoleState::PartnerRetiring {
                partner_portion_of_year: clamp_portion(partner_portion_of_year),
                buyout_cost: clamp_money(buyout_cost),
            },
            RoleState::NewEmployee {
                start_portion_of_year,
            } => RoleState::NewEmployee {
                start_portion_of_year: clamp_portion(start_portion_of_year),
            },
            RoleState::EmployeeTerminating {
                terminate_portion_of_year,
            } => RoleState::EmployeeTerminating {
                terminate_portion_of_year: clamp_portion(terminate_portion_of_year),
            },
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicianRecord {
    pub id: String,
    pub name: String,
    pub role_state: RoleState,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub weeks_vacation: f64,
    #[serde(default)]
    pub receives_benefits: bool,
    #[serde(default)]
    pub bonus_amount: f64,
    #[serde(default)]
    pub has_medical_director_hours: bool,
    #[serde(default)]
    pub medical_director_hours_percentage: f64,
}

impl PhysicianRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role_state: RoleState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role_state,
            salary: 0.0,
            weeks_vacation: 0.0,
            receives_benefits: false,
            bonus_amount: 0.0,
            has_medical_director_hours: false,
            medical_director_hours_percentage: 0.0,
        }
    }

    pub fn kind(&self) -> RoleKind {
        self.role_state.kind()
    }

    /// Clamps every numeric field into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.role_state = self.role_state.sanitized();
        self.salary = clamp_money(self.salary);
        self.bonus_amount = clamp_money(self.bonus_amount);
        self.weeks_vacation = clamp_vacation_weeks(self.weeks_vacation);
        self.medical_director_hours_percentage =
            clamp_percentage(self.medical_director_hours_percentage);
        self
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinancialField {
    TherapyIncome,
    NonEmploymentCosts,
    NonMdEmploymentCosts,
    LocumCosts,
    MiscEmploymentCosts,
    MedicalDirectorPool,
    PrcsDirectorPool,
}

impl FinancialField {
    pub const ALL: [FinancialField; 7] = [
        FinancialField::TherapyIncome,
        FinancialField::NonEmploymentCosts,
        FinancialField::NonMdEmploymentCosts,
        FinancialField::LocumCosts,
        FinancialField::MiscEmploymentCosts,
        FinancialField::MedicalDirectorPool,
        FinancialField::PrcsDirectorPool,
    ];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearFinancials {
    pub year: i32,
    pub therapy_income: f64,
    pub non_employment_costs: f64,
    pub non_md_employment_costs: f64,
    pub locum_costs: f64,
    pub misc_employment_costs: f64,
    pub medical_director_pool: f64,
    pub prcs_director_pool: f64,
    #[serde(default)]
    pub prcs_director_physician_id: Option<String>,
    #[serde(default)]
    pub physicians: Vec<PhysicianRecord>,
    #[serde(default)]
    pub overridden: BTreeSet<FinancialField>,
}

impl YearFinancials {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            therapy_income: 0.0,
            non_employment_costs: 0.0,
            non_md_employment_costs: 0.0,
            locum_costs: 0.0,
            misc_employment_costs: 0.0,
            medical_director_pool: 0.0,
            prcs_director_pool: 0.0,
            prcs_director_physician_id: None,
            physicians: Vec::new(),
            overridden: BTreeSet::new(),
        }
    }

    pub fn field(&self, field: FinancialField) -> f64 {
        match field {
            FinancialField::TherapyIncome => self.therapy_income,
            FinancialField::NonEmploymentCosts => self.non_employment_costs,
            FinancialField::NonMdEmploymentCosts => self.non_md_employment_costs,
            FinancialField::LocumCosts => self.locum_costs,
            FinancialField::MiscEmploymentCosts => self.misc_employment_costs,
            FinancialField::MedicalDirectorPool => self.medical_director_pool,
            FinancialField::PrcsDirectorPool => self.prcs_director_pool,
        }
    }

    pub fn set_field(&mut self, field: FinancialField, value: f64) {
        let value = clamp_money(value);
        match field {
            FinancialField::TherapyIncome => self.therapy_income = value,
            FinancialField::NonEmploymentCosts => self.non_employment_costs = value,
            FinancialField::NonMdEmploymentCosts => self.non_md_employment_costs = value,
            FinancialField::LocumCosts => self.locum_costs = value,
            FinancialField::MiscEmploymentCosts => self.misc_employment_costs = value,
            FinancialField::MedicalDirectorPool => self.medical_director_pool = value,
            FinancialField::PrcsDirectorPool => self.prcs_director_pool = value,
        }
    }

    pub fn is_overridden(&self, field: FinancialField) -> bool {
        self.overridden.contains(&field)
    }

    pub fn physician(&self, id: &str) -> Option<&PhysicianRecord> {
        self.physicians.iter().find(|p| p.id == id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionSettings {
    pub income_growth_pct: f64,
    pub non_employment_costs_growth_pct: f64,
    pub non_md_employment_costs_growth_pct: f64,
    pub misc_employment_costs_growth_pct: f64,
    pub benefit_growth_pct: f64,
    pub locum_costs: f64,
    pub medical_director_pool: f64,
    pub prcs_director_pool: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            income_growth_pct: 3.7,
            non_employment_costs_growth_pct: 7.8,
            non_md_employment_costs_growth_pct: 6.0,
            misc_employment_costs_growth_pct: 6.7,
            benefit_growth_pct: 5.0,
            locum_costs: 54_600.0,
            medical_director_pool: 119_373.75,
            prcs_director_pool: 60_000.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectionSetting {
    IncomeGrowthPct,
    NonEmploymentCostsGrowthPct,
    NonMdEmploymentCostsGrowthPct,
    MiscEmploymentCostsGrowthPct,
    BenefitGrowthPct,
    LocumCosts,
    MedicalDirectorPool,
    PrcsDirectorPool,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    #[default]
    #[serde(alias = "currentYearActuals", alias = "current")]
    CurrentYearActuals,
    #[serde(alias = "priorYearActuals", alias = "prior")]
    PriorYearActuals,
    Custom,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioState {
    #[serde(default)]
    pub baseline_mode: BaselineMode,
    #[serde(default)]
    pub settings: ProjectionSettings,
    pub years: Vec<YearFinancials>,
}

impl ScenarioState {
    pub fn year(&self, year: i32) -> Option<&YearFinancials> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|y| y.year == year)
    }

    pub fn baseline_year(&self) -> Option<i32> {
        self.years.first().map(|y| y.year)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricYear {
    pub year: i32,
    pub therapy_income: f64,
    pub non_employment_costs: f64,
    pub non_md_employment_costs: f64,
    pub locum_costs: f64,
    pub misc_employment_costs: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKey {
    #[serde(alias = "A")]
    A,
    #[serde(alias = "B")]
    B,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub scenario_a: ScenarioState,
    #[serde(default)]
    pub scenario_b: Option<ScenarioState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScenarioEdit {
    Physician {
        year: i32,
        record: PhysicianRecord,
    },
    RemovePhysician {
        year: i32,
        physician_id: String,
    },
    Financial {
        year: i32,
        field: FinancialField,
        value: f64,
    },
    ClearFinancialOverride {
        year: i32,
        field: FinancialField,
    },
    ProjectionSetting {
        setting: ProjectionSetting,
        value: f64,
    },
    BaselineMode {
        mode: BaselineMode,
    },
    Reset,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationRow {
    pub physician_id: String,
    pub name: String,
    pub role: RoleKind,
    pub compensation: f64,
    pub salary_portion: f64,
    pub bonus: f64,
    pub pool_share: f64,
    pub medical_director: f64,
    pub buyout: f64,
    pub delayed_compensation: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBreakdown {
    pub base_pool: f64,
    pub distributable_pool: f64,
    pub total_employee_cost: f64,
    pub total_buyout_cost: f64,
    pub total_delayed_cost: f64,
    pub total_medical_director_allocation: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
    pub year: i32,
    pub therapy_income: f64,
    pub total_costs: f64,
    pub net_income: f64,
    pub total_compensation: f64,
}

pub(crate) fn clamp_money(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

pub(crate) fn clamp_portion(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub(crate) fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub(crate) fn clamp_vacation_weeks(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_VACATION_WEEKS)
    } else {
        0.0
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
