use super::medical_director::normalize_percentages;
use super::projection::seed_baseline;
use super::propagate::progressed_role;
use super::types::{
    BaselineMode, HistoricYear, PhysicianRecord, ProjectionSettings, RoleState, ScenarioState,
    YearFinancials,
};

pub const CURRENT_YEAR: i32 = 2025;
pub const PROJECTION_YEARS: i32 = 5;

/// Used whenever the selected baseline has no matching actuals.
pub const DEFAULT_BASELINE: HistoricYear = HistoricYear {
    year: CURRENT_YEAR,
    therapy_income: 3_164_006.93,
    non_employment_costs: 229_713.57,
    non_md_employment_costs: 164_677.44,
    locum_costs: 54_600.0,
    misc_employment_costs: 29_115.0,
};

const DEFAULT_PRCS_ASSIGNEE: &str = "p2";

pub fn default_historic_years() -> Vec<HistoricYear> {
    vec![
        HistoricYear {
            year: 2023,
            therapy_income: 2_833_114.18,
            non_employment_costs: 201_882.06,
            non_md_employment_costs: 143_019.77,
            locum_costs: 113_400.0,
            misc_employment_costs: 24_530.12,
        },
        HistoricYear {
            year: 2024,
            therapy_income: 2_989_245.61,
            non_employment_costs: 216_440.93,
            non_md_employment_costs: 155_286.40,
            locum_costs: 89_250.0,
            misc_employment_costs: 27_301.55,
        },
        DEFAULT_BASELINE,
    ]
}

fn physician(
    id: &str,
    name: &str,
    role_state: RoleState,
    salary: f64,
    weeks_vacation: f64,
) -> PhysicianRecord {
    let mut record = PhysicianRecord::new(id, name, role_state);
    record.salary = salary;
    record.weeks_vacation = weeks_vacation;
    record
}

pub fn default_roster() -> Vec<PhysicianRecord> {
    let mut lindqvist = physician("p1", "Dr. Avery Lindqvist", RoleState::Partner, 0.0, 9.0);
    lindqvist.has_medical_director_hours = true;
    lindqvist.medical_director_hours_percentage = 60.0;

    let mut okafor = physician("p2", "Dr. Morgan Okafor", RoleState::Partner, 0.0, 11.0);
    okafor.has_medical_director_hours = true;
    okafor.medical_director_hours_percentage = 40.0;

    let reyes = physician(
        "p3",
        "Dr. Jordan Reyes",
        RoleState::PartnerRetiring {
            partner_portion_of_year: 0.5,
            buyout_cost: 51_666.58,
        },
        0.0,
        10.0,
    );

    let mut whitfield = physician(
        "p4",
        "Dr. Casey Whitfield",
        RoleState::EmployeeBecomingPartner {
            employee_portion_of_year: 0.0,
        },
        500_000.0,
        8.0,
    );
    whitfield.receives_benefits = true;

    let mut brandt = physician("p5", "Dr. Riley Brandt", RoleState::Employee, 500_000.0, 8.0);
    brandt.receives_benefits = true;

    let mut patel = physician(
        "p6",
        "Dr. Sam Patel",
        RoleState::NewEmployee {
            start_portion_of_year: 0.42,
        },
        500_000.0,
        8.0,
    );
    patel.receives_benefits = true;

    vec![lindqvist, okafor, reyes, whitfield, brandt, patel]
}

fn year_shell(year: i32, settings: &ProjectionSettings) -> YearFinancials {
    let mut financials = YearFinancials::empty(year);
    financials.medical_director_pool = settings.medical_director_pool;
    financials.prcs_director_pool = settings.prcs_director_pool;
    financials.locum_costs = settings.locum_costs;
    financials.prcs_director_physician_id = Some(DEFAULT_PRCS_ASSIGNEE.to_string());
    financials
}

pub fn default_scenario(historic: &[HistoricYear]) -> ScenarioState {
    let settings = ProjectionSettings::default();
    let roster = default_roster();

    let mut baseline = year_shell(CURRENT_YEAR, &settings);
    baseline.physicians = roster.clone();
    let mut years = vec![baseline];

    for offset in 1..=PROJECTION_YEARS {
        let mut year = year_shell(CURRENT_YEAR + offset, &settings);
        year.physicians = roster
            .iter()
            .filter_map(|record| {
                progressed_role(&record.role_state, offset as usize).map(|role_state| {
                    let mut next = record.clone();
                    next.role_state = role_state;
                    next
                })
            })
            .collect();
        normalize_percentages(&mut year.physicians);
        years.push(year);
    }

    seed_baseline(
        ScenarioState {
            baseline_mode: BaselineMode::default(),
            settings,
            years,
        },
        historic,
    )
}
