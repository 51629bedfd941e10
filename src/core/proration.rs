use chrono::{Datelike, Duration, NaiveDate};

use super::types::{
    PhysicianRecord, RoleState, WEEKS_PER_YEAR, clamp_portion, clamp_vacation_weeks,
};

pub fn employee_portion(record: &PhysicianRecord) -> f64 {
    match record.role_state {
        RoleState::Partner | RoleState::PartnerRetiring { .. } => 0.0,
        RoleState::Employee => 1.0,
        RoleState::NewEmployee {
            start_portion_of_year,
        } => 1.0 - clamp_portion(start_portion_of_year),
        RoleState::EmployeeTerminating {
            terminate_portion_of_year,
        } => clamp_portion(terminate_portion_of_year),
        RoleState::EmployeeBecomingPartner {
            employee_portion_of_year,
        } => clamp_portion(employee_portion_of_year),
    }
}

pub fn partner_portion(record: &PhysicianRecord) -> f64 {
    match record.role_state {
        RoleState::Partner => 1.0,
        RoleState::PartnerRetiring {
            partner_portion_of_year,
            ..
        } => clamp_portion(partner_portion_of_year),
        RoleState::EmployeeBecomingPartner {
            employee_portion_of_year,
        } => 1.0 - clamp_portion(employee_portion_of_year),
        RoleState::Employee
        | RoleState::NewEmployee { .. }
        | RoleState::EmployeeTerminating { .. } => 0.0,
    }
}

/// Partner-side full-time equivalent: time not on vacation times the part of
/// the year spent as a partner.
pub fn fte_weight(record: &PhysicianRecord) -> f64 {
    let working = 1.0 - clamp_vacation_weeks(record.weeks_vacation) / WEEKS_PER_YEAR;
    (working * partner_portion(record)).max(0.0)
}

pub fn is_partner_eligible(record: &PhysicianRecord) -> bool {
    matches!(
        record.role_state,
        RoleState::Partner
            | RoleState::PartnerRetiring { .. }
            | RoleState::EmployeeBecomingPartner { .. }
    )
}

pub fn is_employee_like(record: &PhysicianRecord) -> bool {
    matches!(
        record.role_state,
        RoleState::Employee
            | RoleState::NewEmployee { .. }
            | RoleState::EmployeeTerminating { .. }
            | RoleState::EmployeeBecomingPartner { .. }
    )
}

pub const MIN_MODEL_YEAR: i32 = 1900;
pub const MAX_MODEL_YEAR: i32 = 2200;

pub fn is_modelled_year(year: i32) -> bool {
    (MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year)
}

pub fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default()
}

pub fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or_default()
}

pub fn days_in_year(year: i32) -> i64 {
    i64::from(year_end(year).ordinal())
}

/// Calendar date reached after `portion` of `year` has elapsed. A portion of 1
/// lands on January 1 of the following year.
pub fn date_for_portion(year: i32, portion: f64) -> NaiveDate {
    let days = days_in_year(year);
    let offset = (clamp_portion(portion) * days as f64).round() as i64;
    year_start(year) + Duration::days(offset.clamp(0, days))
}
