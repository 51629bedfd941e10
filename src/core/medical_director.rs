use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::proration::{fte_weight, is_partner_eligible};
use super::types::{PhysicianRecord, clamp_money, clamp_percentage};

const PERCENT_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicalDirectorAllocation {
    pub by_physician: BTreeMap<String, f64>,
    pub total: f64,
}

impl MedicalDirectorAllocation {
    pub fn amount_for(&self, physician_id: &str) -> f64 {
        self.by_physician.get(physician_id).copied().unwrap_or(0.0)
    }
}

pub fn holds_medical_director_hours(record: &PhysicianRecord) -> bool {
    record.has_medical_director_hours && is_partner_eligible(record)
}

pub fn allocate_medical_director(
    pool: f64,
    prcs_pool: f64,
    prcs_assignee: Option<&str>,
    physicians: &[PhysicianRecord],
) -> MedicalDirectorAllocation {
    let pool = clamp_money(pool);
    let prcs_pool = clamp_money(prcs_pool);
    let mut allocation = MedicalDirectorAllocation::default();

    for record in physicians.iter().filter(|p| holds_medical_director_hours(p)) {
        let share = clamp_percentage(record.medical_director_hours_percentage) / 100.0 * pool;
        *allocation
            .by_physician
            .entry(record.id.clone())
            .or_insert(0.0) += share;
        allocation.total += share;
    }

    if let Some(assignee) = prcs_assignee {
        match physicians
            .iter()
            .find(|p| p.id == assignee && is_partner_eligible(p))
        {
            Some(record) => {
                *allocation
                    .by_physician
                    .entry(record.id.clone())
                    .or_insert(0.0) += prcs_pool;
                allocation.total += prcs_pool;
            }
            None => debug!(assignee, "PRCS assignee not present this year; no allocation"),
        }
    }

    allocation
}

pub fn percentage_total(physicians: &[PhysicianRecord]) -> f64 {
    physicians
        .iter()
        .filter(|p| holds_medical_director_hours(p))
        .map(|p| p.medical_director_hours_percentage)
        .sum()
}

fn eligible_indices(physicians: &[PhysicianRecord]) -> Vec<usize> {
    physicians
        .iter()
        .enumerate()
        .filter(|(_, p)| holds_medical_director_hours(p))
        .map(|(idx, _)| idx)
        .collect()
}

/// Splits `total` percent over `indices` by partner weight, or evenly when
/// every weight is zero.
fn split_by_weight(physicians: &mut [PhysicianRecord], indices: &[usize], total: f64) {
    if indices.is_empty() {
        return;
    }
    let weight_sum: f64 = indices.iter().map(|&i| fte_weight(&physicians[i])).sum();
    for &i in indices {
        physicians[i].medical_director_hours_percentage = if weight_sum > PERCENT_EPS {
            total * fte_weight(&physicians[i]) / weight_sum
        } else {
            total / indices.len() as f64
        };
    }
}

pub fn recompute_from_weights(physicians: &mut [PhysicianRecord]) {
    let indices = eligible_indices(physicians);
    split_by_weight(physicians, &indices, 100.0);
}

/// Keeps the edited physician's percentage as entered and rebalances every
/// other eligible physician so the year still totals 100.
pub fn rebalance_after_edit(physicians: &mut [PhysicianRecord], edited_id: &str) {
    let indices = eligible_indices(physicians);
    let Some(&edited) = indices.iter().find(|&&i| physicians[i].id == edited_id) else {
        normalize_percentages(physicians);
        return;
    };
    let others: Vec<usize> = indices.into_iter().filter(|&i| i != edited).collect();

    let target = clamp_percentage(physicians[edited].medical_director_hours_percentage);
    if others.is_empty() {
        if (target - 100.0).abs() > PERCENT_EPS {
            debug!(physician = edited_id, "sole medical director set to 100%");
        }
        physicians[edited].medical_director_hours_percentage = 100.0;
        return;
    }
    physicians[edited].medical_director_hours_percentage = target;

    let remaining = 100.0 - target;
    let others_sum: f64 = others
        .iter()
        .map(|&i| physicians[i].medical_director_hours_percentage.max(0.0))
        .sum();
    if others_sum > PERCENT_EPS {
        for &i in &others {
            let current = physicians[i].medical_director_hours_percentage.max(0.0);
            physicians[i].medical_director_hours_percentage = current * remaining / others_sum;
        }
    } else {
        split_by_weight(physicians, &others, remaining);
    }
}

pub fn normalize_percentages(physicians: &mut [PhysicianRecord]) {
    let indices = eligible_indices(physicians);
    if indices.is_empty() {
        return;
    }
    let total = percentage_total(physicians);
    if (total - 100.0).abs() <= 1e-6 {
        return;
    }
    warn!(total, "medical director percentages do not total 100; rebalancing");
    if total > PERCENT_EPS {
        for &i in &indices {
            let current = physicians[i].medical_director_hours_percentage.max(0.0);
            physicians[i].medical_director_hours_percentage = current * 100.0 / total;
        }
    } else {
        split_by_weight(physicians, &indices, 100.0);
    }
}
