//! Carries a physician edit made in one year forward through the later
//! projected years so every year stays consistent with the edit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::medical_director::{
    holds_medical_director_hours, normalize_percentages, rebalance_after_edit,
    recompute_from_weights,
};
use super::proration::{employee_portion, partner_portion};
use super::types::{PhysicianRecord, RoleKind, RoleState, ScenarioState};

const PERCENT_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationOptions {
    /// Fall back to matching physicians across years by display name when the
    /// id is not found. Scenarios saved before ids were stable rely on this.
    pub match_by_name: bool,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        Self {
            match_by_name: true,
        }
    }
}

/// Role held N years after the edited year, indexed by `N - 1` and clamped to
/// the last entry.
const PARTNERSHIP_TRACK: &[(RoleKind, &[RoleKind])] = &[
    (
        RoleKind::NewEmployee,
        &[
            RoleKind::Employee,
            RoleKind::EmployeeBecomingPartner,
            RoleKind::Partner,
        ],
    ),
    (
        RoleKind::Employee,
        &[
            RoleKind::Employee,
            RoleKind::EmployeeBecomingPartner,
            RoleKind::Partner,
        ],
    ),
    (RoleKind::EmployeeBecomingPartner, &[RoleKind::Partner]),
    (RoleKind::Partner, &[RoleKind::Partner]),
];

fn lifecycle_rank(kind: RoleKind) -> Option<u8> {
    match kind {
        RoleKind::NewEmployee => Some(0),
        RoleKind::Employee => Some(1),
        RoleKind::EmployeeBecomingPartner => Some(2),
        RoleKind::Partner => Some(3),
        RoleKind::PartnerRetiring | RoleKind::EmployeeTerminating => None,
    }
}

pub fn progressed_role(role: &RoleState, years_ahead: usize) -> Option<RoleState> {
    if years_ahead == 0 {
        return Some(role.clone());
    }
    let (_, track) = PARTNERSHIP_TRACK
        .iter()
        .find(|(kind, _)| *kind == role.kind())?;
    let kind = track[(years_ahead - 1).min(track.len() - 1)];
    if kind == role.kind() {
        Some(role.clone())
    } else {
        Some(RoleState::from_kind(kind))
    }
}

fn locate(
    physicians: &[PhysicianRecord],
    id: &str,
    name: &str,
    options: PropagationOptions,
) -> Option<usize> {
    physicians.iter().position(|p| p.id == id).or_else(|| {
        if options.match_by_name {
            physicians.iter().position(|p| p.name == name)
        } else {
            None
        }
    })
}

fn matches_identity(
    record: &PhysicianRecord,
    id: &str,
    name: &str,
    options: PropagationOptions,
) -> bool {
    record.id == id || (options.match_by_name && record.name == name)
}

type MixSignature = Vec<(String, RoleKind, u64)>;

/// Who can hold medical director hours this year, and for how much of it.
fn director_mix(physicians: &[PhysicianRecord]) -> MixSignature {
    physicians
        .iter()
        .filter(|p| holds_medical_director_hours(p))
        .map(|p| (p.id.clone(), p.kind(), partner_portion(p).to_bits()))
        .collect()
}

fn changes_mix(previous: Option<&PhysicianRecord>, edited: &PhysicianRecord) -> bool {
    match previous {
        None => true,
        Some(prev) => {
            prev.kind() != edited.kind()
                || (employee_portion(prev) - employee_portion(edited)).abs() > PERCENT_EPS
                || (partner_portion(prev) - partner_portion(edited)).abs() > PERCENT_EPS
        }
    }
}

fn changes_director_hours(previous: Option<&PhysicianRecord>, edited: &PhysicianRecord) -> bool {
    match previous {
        None => edited.has_medical_director_hours,
        Some(prev) => {
            prev.has_medical_director_hours != edited.has_medical_director_hours
                || (prev.medical_director_hours_percentage
                    - edited.medical_director_hours_percentage)
                    .abs()
                    > PERCENT_EPS
        }
    }
}

struct EditContext<'a> {
    edited: &'a PhysicianRecord,
    lookup_name: &'a str,
    is_new: bool,
    role_changed: bool,
    mix_changed: bool,
    director_hours_changed: bool,
    options: PropagationOptions,
}

fn carry_forward(later: &mut PhysicianRecord, ctx: &EditContext<'_>, years_ahead: usize) {
    let edited = ctx.edited;
    later.id = edited.id.clone();
    later.name = edited.name.clone();
    later.salary = later.salary.max(edited.salary);
    later.weeks_vacation = later.weeks_vacation.max(edited.weeks_vacation);

    if ctx.role_changed {
        if let (Some(target), Some(current)) = (
            progressed_role(&edited.role_state, years_ahead),
            lifecycle_rank(later.kind()),
        ) {
            if lifecycle_rank(target.kind()).is_some_and(|rank| rank > current) {
                later.role_state = target;
            }
        }
    }

    if ctx.director_hours_changed {
        later.has_medical_director_hours = edited.has_medical_director_hours;
        later.medical_director_hours_percentage = edited.medical_director_hours_percentage;
    }
}

fn propagate_into_year(
    physicians: &mut Vec<PhysicianRecord>,
    ctx: &EditContext<'_>,
    years_ahead: usize,
) {
    let edited = ctx.edited;
    let before = director_mix(physicians);

    if edited.role_state.leaves_practice() {
        physicians.retain(|p| !matches_identity(p, &edited.id, ctx.lookup_name, ctx.options));
    } else {
        match locate(physicians, &edited.id, ctx.lookup_name, ctx.options) {
            Some(pos) => carry_forward(&mut physicians[pos], ctx, years_ahead),
            None if ctx.is_new => {
                if let Some(role_state) = progressed_role(&edited.role_state, years_ahead) {
                    let mut clone = edited.clone();
                    clone.role_state = role_state;
                    physicians.push(clone);
                }
            }
            None => {}
        }
    }

    if ctx.mix_changed && director_mix(physicians) != before {
        recompute_from_weights(physicians);
    }
    if ctx.director_hours_changed && !edited.role_state.leaves_practice() {
        restore_entered_percentage(physicians, edited);
        rebalance_after_edit(physicians, &edited.id);
    }
    normalize_percentages(physicians);
}

// A weight recompute may have overwritten the value the user typed.
fn restore_entered_percentage(physicians: &mut [PhysicianRecord], edited: &PhysicianRecord) {
    if let Some(record) = physicians.iter_mut().find(|p| p.id == edited.id) {
        record.medical_director_hours_percentage = edited.medical_director_hours_percentage;
    }
}

pub fn apply_physician_edit(
    mut state: ScenarioState,
    year: i32,
    edited: PhysicianRecord,
    options: PropagationOptions,
) -> ScenarioState {
    let edited = edited.sanitized();
    let Some(idx) = state.year_index(year) else {
        debug!(year, physician = %edited.id, "physician edit for unknown year ignored");
        return state;
    };

    let physicians = &mut state.years[idx].physicians;
    let position = physicians.iter().position(|p| p.id == edited.id);
    let previous = position.map(|pos| physicians[pos].clone());

    let role_changed = previous
        .as_ref()
        .is_none_or(|prev| prev.kind() != edited.kind());
    let mix_changed = changes_mix(previous.as_ref(), &edited);
    let director_hours_changed = changes_director_hours(previous.as_ref(), &edited);

    let before = director_mix(physicians);
    match position {
        Some(pos) => physicians[pos] = edited.clone(),
        None => physicians.push(edited.clone()),
    }
    if mix_changed && director_mix(physicians) != before {
        recompute_from_weights(physicians);
    }
    if director_hours_changed {
        restore_entered_percentage(physicians, &edited);
        rebalance_after_edit(physicians, &edited.id);
    }
    normalize_percentages(physicians);

    let lookup_name = previous
        .as_ref()
        .map_or_else(|| edited.name.clone(), |prev| prev.name.clone());
    let ctx = EditContext {
        edited: &edited,
        lookup_name: &lookup_name,
        is_new: previous.is_none(),
        role_changed,
        mix_changed,
        director_hours_changed,
        options,
    };
    for (offset, later) in state.years[idx + 1..].iter_mut().enumerate() {
        propagate_into_year(&mut later.physicians, &ctx, offset + 1);
    }
    state
}

pub fn remove_physician(
    mut state: ScenarioState,
    year: i32,
    physician_id: &str,
    options: PropagationOptions,
) -> ScenarioState {
    let Some(idx) = state.year_index(year) else {
        return state;
    };
    let Some(name) = state.years[idx]
        .physician(physician_id)
        .map(|p| p.name.clone())
    else {
        debug!(year, physician = physician_id, "remove for unknown physician ignored");
        return state;
    };

    for (offset, target) in state.years[idx..].iter_mut().enumerate() {
        let before = director_mix(&target.physicians);
        target.physicians.retain(|p| {
            if offset == 0 {
                p.id != physician_id
            } else {
                !matches_identity(p, physician_id, &name, options)
            }
        });
        if director_mix(&target.physicians) != before {
            recompute_from_weights(&mut target.physicians);
        }
    }
    state
}
