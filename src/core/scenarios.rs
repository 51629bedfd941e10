//! The two what-if scenarios the display layer works with, plus the entry
//! points it calls to read compensation and apply edits.
//!
//! Every mutation runs a reducer that takes the scenario by value and returns
//! the replacement, so scenario A and scenario B never share state.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::defaults::{default_historic_years, default_scenario};
use super::engine::{YearComputation, compute_year, practice_summary};
use super::error::SnapshotError;
use super::medical_director::normalize_percentages;
use super::projection::{
    apply_financial_edit, apply_projection_setting, clear_financial_override, regrow,
    set_baseline_mode,
};
use super::proration::is_modelled_year;
use super::propagate::{PropagationOptions, apply_physician_edit, remove_physician};
use super::types::{
    BaselineMode, CompensationRow, FinancialField, HistoricYear, PhysicianRecord, PoolBreakdown,
    PracticeSummary, ProjectionSetting, ScenarioEdit, ScenarioKey, ScenarioState, Snapshot,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScenarioSeed {
    Defaults,
    CopyOfA,
}

#[derive(Debug, Clone)]
pub struct CompensationModel {
    historic: Vec<HistoricYear>,
    scenario_a: ScenarioState,
    scenario_b: Option<ScenarioState>,
    options: PropagationOptions,
}

impl Default for CompensationModel {
    fn default() -> Self {
        Self::new(default_historic_years())
    }
}

impl CompensationModel {
    pub fn new(historic: Vec<HistoricYear>) -> Self {
        let scenario_a = default_scenario(&historic);
        Self {
            historic,
            scenario_a,
            scenario_b: None,
            options: PropagationOptions::default(),
        }
    }

    pub fn from_snapshot(
        historic: Vec<HistoricYear>,
        snapshot: Snapshot,
    ) -> Result<Self, SnapshotError> {
        let mut model = Self::new(historic);
        model.load_snapshot(snapshot)?;
        Ok(model)
    }

    pub fn with_options(mut self, options: PropagationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn scenario(&self, key: ScenarioKey) -> Option<&ScenarioState> {
        match key {
            ScenarioKey::A => Some(&self.scenario_a),
            ScenarioKey::B => self.scenario_b.as_ref(),
        }
    }

    pub fn has_scenario_b(&self) -> bool {
        self.scenario_b.is_some()
    }

    pub fn years(&self, key: ScenarioKey) -> Vec<i32> {
        self.scenario(key)
            .map(|s| s.years.iter().map(|y| y.year).collect())
            .unwrap_or_default()
    }

    pub fn compute(&self, year: i32, key: ScenarioKey) -> Option<YearComputation> {
        let scenario = self.scenario(key)?;
        let financials = scenario.year(year)?;
        Some(compute_year(financials, &scenario.settings))
    }

    pub fn compute_compensation(&self, year: i32, key: ScenarioKey) -> Vec<CompensationRow> {
        self.compute(year, key)
            .map(|computation| computation.rows())
            .unwrap_or_default()
    }

    pub fn partner_pool_breakdown(&self, year: i32, key: ScenarioKey) -> PoolBreakdown {
        self.compute(year, key)
            .map(|computation| computation.rounded_breakdown())
            .unwrap_or_default()
    }

    pub fn practice_summary(&self, year: i32, key: ScenarioKey) -> PracticeSummary {
        let Some(scenario) = self.scenario(key) else {
            return PracticeSummary::default();
        };
        let Some(financials) = scenario.year(year) else {
            return PracticeSummary::default();
        };
        practice_summary(financials, &compute_year(financials, &scenario.settings))
    }

    fn update(&mut self, key: ScenarioKey, reducer: impl FnOnce(ScenarioState) -> ScenarioState) {
        match key {
            ScenarioKey::A => {
                let state = std::mem::take(&mut self.scenario_a);
                self.scenario_a = reducer(state);
            }
            ScenarioKey::B => match self.scenario_b.take() {
                Some(state) => self.scenario_b = Some(reducer(state)),
                None => debug!("edit for scenario B ignored; scenario B is disabled"),
            },
        }
    }

    pub fn apply_physician_edit(&mut self, key: ScenarioKey, year: i32, record: PhysicianRecord) {
        let options = self.options;
        self.update(key, |state| apply_physician_edit(state, year, record, options));
    }

    pub fn remove_physician(&mut self, key: ScenarioKey, year: i32, physician_id: &str) {
        let options = self.options;
        self.update(key, |state| remove_physician(state, year, physician_id, options));
    }

    pub fn apply_financial_edit(
        &mut self,
        key: ScenarioKey,
        year: i32,
        field: FinancialField,
        value: f64,
    ) {
        self.update(key, |state| apply_financial_edit(state, year, field, value));
    }

    pub fn clear_financial_override(&mut self, key: ScenarioKey, year: i32, field: FinancialField) {
        self.update(key, |state| clear_financial_override(state, year, field));
    }

    pub fn apply_projection_setting(
        &mut self,
        key: ScenarioKey,
        setting: ProjectionSetting,
        value: f64,
    ) {
        self.update(key, |state| apply_projection_setting(state, setting, value));
    }

    pub fn set_baseline_mode(&mut self, key: ScenarioKey, mode: BaselineMode) {
        let historic = self.historic.clone();
        self.update(key, |state| set_baseline_mode(state, mode, &historic));
    }

    pub fn reset_to_defaults(&mut self, key: ScenarioKey) {
        let fresh = default_scenario(&self.historic);
        self.update(key, |_| fresh);
    }

    pub fn apply(&mut self, key: ScenarioKey, edit: ScenarioEdit) {
        match edit {
            ScenarioEdit::Physician { year, record } => self.apply_physician_edit(key, year, record),
            ScenarioEdit::RemovePhysician { year, physician_id } => {
                self.remove_physician(key, year, &physician_id)
            }
            ScenarioEdit::Financial { year, field, value } => {
                self.apply_financial_edit(key, year, field, value)
            }
            ScenarioEdit::ClearFinancialOverride { year, field } => {
                self.clear_financial_override(key, year, field)
            }
            ScenarioEdit::ProjectionSetting { setting, value } => {
                self.apply_projection_setting(key, setting, value)
            }
            ScenarioEdit::BaselineMode { mode } => self.set_baseline_mode(key, mode),
            ScenarioEdit::Reset => self.reset_to_defaults(key),
        }
    }

    pub fn enable_scenario_b(&mut self, seed: ScenarioSeed) {
        let state = match seed {
            ScenarioSeed::Defaults => default_scenario(&self.historic),
            ScenarioSeed::CopyOfA => self.scenario_a.clone(),
        };
        info!(?seed, "scenario B enabled");
        self.scenario_b = Some(state);
    }

    pub fn disable_scenario_b(&mut self) {
        self.scenario_b = None;
    }

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            scenario_a: self.scenario_a.clone(),
            scenario_b: self.scenario_b.clone(),
        }
    }

    /// Replaces both scenarios. The model is left untouched when the snapshot
    /// is structurally unusable.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let scenario_a = sanitize_scenario(ScenarioKey::A, snapshot.scenario_a)?;
        let scenario_b = snapshot
            .scenario_b
            .map(|state| sanitize_scenario(ScenarioKey::B, state))
            .transpose()?;
        self.scenario_a = scenario_a;
        self.scenario_b = scenario_b;
        Ok(())
    }

    pub fn load_snapshot_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        self.load_snapshot(snapshot)
    }
}

fn sanitize_scenario(key: ScenarioKey, mut state: ScenarioState) -> Result<ScenarioState, SnapshotError> {
    if state.years.is_empty() {
        return Err(SnapshotError::MissingYears(key));
    }
    if let Some(year) = state.years.iter().map(|y| y.year).find(|y| !is_modelled_year(*y)) {
        return Err(SnapshotError::YearOutOfRange { key, year });
    }
    state.years.sort_by_key(|y| y.year);
    let mut seen = BTreeSet::new();
    for year in &state.years {
        if !seen.insert(year.year) {
            return Err(SnapshotError::DuplicateYear {
                key,
                year: year.year,
            });
        }
    }
    for year in &mut state.years {
        year.physicians = std::mem::take(&mut year.physicians)
            .into_iter()
            .map(PhysicianRecord::sanitized)
            .collect();
        normalize_percentages(&mut year.physicians);
    }
    Ok(regrow(state))
}
