use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    CompensationModel, CompensationRow, PoolBreakdown, PracticeSummary, PropagationOptions,
    ScenarioEdit, ScenarioKey, ScenarioSeed, Snapshot, default_historic_years,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiScenarioSeed {
    Defaults,
    #[serde(alias = "copyOfA")]
    CopyOfA,
}

impl From<ApiScenarioSeed> for ScenarioSeed {
    fn from(value: ApiScenarioSeed) -> Self {
        match value {
            ApiScenarioSeed::Defaults => ScenarioSeed::Defaults,
            ApiScenarioSeed::CopyOfA => ScenarioSeed::CopyOfA,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CompensationPayload {
    snapshot: Option<Snapshot>,
    year: Option<i32>,
    scenario: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CompensationQuery {
    year: Option<i32>,
    scenario: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EditPayload {
    snapshot: Option<Snapshot>,
    scenario: Option<String>,
    match_by_name: Option<bool>,
    edit: Option<ScenarioEdit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioBPayload {
    snapshot: Option<Snapshot>,
    enabled: Option<bool>,
    seed: Option<ApiScenarioSeed>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompensationResponse {
    year: i32,
    scenario: ScenarioKey,
    rows: Vec<CompensationRow>,
    breakdown: PoolBreakdown,
    summary: PracticeSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResponse {
    years: Vec<i32>,
    snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "compensation API listening");
    println!("Compensation HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/defaults");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/api/defaults", get(defaults_handler))
        .route(
            "/api/compensation",
            get(compensation_get_handler).post(compensation_post_handler),
        )
        .route("/api/edit", post(edit_handler))
        .route("/api/scenario-b", post(scenario_b_handler))
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn defaults_handler() -> Response {
    let model = CompensationModel::default();
    json_response(StatusCode::OK, snapshot_response(&model))
}

async fn compensation_get_handler(Query(query): Query<CompensationQuery>) -> Response {
    let payload = CompensationPayload {
        snapshot: None,
        year: query.year,
        scenario: query.scenario,
    };
    respond(compensation_from_payload(payload))
}

async fn compensation_post_handler(Json(payload): Json<CompensationPayload>) -> Response {
    respond(compensation_from_payload(payload))
}

async fn edit_handler(Json(payload): Json<EditPayload>) -> Response {
    respond(edit_from_payload(payload))
}

async fn scenario_b_handler(Json(payload): Json<ScenarioBPayload>) -> Response {
    respond(scenario_b_from_payload(payload))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            debug!(error = %msg, "rejected API request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

pub fn parse_scenario_key(raw: &str) -> Result<ScenarioKey, String> {
    match raw.trim() {
        "a" | "A" => Ok(ScenarioKey::A),
        "b" | "B" => Ok(ScenarioKey::B),
        other => Err(format!("Unknown scenario '{other}'; expected 'a' or 'b'")),
    }
}

fn load_model(snapshot: Option<Snapshot>) -> Result<CompensationModel, String> {
    match snapshot {
        Some(snapshot) => CompensationModel::from_snapshot(default_historic_years(), snapshot)
            .map_err(|e| e.to_string()),
        None => Ok(CompensationModel::default()),
    }
}

fn resolve_scenario(model: &CompensationModel, raw: Option<&str>) -> Result<ScenarioKey, String> {
    let key = raw.map(parse_scenario_key).transpose()?.unwrap_or(ScenarioKey::A);
    if model.scenario(key).is_none() {
        return Err("Scenario 'b' is not enabled".to_string());
    }
    Ok(key)
}

fn resolve_year(model: &CompensationModel, key: ScenarioKey, year: i32) -> Result<i32, String> {
    let years = model.years(key);
    if years.contains(&year) {
        Ok(year)
    } else {
        Err(format!(
            "Unknown year {year}; scenario covers {}",
            describe_years(&years)
        ))
    }
}

fn describe_years(years: &[i32]) -> String {
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => "no years".to_string(),
    }
}

fn edit_year(edit: &ScenarioEdit) -> Option<i32> {
    match edit {
        ScenarioEdit::Physician { year, .. }
        | ScenarioEdit::RemovePhysician { year, .. }
        | ScenarioEdit::Financial { year, .. }
        | ScenarioEdit::ClearFinancialOverride { year, .. } => Some(*year),
        ScenarioEdit::ProjectionSetting { .. }
        | ScenarioEdit::BaselineMode { .. }
        | ScenarioEdit::Reset => None,
    }
}

fn snapshot_response(model: &CompensationModel) -> SnapshotResponse {
    SnapshotResponse {
        years: model.years(ScenarioKey::A),
        snapshot: model.export_snapshot(),
    }
}

fn compensation_from_payload(payload: CompensationPayload) -> Result<CompensationResponse, String> {
    let model = load_model(payload.snapshot)?;
    let scenario = resolve_scenario(&model, payload.scenario.as_deref())?;
    let year = match payload.year {
        Some(year) => resolve_year(&model, scenario, year)?,
        None => model
            .scenario(scenario)
            .and_then(|s| s.baseline_year())
            .ok_or_else(|| "Scenario has no years".to_string())?,
    };

    Ok(CompensationResponse {
        year,
        scenario,
        rows: model.compute_compensation(year, scenario),
        breakdown: model.partner_pool_breakdown(year, scenario),
        summary: model.practice_summary(year, scenario),
    })
}

fn edit_from_payload(payload: EditPayload) -> Result<SnapshotResponse, String> {
    let edit = payload
        .edit
        .ok_or_else(|| "Missing 'edit' in request".to_string())?;
    let mut model = load_model(payload.snapshot)?;
    if let Some(match_by_name) = payload.match_by_name {
        model = model.with_options(PropagationOptions { match_by_name });
    }
    let scenario = resolve_scenario(&model, payload.scenario.as_deref())?;
    if let Some(year) = edit_year(&edit) {
        resolve_year(&model, scenario, year)?;
    }

    model.apply(scenario, edit);
    Ok(snapshot_response(&model))
}

fn scenario_b_from_payload(payload: ScenarioBPayload) -> Result<SnapshotResponse, String> {
    let mut model = load_model(payload.snapshot)?;
    if payload.enabled.unwrap_or(true) {
        let seed = payload.seed.unwrap_or(ApiScenarioSeed::CopyOfA);
        model.enable_scenario_b(seed.into());
    } else {
        model.disable_scenario_b();
    }
    Ok(snapshot_response(&model))
}

pub fn render_table(model: &CompensationModel, year: i32, key: ScenarioKey) -> Result<String, String> {
    if model.scenario(key).is_none() {
        return Err("Scenario 'b' is not enabled".to_string());
    }
    resolve_year(model, key, year)?;

    let mut out = String::new();
    write_table(
        &mut out,
        key,
        year,
        &model.compute_compensation(year, key),
        &model.partner_pool_breakdown(year, key),
        &model.practice_summary(year, key),
    )
    .map_err(|e| format!("Failed to format table: {e}"))?;
    Ok(out)
}

fn write_table(
    out: &mut impl std::fmt::Write,
    key: ScenarioKey,
    year: i32,
    rows: &[CompensationRow],
    breakdown: &PoolBreakdown,
    summary: &PracticeSummary,
) -> std::fmt::Result {
    writeln!(out, "Scenario {key:?} / {year}")?;
    writeln!(
        out,
        "{:<26} {:<28} {:>14} {:>14} {:>12} {:>12}",
        "Physician", "Role", "Compensation", "Pool share", "Director", "Delayed"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:<26} {:<28} {:>14.2} {:>14.2} {:>12.2} {:>12.2}",
            row.name,
            row.role.label(),
            row.compensation,
            row.pool_share,
            row.medical_director,
            row.delayed_compensation
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Therapy income       {:>14.2}", summary.therapy_income)?;
    writeln!(out, "Total costs          {:>14.2}", summary.total_costs)?;
    writeln!(out, "Employee costs       {:>14.2}", breakdown.total_employee_cost)?;
    writeln!(out, "Buyouts              {:>14.2}", breakdown.total_buyout_cost)?;
    writeln!(out, "Delayed W2           {:>14.2}", breakdown.total_delayed_cost)?;
    writeln!(
        out,
        "Director allocations {:>14.2}",
        breakdown.total_medical_director_allocation
    )?;
    writeln!(out, "Partner pool         {:>14.2}", breakdown.distributable_pool)
}

#[cfg(test)]
fn compensation_from_json(json: &str) -> Result<CompensationResponse, String> {
    let payload = serde_json::from_str::<CompensationPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    compensation_from_payload(payload)
}

#[cfg(test)]
fn edit_from_json(json: &str) -> Result<SnapshotResponse, String> {
    let payload = serde_json::from_str::<EditPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    edit_from_payload(payload)
}
