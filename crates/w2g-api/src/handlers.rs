//! API Handlers
//!
//! Stages block on network calls, so every invocation runs on the blocking
//! pool with a fresh [`w2g_core::ExecutionContext`].
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use w2g_core::{GiveState, PipelineInput, PipelineRun, W2G_VERSION};
use w2g_results::{read_activity, read_records, ActivityEntry, RunSummary, DEFAULT_ACTIVITY_LIMIT};
use w2g_stages::{
    RewardInput, RewardState, RouterInput, RouterState, ValidationOutcome, ValidatorInput,
    VaultInput, VaultState, STAGE_IDS,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Runs `work` on the blocking pool and records it under `endpoint`.
async fn invoke<T, F>(state: &AppState, endpoint: &'static str, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    let m = &state.metrics;
    m.requests.with_label_values(&[endpoint]).inc();
    let started = Instant::now();

    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::from)
        .and_then(|r| r);

    m.latency
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
    if result.is_err() {
        m.failures.with_label_values(&[endpoint]).inc();
    }
    result
}

pub async fn give_router(
    State(state): State<AppState>,
    Json(input): Json<RouterInput>,
) -> Result<Json<RouterState>, ApiError> {
    let ctx = state.context();
    let stage = state.stages.router.clone();
    let (out, _) = invoke(&state, "give_router", move || Ok(stage.route(input, &ctx)?)).await?;
    Ok(Json(out))
}

pub async fn photo_validator(
    State(state): State<AppState>,
    Json(input): Json<ValidatorInput>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let ctx = state.context();
    let stage = state.stages.validator.clone();
    let (out, _) =
        invoke(&state, "photo_validator", move || Ok(stage.validate(input, &ctx)?)).await?;
    Ok(Json(out))
}

pub async fn vault_decider(
    State(state): State<AppState>,
    Json(input): Json<VaultInput>,
) -> Result<Json<VaultState>, ApiError> {
    let ctx = state.context();
    let stage = state.stages.vault.clone();
    let (out, _) = invoke(&state, "vault_decider", move || Ok(stage.decide(input, &ctx)?)).await?;
    Ok(Json(out))
}

pub async fn reward(
    State(state): State<AppState>,
    Json(input): Json<RewardInput>,
) -> Result<Json<RewardState>, ApiError> {
    let ctx = state.context();
    let stage = state.stages.reward.clone();
    let (out, _) = invoke(&state, "reward", move || Ok(stage.reward(input, &ctx)?)).await?;
    Ok(Json(out))
}

pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(input): Json<PipelineInput>,
) -> Result<Json<PipelineRun>, ApiError> {
    let ctx = state.context();
    let pipeline = state.pipeline.clone();
    let sink = state.sink.clone();
    let run = invoke(&state, "pipeline", move || {
        Ok(pipeline.run_and_record(input, sink.as_ref(), &ctx)?)
    })
    .await?;

    record_outcome(&state, &run.state);
    Ok(Json(run))
}

fn record_outcome(state: &AppState, record: &GiveState) {
    let outcomes = &state.metrics.outcomes;
    if let Some(status) = record.status {
        outcomes.with_label_values(&["status", label(&status).as_str()]).inc();
    }
    if let Some(action) = record.action {
        outcomes.with_label_values(&["action", label(&action).as_str()]).inc();
    }
    if let Some(reward) = &record.reward_type {
        outcomes.with_label_values(&["reward_type", reward.as_str()]).inc();
    }
}

/// The snake_case wire name of a status enum.
fn label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => "unknown".to_string(),
    }
}

pub async fn results(State(state): State<AppState>) -> Result<Json<Vec<GiveState>>, ApiError> {
    let path = state.results_path.clone();
    let records = tokio::task::spawn_blocking(move || read_records(&path)).await??;
    Ok(Json(records))
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<RunSummary>, ApiError> {
    let path = state.results_path.clone();
    let records = tokio::task::spawn_blocking(move || read_records(&path)).await??;
    Ok(Json(RunSummary::from_records(&records)))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let path = state.log_path.clone();
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let now = Local::now().naive_local();
    let entries =
        tokio::task::spawn_blocking(move || read_activity(&path, &STAGE_IDS, limit, now)).await??;
    Ok(Json(entries))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "version": W2G_VERSION })))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = crate::metrics::encode(state.metrics.registry())?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
