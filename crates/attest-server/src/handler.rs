use attest_sdk::{
    AccessReport, Attest, CommitOutcome, HistoryView, PrincipalId, Record, RecordId,
    UploadReceipt, VerificationResult,
};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Caller;
use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub attest: Attest,
}

impl AppState {
    pub fn new(attest: Attest) -> Self {
        Self { attest }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessParams {
    /// Who read the record. Defaults to the caller.
    pub accessor: Option<String>,
}

fn parse_id(raw: &str) -> ServerResult<RecordId> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid record id: {raw}")))
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "attest-server",
        "version": env!("CARGO_PKG_VERSION"),
        "writer": state.attest.writer(),
    }))
}

pub async fn upload_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<UploadReceipt>)> {
    let receipt = state.attest.upload(owner, body.to_vec())?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> ServerResult<Json<Vec<Record>>> {
    Ok(Json(state.attest.list(&owner)?))
}

pub async fn commit_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> ServerResult<Json<CommitOutcome>> {
    let id = parse_id(&id)?;
    Ok(Json(state.attest.commit(id, &owner).await?))
}

pub async fn verify_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> ServerResult<Json<VerificationResult>> {
    let id = parse_id(&id)?;
    Ok(Json(state.attest.verify(id, &owner).await?))
}

pub async fn access_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
    Query(params): Query<AccessParams>,
) -> ServerResult<Json<AccessReport>> {
    let id = parse_id(&id)?;
    let accessor = match params.accessor {
        Some(name) => PrincipalId::new(name).map_err(|e| ServerError::BadRequest(e.to_string()))?,
        None => owner.clone(),
    };
    Ok(Json(state.attest.log_access(id, &owner, accessor).await?))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> ServerResult<Json<HistoryView>> {
    let id = parse_id(&id)?;
    Ok(Json(state.attest.history(id, &owner).await?))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = parse_id(&id)?;
    state.attest.delete(id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}
