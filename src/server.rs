//!
//! admin_enforcer HTTP server
//! --------------------------
//! Axum HTTP API used by the ticketing host integration.
//!
//! Responsibilities:
//! - Rule listing and editing (edits only while edit mode is on).
//! - The ticket save hook: evaluate the ticket and answer allow or blocked with
//!   the message to show the agent.

use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::EnforcerConfig;
use crate::error::AppError;
use crate::host::{self, CollectingSink, TicketSnapshot};
use crate::store::RuleStore;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: RuleStore,
    pub edit_mode: bool,
}

#[derive(Debug, Deserialize)]
struct RulePayload {
    domain: String,
    email: String,
}

fn error_response(e: &AppError) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("request failed: {}", e);
    }
    (status, Json(json!({"status":"error","code": e.code_str(),"error": e.message()})))
}

fn require_edit_mode(state: &AppState) -> Result<(), AppError> {
    if state.edit_mode { Ok(()) } else { Err(AppError::locked("edit_disabled", "rule editing is disabled")) }
}

async fn list_rules(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let rules = state.store.load_all().await;
    (StatusCode::OK, Json(json!({"status":"ok","rules": rules.rules()})))
}

async fn put_rule(State(state): State<AppState>, Json(payload): Json<RulePayload>) -> (StatusCode, Json<Value>) {
    if let Err(e) = require_edit_mode(&state) { return error_response(&e); }
    match state.store.add_or_update(&payload.domain, &payload.email).await {
        Ok(rule) => (StatusCode::OK, Json(json!({"status":"ok","rule": rule}))),
        Err(e) => error_response(&e),
    }
}

async fn delete_rule(State(state): State<AppState>, Path(domain): Path<String>) -> (StatusCode, Json<Value>) {
    if let Err(e) = require_edit_mode(&state) { return error_response(&e); }
    let sink = CollectingSink::new();
    match host::remove_rule(&state.store, &domain, &sink).await {
        Ok(removed) => (StatusCode::OK, Json(json!({"status":"ok","removed": removed,"notifications": sink.take()}))),
        Err(e) => error_response(&e),
    }
}

async fn clear_rules(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Err(e) = require_edit_mode(&state) { return error_response(&e); }
    match state.store.clear().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status":"ok"}))),
        Err(e) => error_response(&e),
    }
}

async fn ticket_save(State(state): State<AppState>, Json(ticket): Json<TicketSnapshot>) -> (StatusCode, Json<Value>) {
    let sink = CollectingSink::new();
    match host::on_ticket_save(&state.store, &ticket, &sink).await {
        Ok(reason) => (StatusCode::OK, Json(json!({"status":"ok","allow": true,"reason": reason}))),
        Err(blocked) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"status":"blocked","allow": false,"message": blocked.message,"notifications": sink.take()})),
        ),
    }
}

/// Build the HTTP routes over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "admin_enforcer ok" }))
        .route("/rules", get(list_rules).put(put_rule).delete(clear_rules))
        .route("/rules/{domain}", delete(delete_rule))
        .route("/ticket/save", post(ticket_save))
        .with_state(state)
}

pub async fn run_with_config(cfg: EnforcerConfig) -> anyhow::Result<()> {
    let store = cfg.build_store()?;
    info!(
        target: "startup",
        "admin_enforcer starting: http_port={}, storage=({}), edit_mode={}",
        cfg.http_port, store.describe(), cfg.edit_mode
    );
    let app = router(AppState { store, edit_mode: cfg.edit_mode });

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run() -> anyhow::Result<()> {
    run_with_config(EnforcerConfig::from_env()?).await
}
