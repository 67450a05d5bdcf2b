use std::sync::MutexGuard;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::SharedPackman;
use crate::db::Database;
use crate::engine::{ImportOutcome, MarkOutcome, Packman};
use crate::models::*;

fn lock(packman: &SharedPackman) -> MutexGuard<'_, Packman<Database>> {
    packman.lock().expect("packman lock poisoned")
}

/// Map an operation outcome to a status code; the outcome is always the body.
fn mark_response(outcome: MarkOutcome) -> (StatusCode, Json<MarkOutcome>) {
    let status = match &outcome {
        MarkOutcome::Applied { .. } => StatusCode::OK,
        MarkOutcome::Scheduled { .. } => StatusCode::ACCEPTED,
        MarkOutcome::Busy { pending_id } => {
            tracing::debug!("Rejected mark while {} is pending", pending_id);
            StatusCode::CONFLICT
        }
        MarkOutcome::UnknownNode { .. } => StatusCode::NOT_FOUND,
    };
    (status, Json(outcome))
}

/// Complete a scheduled mark once its delay has passed.
fn spawn_tick(packman: SharedPackman, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut packman = packman.lock().expect("packman lock poisoned");
        packman.tick();
    });
}

fn schedule_if_needed(packman: &SharedPackman, outcome: &MarkOutcome) {
    if let MarkOutcome::Scheduled { delay_ms, .. } = outcome {
        spawn_tick(packman.clone(), Duration::from_millis(*delay_ms));
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Views
// ============================================================

pub async fn get_view_model(State(packman): State<SharedPackman>) -> Json<ViewModel> {
    Json(lock(&packman).view_model())
}

pub async fn get_view(
    State(packman): State<SharedPackman>,
    Path(view): Path<String>,
) -> Result<Json<Vec<ViewEntry>>, (StatusCode, String)> {
    let view = View::from_str(&view).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Unknown view: {}", view),
    ))?;
    Ok(Json(lock(&packman).view(view)))
}

// ============================================================
// Nodes
// ============================================================

pub async fn list_nodes(State(packman): State<SharedPackman>) -> Json<Vec<Node>> {
    Json(lock(&packman).nodes().to_vec())
}

pub async fn get_node(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> Result<Json<NodeDetail>, (StatusCode, String)> {
    let packman = lock(&packman);
    let node = packman
        .tree()
        .node(&id)
        .cloned()
        .ok_or((StatusCode::NOT_FOUND, "Node not found".to_string()))?;
    Ok(Json(NodeDetail {
        status: packman.states().get(&id),
        is_group: packman.tree().is_group(&id),
        node,
    }))
}

// ============================================================
// Import / reset
// ============================================================

pub async fn import_text(
    State(packman): State<SharedPackman>,
    body: String,
) -> (StatusCode, Json<ImportOutcome>) {
    let outcome = lock(&packman).import_text(&body);
    let status = match outcome {
        ImportOutcome::Imported { .. } => StatusCode::OK,
        ImportOutcome::NoItemsFound => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(outcome))
}

pub async fn reset(State(packman): State<SharedPackman>) -> (StatusCode, Json<ImportOutcome>) {
    let nodes = lock(&packman).reset_to_default();
    (StatusCode::OK, Json(ImportOutcome::Imported { nodes }))
}

// ============================================================
// Items
// ============================================================

pub async fn pack_item(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    let outcome = lock(&packman).pack_item(&id);
    schedule_if_needed(&packman, &outcome);
    mark_response(outcome)
}

pub async fn not_needed_item(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    let outcome = lock(&packman).not_needed_item(&id);
    schedule_if_needed(&packman, &outcome);
    mark_response(outcome)
}

pub async fn restore_item(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    mark_response(lock(&packman).restore_item(&id))
}

// ============================================================
// Groups
// ============================================================

pub async fn pack_group(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    mark_response(lock(&packman).pack_group(&id))
}

pub async fn not_needed_group(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    mark_response(lock(&packman).not_needed_group(&id))
}

pub async fn restore_group(
    State(packman): State<SharedPackman>,
    Path(id): Path<String>,
) -> (StatusCode, Json<MarkOutcome>) {
    mark_response(lock(&packman).restore_group(&id))
}
