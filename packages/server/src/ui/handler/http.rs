//! HTTP API endpoint handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{Json, extract::State};

use crate::ui::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Debug endpoint: identities currently online and their live
/// connection ids
pub async fn debug_registry(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.registry.snapshot().await;
    let online: HashMap<String, Vec<String>> = snapshot
        .into_iter()
        .map(|(user_id, connections)| {
            (
                user_id.into_string(),
                connections
                    .into_iter()
                    .map(|connection_id| connection_id.to_string())
                    .collect(),
            )
        })
        .collect();
    Json(serde_json::json!({ "online": online }))
}
