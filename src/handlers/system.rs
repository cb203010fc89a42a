use axum::{extract::State, Json};
use boardb::AppError;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ─── GET /api/error ──────────────────────────────────────────────
/// Always fails, so the dashboard has something red to show.

pub async fn error() -> AppError {
    AppError::Internal("This is a test error endpoint".into())
}

// ─── GET /api/slow ───────────────────────────────────────────────

pub async fn slow(State(state): State<Arc<AppState>>) -> Json<Message> {
    state.latency(2000, 1000).await;
    Json(Message {
        message: "This was a slow endpoint",
    })
}
