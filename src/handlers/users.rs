use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use boardb::AppError;
use serde::Deserialize;
use std::sync::Arc;

use super::{present, AppState, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

// ─── GET /api/users ──────────────────────────────────────────────

pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    state.latency(50, 100).await;
    Json(state.users.read().clone())
}

// ─── GET /api/users/:id ──────────────────────────────────────────

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .read()
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .ok_or_else(not_found)?;

    state.latency(100, 200).await;
    Ok(Json(user))
}

// ─── POST /api/users ─────────────────────────────────────────────

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let (Some(name), Some(email)) = (present(req.name), present(req.email)) else {
        return Err(AppError::BadRequest("Name and email are required".into()));
    };

    let user = {
        let mut users = state.users.write();
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User { id, name, email };
        users.push(user.clone());
        user
    };

    state.latency(200, 300).await;
    Ok((StatusCode::CREATED, Json(user)))
}

// ─── PUT /api/users/:id ──────────────────────────────────────────

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = {
        let mut users = state.users.write();
        let user = users.iter_mut().find(|u| u.id == id).ok_or_else(not_found)?;
        if let Some(name) = present(req.name) {
            user.name = name;
        }
        if let Some(email) = present(req.email) {
            user.email = email;
        }
        user.clone()
    };

    state.latency(150, 250).await;
    Ok(Json(user))
}

// ─── DELETE /api/users/:id ───────────────────────────────────────

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    {
        let mut users = state.users.write();
        let index = users.iter().position(|u| u.id == id).ok_or_else(not_found)?;
        users.remove(index);
    }

    state.latency(50, 100).await;
    Ok(StatusCode::NO_CONTENT)
}
