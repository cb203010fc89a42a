use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use boardb::AppError;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{present, AppState, Post};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Accepted as a number or a numeric string
    pub user_id: Option<Value>,
}

fn parse_user_id(value: Option<Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ─── GET /api/posts ──────────────────────────────────────────────

pub async fn list_posts(State(state): State<Arc<AppState>>) -> Json<Vec<Post>> {
    state.latency(75, 150).await;
    Json(state.posts.read().clone())
}

// ─── GET /api/posts/:id ──────────────────────────────────────────

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .posts
        .read()
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

    state.latency(100, 200).await;
    Ok(Json(post))
}

// ─── POST /api/posts ─────────────────────────────────────────────

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let (Some(title), Some(content), Some(user_id)) = (
        present(req.title),
        present(req.content),
        parse_user_id(req.user_id),
    ) else {
        return Err(AppError::BadRequest(
            "Title, content, and userId are required".into(),
        ));
    };

    let post = {
        let mut posts = state.posts.write();
        let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let post = Post {
            id,
            title,
            content,
            user_id,
        };
        posts.push(post.clone());
        post
    };

    state.latency(300, 400).await;
    Ok((StatusCode::CREATED, Json(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_id_accepts_number_or_string() {
        assert_eq!(parse_user_id(Some(json!(7))), Some(7));
        assert_eq!(parse_user_id(Some(json!("12"))), Some(12));
        assert_eq!(parse_user_id(Some(json!("abc"))), None);
        assert_eq!(parse_user_id(Some(json!(-1))), None);
        assert_eq!(parse_user_id(None), None);
    }

    #[tokio::test]
    async fn create_post_with_string_user_id() {
        let state = Arc::new(AppState::seeded(false));
        let (status, Json(post)) = create_post(
            State(state),
            Json(CreatePostRequest {
                title: Some("Fourth".into()),
                content: Some("More".into()),
                user_id: Some(json!("2")),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post.id, 4);
        assert_eq!(post.user_id, 2);
    }
}
