pub mod posts;
pub mod system;
pub mod users;

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub user_id: u64,
}

// ─── Shared state ────────────────────────────────────────────────

/// In-memory data behind the sample API.
pub struct AppState {
    pub users: RwLock<Vec<User>>,
    pub posts: RwLock<Vec<Post>>,
    /// When false, handlers answer immediately instead of sleeping.
    pub simulate_latency: bool,
}

impl AppState {
    /// Seeded with three users and three posts.
    pub fn seeded(simulate_latency: bool) -> Self {
        let user = |id, name: &str, email: &str| User {
            id,
            name: name.into(),
            email: email.into(),
        };
        let post = |id, title: &str, content: &str, user_id| Post {
            id,
            title: title.into(),
            content: content.into(),
            user_id,
        };

        Self {
            users: RwLock::new(vec![
                user(1, "John Doe", "john@example.com"),
                user(2, "Jane Smith", "jane@example.com"),
                user(3, "Bob Johnson", "bob@example.com"),
            ]),
            posts: RwLock::new(vec![
                post(1, "First Post", "Hello World", 1),
                post(2, "Second Post", "This is a test", 2),
                post(3, "Third Post", "Another post", 1),
            ]),
            simulate_latency,
        }
    }

    /// Sleeps `base_ms` plus up to `spread_ms` of random jitter.
    pub async fn latency(&self, base_ms: u64, spread_ms: u64) {
        if !self.simulate_latency {
            return;
        }
        let jitter = if spread_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..spread_ms)
        };
        tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
    }
}

/// Empty or whitespace-only strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
