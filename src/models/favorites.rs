use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest comment body accepted, in characters
pub const MAX_COMMENT_LEN: usize = 500;

/// An item favorited by one identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub owner: String,
    pub external_id: String,
    pub title: String,
    pub added_at: DateTime<Utc>,
}

/// A public comment on an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub external_id: String,
    pub author: String,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// Body of `POST /favorites`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub external_id: String,
    pub title: String,
}

/// Body of `POST /comments`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub external_id: String,
    pub text: String,
    /// Defaults to the caller identity when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}
