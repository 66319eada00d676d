use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Comment, Favorite, NewComment, NewFavorite, MAX_COMMENT_LEN},
};

/// Durable storage for favorites and comments
///
/// Inputs reaching a store are already validated by `FavoritesService`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Favorites of one identity, newest first
    async fn list_favorites(&self, owner: &str) -> AppResult<Vec<Favorite>>;

    /// Fails with `Conflict` when `owner` already favorited `external_id`
    async fn add_favorite(&self, owner: &str, external_id: &str, title: &str)
        -> AppResult<Favorite>;

    /// Fails with `NotFound` for unknown ids and `Forbidden` for foreign ones
    async fn delete_favorite(&self, owner: &str, id: i64) -> AppResult<()>;

    /// Comments of one item, oldest first
    async fn list_comments(&self, external_id: &str) -> AppResult<Vec<Comment>>;

    async fn add_comment(&self, external_id: &str, author: &str, text: &str)
        -> AppResult<Comment>;

    fn name(&self) -> &'static str;
}

/// Resolves the caller identity, rejecting missing or blank names
pub fn require_identity(identity: Option<&str>) -> AppResult<&str> {
    identity
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(AppError::AuthRequired)
}

fn required_field<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// Validated, trimmed comment ready for storage
#[derive(Debug, PartialEq)]
pub struct CheckedComment<'a> {
    pub external_id: &'a str,
    pub author: &'a str,
    pub text: &'a str,
}

/// Applies the comment rules: author and text required, text at most
/// `MAX_COMMENT_LEN` characters
pub fn check_comment<'a>(
    identity: Option<&'a str>,
    comment: &'a NewComment,
) -> AppResult<CheckedComment<'a>> {
    let identity = require_identity(identity)?;
    let author = match comment.author.as_deref() {
        Some(author) => required_field(author, "author")?,
        None => identity,
    };
    let external_id = required_field(&comment.external_id, "externalId")?;
    let text = required_field(&comment.text, "text")?;

    let length = text.chars().count();
    if length > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comment is {} characters, the limit is {}",
            length, MAX_COMMENT_LEN
        )));
    }

    Ok(CheckedComment {
        external_id,
        author,
        text,
    })
}

/// Validation and identity checks in front of a `FavoritesStore`
#[derive(Clone)]
pub struct FavoritesService {
    store: Arc<dyn FavoritesStore>,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn FavoritesStore>) -> Self {
        Self { store }
    }

    pub async fn list_favorites(&self, identity: Option<&str>) -> AppResult<Vec<Favorite>> {
        let owner = require_identity(identity)?;
        self.store.list_favorites(owner).await
    }

    pub async fn add_favorite(
        &self,
        identity: Option<&str>,
        favorite: &NewFavorite,
    ) -> AppResult<Favorite> {
        let owner = require_identity(identity)?;
        let external_id = required_field(&favorite.external_id, "externalId")?;
        let title = required_field(&favorite.title, "title")?;

        let created = self.store.add_favorite(owner, external_id, title).await?;

        tracing::info!(
            owner = %owner,
            external_id = %external_id,
            favorite_id = created.id,
            store = self.store.name(),
            "Favorite added"
        );

        Ok(created)
    }

    pub async fn delete_favorite(&self, identity: Option<&str>, id: i64) -> AppResult<()> {
        let owner = require_identity(identity)?;
        self.store.delete_favorite(owner, id).await?;
        tracing::info!(owner = %owner, favorite_id = id, "Favorite removed");
        Ok(())
    }

    pub async fn list_comments(&self, external_id: &str) -> AppResult<Vec<Comment>> {
        let external_id = required_field(external_id, "externalId")?;
        self.store.list_comments(external_id).await
    }

    pub async fn add_comment(
        &self,
        identity: Option<&str>,
        comment: &NewComment,
    ) -> AppResult<Comment> {
        let checked = check_comment(identity, comment)?;

        let created = self
            .store
            .add_comment(checked.external_id, checked.author, checked.text)
            .await?;

        tracing::info!(
            author = %checked.author,
            external_id = %checked.external_id,
            comment_id = created.id,
            "Comment posted"
        );

        Ok(created)
    }
}
