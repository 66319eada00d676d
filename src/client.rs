//! Typed client for the favorites and comments API.
//!
//! Requests are validated with the same rules the server applies, so a
//! missing identity or an invalid comment never reaches the network.

use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{AppError, AppResult},
    middleware::USER_HEADER,
    models::{Comment, Favorite, NewComment, NewFavorite},
    services::favorites::{check_comment, require_identity},
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Maps an error response onto the matching `AppError`
fn error_for_status(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::BAD_REQUEST => AppError::Validation(message),
        StatusCode::UNAUTHORIZED => AppError::AuthRequired,
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        other => AppError::ExternalApi(format!(
            "Favorites API returned status {}: {}",
            other, message
        )),
    }
}

#[derive(Clone)]
pub struct FavoritesClient {
    http_client: HttpClient,
    base_url: String,
}

impl FavoritesClient {
    /// `base_url` is the API root, e.g. `http://localhost:3001/api/v1`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, "Favorites API request rejected");
        Err(error_for_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    pub async fn list_favorites(&self, identity: Option<&str>) -> AppResult<Vec<Favorite>> {
        let identity = require_identity(identity)?;
        let request = self
            .http_client
            .get(self.url("/favorites"))
            .header(USER_HEADER, identity);
        self.send_json(request).await
    }

    pub async fn add_favorite(
        &self,
        identity: Option<&str>,
        favorite: &NewFavorite,
    ) -> AppResult<Favorite> {
        let identity = require_identity(identity)?;
        if favorite.external_id.trim().is_empty() || favorite.title.trim().is_empty() {
            return Err(AppError::Validation(
                "externalId and title are required".to_string(),
            ));
        }

        let request = self
            .http_client
            .post(self.url("/favorites"))
            .header(USER_HEADER, identity)
            .json(favorite);
        self.send_json(request).await
    }

    pub async fn delete_favorite(&self, identity: Option<&str>, id: i64) -> AppResult<()> {
        let identity = require_identity(identity)?;
        let request = self
            .http_client
            .delete(self.url(&format!("/favorites/{}", id)))
            .header(USER_HEADER, identity);
        self.send(request).await?;
        Ok(())
    }

    pub async fn list_comments(&self, external_id: &str) -> AppResult<Vec<Comment>> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(AppError::Validation("externalId is required".to_string()));
        }

        let request = self
            .http_client
            .get(self.url(&format!("/comments/{}", external_id)));
        self.send_json(request).await
    }

    pub async fn add_comment(
        &self,
        identity: Option<&str>,
        comment: &NewComment,
    ) -> AppResult<Comment> {
        let checked = check_comment(identity, comment)?;
        let body = NewComment {
            external_id: checked.external_id.to_string(),
            text: checked.text.to_string(),
            author: Some(checked.author.to_string()),
        };
        let identity = require_identity(identity)?;

        let request = self
            .http_client
            .post(self.url("/comments"))
            .header(USER_HEADER, identity)
            .json(&body);
        self.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nothing listens on port 1, so any request that is sent fails with `HttpClient`
    fn offline_client() -> FavoritesClient {
        FavoritesClient::new("http://127.0.0.1:1/api/v1/")
    }

    #[test]
    fn test_error_for_status() {
        let body = r#"{"error":"570 is already a favorite"}"#;
        assert!(matches!(
            error_for_status(StatusCode::CONFLICT, body),
            AppError::Conflict(msg) if msg == "570 is already a favorite"
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, ""),
            AppError::AuthRequired
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN, "{}"),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "gone"),
            AppError::NotFound(msg) if msg == "gone"
        ));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            AppError::ExternalApi(_)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        assert_eq!(
            offline_client().url("/favorites"),
            "http://127.0.0.1:1/api/v1/favorites"
        );
    }

    #[tokio::test]
    async fn test_overlong_comment_rejected_before_network() {
        let comment = NewComment {
            external_id: "570".to_string(),
            text: "a".repeat(501),
            author: None,
        };

        let result = offline_client().add_comment(Some("pisti"), &comment).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_identity_rejected_before_network() {
        let client = offline_client();
        assert!(matches!(
            client.list_favorites(None).await,
            Err(AppError::AuthRequired)
        ));
        assert!(matches!(
            client.delete_favorite(Some(" "), 1).await,
            Err(AppError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn test_valid_request_reaches_network() {
        let favorite = NewFavorite {
            external_id: "570".to_string(),
            title: "Dota 2".to_string(),
        };
        let result = offline_client().add_favorite(Some("pisti"), &favorite).await;
        assert!(matches!(result, Err(AppError::HttpClient(_))));
    }
}
