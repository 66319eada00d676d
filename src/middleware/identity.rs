//! Caller identification headers.
//!
//! `x-visitor-id` names the browser whose behavior is tracked; `x-user` is the
//! trusted display name used for sessions, favorites and comments.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const VISITOR_HEADER: &str = "x-visitor-id";
pub const USER_HEADER: &str = "x-user";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Optional display name from `x-user`
///
/// Never rejects; identity-scoped operations decide what a missing name means.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<String>);

impl Identity {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity(header_value(parts, USER_HEADER)))
    }
}

/// Required visitor id from `x-visitor-id`
#[derive(Debug, Clone)]
pub struct VisitorId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for VisitorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, VISITOR_HEADER)
            .map(VisitorId)
            .ok_or_else(|| AppError::Validation(format!("{} header is required", VISITOR_HEADER)))
    }
}
