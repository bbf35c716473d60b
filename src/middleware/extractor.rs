use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::error::AuthError;
use crate::types::{Attributes, Principal};

/// Authenticated CAS user, placed in request extensions by the
/// [`bounce`](super::bounce) / [`block`](super::block) middleware.
///
/// Use as an Axum extractor in route handlers behind that middleware.
/// Returns `401 Unauthorized` if the request was not authenticated.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(user: CasUser) -> impl IntoResponse {
///     format!("Hello, {}", user.principal)
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn public(user: Option<CasUser>) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}", u.principal),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasUser {
    /// CAS principal (user identifier).
    pub principal: Principal,
    /// Released attributes; empty unless a session info slot is configured.
    pub attributes: Attributes,
}

impl<S: Send + Sync> FromRequestParts<S> for CasUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CasUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CasUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CasUser>().cloned())
    }
}
