//! Request extractors: the authenticated actor and listing options.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use entities::Actor;
use std::convert::Infallible;
use tracing::debug;

use crate::{error::ApiError, AppState};

pub const EXTENDED_METADATA_HEADER: &str = "x-extended-metadata";

/// The actor behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                debug!("Request without bearer token");
                ApiError::Unauthorized
            })?;

        let actor = state.sessions.authenticate(token).await?;
        Ok(CurrentActor(actor))
    }
}

/// Whether the caller asked for extended metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedMetadata(pub bool);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ExtendedMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let extended = parts
            .headers
            .get(EXTENDED_METADATA_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(ExtendedMetadata(extended))
    }
}
