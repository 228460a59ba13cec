// src/auth/mod.rs
pub mod jwt;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// The current user, taken from a bearer token.
#[derive(Debug)]
pub struct AuthUser {
    pub id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = match &state.config.jwt_secret {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET is not set, rejecting authenticated request");
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = jwt::validate_token(token, secret.expose_secret()).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser { id: claims.sub })
    }
}
