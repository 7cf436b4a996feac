use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::error;

use crate::authorization::get_cached_token_data;
use crate::errors::problem::Problem;
use crate::models::User;
use crate::AppState;

/// The caller identified by the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// `email:password` pair from a basic authorization header.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
        pub email: String,
        pub password: String,
}

fn authorization_header<'a>(parts: &'a Parts) -> Result<&'a str, Problem> {
        parts.headers
                .get(AUTHORIZATION)
                .ok_or(Problem::Unauthorized("Missing authorization header".to_string()))?
                .to_str()
                .map_err(|_| Problem::Unauthorized("Invalid authorization header".to_string()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
        type Rejection = Problem;

        async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
                let token = authorization_header(parts)?
                        .strip_prefix("Bearer ")
                        .ok_or(Problem::Unauthorized("Invalid bearer token".to_string()))?;

                let token_data = get_cached_token_data(token, &state.config.jwt_secret).await.map_err(|err| {
                        error!("invalid token: {}", err);
                        Problem::Unauthorized("invalid token".to_string())
                })?;

                let user_id = token_data
                        .claims
                        .sub
                        .parse::<i64>()
                        .map_err(|_| Problem::Unauthorized("invalid claims".to_string()))?;

                let user = state.user_repository.find_by_id(user_id)?.ok_or_else(|| {
                        error!("token subject {} has no user", user_id);
                        Problem::Unauthorized("invalid token".to_string())
                })?;

                Ok(AuthUser(user))
        }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BasicCredentials {
        type Rejection = Problem;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
                let encoded = authorization_header(parts)?
                        .strip_prefix("Basic ")
                        .ok_or(Problem::Unauthorized("Invalid basic credentials".to_string()))?;

                let decoded = STANDARD
                        .decode(encoded.trim())
                        .ok()
                        .and_then(|bytes| String::from_utf8(bytes).ok())
                        .ok_or(Problem::Unauthorized("Invalid basic credentials".to_string()))?;

                let (email, password) = decoded
                        .split_once(':')
                        .ok_or(Problem::Unauthorized("Invalid basic credentials".to_string()))?;

                Ok(BasicCredentials {
                        email: email.to_string(),
                        password: password.to_string(),
                })
        }
}
