use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

use crate::authorization::sign_token;
use crate::capabilities::{Authenticate, ProviderReconciler, View};
use crate::dtos::{AuthResponseDto, ProviderLoginRequestDto};
use crate::errors::problem::Problem;
use crate::middleware::authorization::BasicCredentials;
use crate::models::{Provider, User};
use crate::AppState;

fn issue(state: &AppState, user: &User) -> Result<(StatusCode, Json<AuthResponseDto>), Problem> {
        let token = sign_token(user.id, &state.config.jwt_secret, state.config.jwt_expiration)?;

        Ok((
                StatusCode::CREATED,
                Json(AuthResponseDto {
                        token,
                        user: user.view(true),
                }),
        ))
}

pub async fn login(
        State(state): State<Arc<AppState>>,
        credentials: BasicCredentials,
) -> Result<(StatusCode, Json<AuthResponseDto>), Problem> {
        let email = credentials.email.trim().to_lowercase();

        let user = state
                .user_repository
                .find_by_email(&email)?
                .ok_or(Problem::Unauthorized("Invalid email or password".to_string()))?;

        let user = user.authenticate(&credentials.password)?.ok_or_else(|| {
                warn!("failed login attempt for user {}", user.id);
                Problem::Unauthorized("Invalid email or password".to_string())
        })?;
        info!("user {} logged in", user.id);

        issue(&state, user)
}

pub async fn provider_login(
        State(state): State<Arc<AppState>>,
        Path(provider): Path<String>,
        Json(body): Json<ProviderLoginRequestDto>,
) -> Result<(StatusCode, Json<AuthResponseDto>), Problem> {
        let provider = provider
                .parse::<Provider>()
                .map_err(|_| Problem::NotFound(format!("Unknown provider {}", provider)))?;

        let identity = state.provider_service.fetch_identity(provider, &body.access_token).await?;
        let user = state.user_service.find_or_create_from_provider(identity)?;
        info!("user {} logged in with {}", user.id, provider);

        issue(&state, &user)
}
