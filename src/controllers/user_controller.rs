use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::capabilities::View;
use crate::dtos::{
        parse_id, ListResponseDto, PasswordUpdateDto, UserRequestDto, UserSearchQuery, UserUpdateDto, UserViewDto,
};
use crate::errors::problem::Problem;
use crate::middleware::authorization::AuthUser;
use crate::services::user_service::NewUser;
use crate::AppState;

pub async fn create_user(
        State(state): State<Arc<AppState>>,
        Json(body): Json<UserRequestDto>,
) -> Result<(StatusCode, Json<UserViewDto>), Problem> {
        let user = state.user_service.create(NewUser::try_from(body)?)?;
        info!("created user {} ({})", user.id, user.user_id);

        Ok((StatusCode::CREATED, Json(user.view(true))))
}

pub async fn get_me(AuthUser(auth_user): AuthUser) -> Json<UserViewDto> {
        Json(auth_user.view(true))
}

pub async fn update_me(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Json(body): Json<UserUpdateDto>,
) -> Result<Json<UserViewDto>, Problem> {
        let user = state.user_service.update(auth_user, body.into())?;

        Ok(Json(user.view(true)))
}

pub async fn update_password(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Json(body): Json<PasswordUpdateDto>,
) -> Result<Json<UserViewDto>, Problem> {
        let user = state.user_service.update_password(auth_user, body.password)?;
        info!("user {} changed their password", user.id);

        Ok(Json(user.view(true)))
}

pub async fn search_users(
        State(state): State<Arc<AppState>>,
        _: AuthUser,
        Query(query): Query<UserSearchQuery>,
) -> Result<Json<ListResponseDto<UserViewDto>>, Problem> {
        let keywords = query.keywords();
        let page = query.page()?;

        let count = state.user_repository.count_search(&keywords)?;
        let rows = state
                .user_repository
                .search(&keywords, &page)?
                .iter()
                .map(|user| user.view(false))
                .collect();

        Ok(Json(ListResponseDto { count, rows }))
}

pub async fn get_user(
        State(state): State<Arc<AppState>>,
        _: AuthUser,
        Path(user_id): Path<String>,
) -> Result<Json<UserViewDto>, Problem> {
        let user_id = parse_id("user_id", &user_id)?;

        let user = state
                .user_repository
                .find_by_id(user_id)?
                .ok_or(Problem::NotFound("User not found".to_string()))?;

        Ok(Json(user.view(false)))
}

pub async fn follow_user(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Path(user_id): Path<String>,
) -> Result<StatusCode, Problem> {
        let user_id = parse_id("user_id", &user_id)?;
        if user_id == auth_user.id {
                return Err(Problem::BadRequest("Users cannot follow themselves".to_string()));
        }

        let user = state
                .user_repository
                .find_by_id(user_id)?
                .ok_or(Problem::NotFound("User not found".to_string()))?;

        state.user_repository.follow(auth_user.id, user.id)?;

        Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_user(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Path(user_id): Path<String>,
) -> Result<StatusCode, Problem> {
        let user_id = parse_id("user_id", &user_id)?;

        state.user_repository.unfollow(auth_user.id, user_id)?;

        Ok(StatusCode::NO_CONTENT)
}
