use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::capabilities::View;
use crate::dtos::{
        parse_id, select_fields, InvitationIndexQuery, InvitationRequestDto, InvitationViewDto, ListResponseDto,
};
use crate::errors::problem::Problem;
use crate::merge::merge_invitation;
use crate::middleware::authorization::AuthUser;
use crate::models::{Expansion, Invitation, InvitationWithRelationships, Message};
use crate::AppState;

pub async fn create_invitation(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Json(body): Json<InvitationRequestDto>,
) -> Result<(StatusCode, Json<InvitationViewDto>), Problem> {
        let references = body.references()?;
        let now = Utc::now().naive_utc();

        let invitation = state.invitation_repository.save(Invitation {
                id: state.id_generator.generate()?,
                created_at: now,
                updated_at: now,
                user_id: auth_user.id,
                guest_user_id: references.guest_user_id,
                team_id: references.team_id,
                guest_team_id: references.guest_team_id,
                host_team_id: references.host_team_id,
                visiting_team_id: references.visiting_team_id,
                match_id: references.match_id,
                status: body.status.unwrap_or_default(),
                scheduled_at: body.scheduled_at,
                responded_at: None,
        })?;
        info!("user {} invited user {} ({})", invitation.user_id, invitation.guest_user_id, invitation.id);

        if let Some(text) = body.message_text() {
                let message = state
                        .message_repository
                        .save(Message {
                                id: state.id_generator.generate()?,
                                created_at: now,
                                updated_at: now,
                                sender_id: invitation.user_id,
                                receiver_id: invitation.guest_user_id,
                                author_id: invitation.user_id,
                                text: text.to_string(),
                                chat_id: None,
                        })
                        .map_err(|problem| {
                                error!("invitation {} was saved but its message was not: {}", invitation.id, problem);
                                problem
                        })?;

                state.chat_service.request_chat_id(message.id);
        }

        Ok((
                StatusCode::CREATED,
                Json(InvitationWithRelationships::from(invitation).view(true)),
        ))
}

pub async fn get_invitations(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Query(query): Query<InvitationIndexQuery>,
) -> Result<Json<ListResponseDto<Value>>, Problem> {
        let filter = query.filter()?;
        let cursor = query.cursor()?;
        let selection = query.selection();

        let count = state.invitation_repository.count_by_party(auth_user.id, &filter)?;
        let invitations = state.invitation_repository.find_by_party(auth_user.id, &filter, &cursor)?;

        let rows = invitations
                .iter()
                .map(|invitation| {
                        serde_json::to_value(invitation.view(false))
                                .map(|view| select_fields(view, selection.as_deref()))
                                .map_err(|_| Problem::InternalServerError("failed to serialize invitation".to_string()))
                })
                .collect::<Result<Vec<Value>, Problem>>()?;

        Ok(Json(ListResponseDto { count, rows }))
}

pub async fn get_invitation(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Path(invitation_id): Path<String>,
) -> Result<Json<InvitationViewDto>, Problem> {
        let invitation_id = parse_id("invitation_id", &invitation_id)?;

        let invitation = state
                .invitation_repository
                .find_by_id_and_party(invitation_id, auth_user.id, Expansion::Deep)?
                .ok_or(Problem::NotFound("Invitation not found".to_string()))?;

        Ok(Json(invitation.view(false)))
}

pub async fn update_invitation(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Path(invitation_id): Path<String>,
        Json(body): Json<Value>,
) -> Result<Json<InvitationViewDto>, Problem> {
        let invitation_id = parse_id("invitation_id", &invitation_id)?;

        let invitation = state
                .invitation_repository
                .find_plain_by_id_and_party(invitation_id, auth_user.id)?
                .ok_or(Problem::NotFound("Invitation not found".to_string()))?;

        let invitation = state.invitation_repository.save(merge_invitation(invitation, &body)?)?;

        Ok(Json(InvitationWithRelationships::from(invitation).view(true)))
}

pub async fn delete_invitation(
        State(state): State<Arc<AppState>>,
        AuthUser(auth_user): AuthUser,
        Path(invitation_id): Path<String>,
) -> Result<StatusCode, Problem> {
        let invitation_id = parse_id("invitation_id", &invitation_id)?;

        let invitation = state
                .invitation_repository
                .find_by_id_and_user_id(invitation_id, auth_user.id)?
                .ok_or(Problem::NotFound("Invitation not found".to_string()))?;

        state.invitation_repository.delete(invitation.id)?;
        info!("user {} deleted invitation {}", auth_user.id, invitation.id);

        Ok(StatusCode::NO_CONTENT)
}
