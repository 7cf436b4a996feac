use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::View;
use crate::errors::problem::Problem;
use crate::models::{
        Activity, Contract, Gender, InvitationStatus, InvitationWithRelationships, MatchSummary, Populated, Role,
        Setting, TeamSummary, User, UserSummary,
};
use crate::repositories::{Cursor, InvitationFilter, InvitationSort, Page};
use crate::services::user_service::{NewUser, UserChanges};

const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 30;

pub(crate) fn parse_id(name: &str, value: &str) -> Result<i64, Problem> {
        value.trim().parse::<i64>().map_err(|_| Problem::BadRequest(format!("Invalid {}", name)))
}

pub(crate) fn parse_optional_id(name: &str, value: Option<&String>) -> Result<Option<i64>, Problem> {
        value.map(|value| parse_id(name, value)).transpose()
}

/// Validates `page`/`limit`, falling back to page 1 and [`DEFAULT_LIMIT`].
///
/// Pages whose offset would not fit an `i64` are rejected.
pub(crate) fn paginate(page: Option<i64>, limit: Option<i64>) -> Result<(i64, i64), Problem> {
        let page = page.unwrap_or(1);
        if page < 1 {
                return Err(Problem::BadRequest("page must be at least 1".to_string()));
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(Problem::BadRequest(format!("limit must be between 1 and {}", MAX_LIMIT)));
        }

        if (page - 1).checked_mul(limit).is_none() {
                return Err(Problem::BadRequest("page is out of range".to_string()));
        }

        Ok((page, limit))
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserViewDto {
        pub user_id: i64,
        pub display_name: String,
        pub picture: Option<String>,
        pub gender: Gender,
        #[serde(flatten)]
        pub full: Option<UserFullViewDto>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserFullViewDto {
        pub id: String,
        pub email: String,
        pub role: Role,
        pub registration_ids: Vec<String>,
        pub current_contract: Contract,
        pub activities: Value,
        pub settings: Value,
        pub created_at: chrono::NaiveDateTime,
}

impl View for User {
        type Output = UserViewDto;

        fn view(&self, full: bool) -> UserViewDto {
                UserViewDto {
                        user_id: self.user_id,
                        display_name: self.display_name.clone(),
                        picture: self.picture.clone(),
                        gender: self.gender,
                        full: full.then(|| UserFullViewDto {
                                id: self.id.to_string(),
                                email: self.email.clone(),
                                role: self.role,
                                registration_ids: self.registration_ids.clone(),
                                current_contract: self.current_contract,
                                activities: self.activities.clone(),
                                settings: self.settings.clone(),
                                created_at: self.created_at,
                        }),
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PopulatedDto<T> {
        Id(String),
        Document(T),
}

impl<S, T: From<S>> From<Populated<S>> for PopulatedDto<T> {
        fn from(populated: Populated<S>) -> Self {
                match populated {
                        Populated::Id(id) => PopulatedDto::Id(id.to_string()),
                        Populated::Document(document) => PopulatedDto::Document(T::from(document)),
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserSummaryDto {
        pub id: String,
        pub display_name: String,
        pub picture: Option<String>,
}

impl From<UserSummary> for UserSummaryDto {
        fn from(user: UserSummary) -> Self {
                UserSummaryDto {
                        id: user.id.to_string(),
                        display_name: user.display_name,
                        picture: user.picture,
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TeamSummaryDto {
        pub id: String,
        pub display_name: String,
        pub pictures: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub address: Option<String>,
}

impl From<TeamSummary> for TeamSummaryDto {
        fn from(team: TeamSummary) -> Self {
                TeamSummaryDto {
                        id: team.id.to_string(),
                        display_name: team.display_name,
                        pictures: team.pictures,
                        address: team.address,
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MatchSummaryDto {
        pub id: String,
        pub home_team: String,
        pub visiting_team: String,
}

impl From<MatchSummary> for MatchSummaryDto {
        fn from(r#match: MatchSummary) -> Self {
                MatchSummaryDto {
                        id: r#match.id.to_string(),
                        home_team: r#match.home_team_id.to_string(),
                        visiting_team: r#match.visiting_team_id.to_string(),
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvitationViewDto {
        pub id: String,
        pub user: Option<PopulatedDto<UserSummaryDto>>,
        pub guest_user: Option<PopulatedDto<UserSummaryDto>>,
        pub team: Option<PopulatedDto<TeamSummaryDto>>,
        pub guest_team: Option<PopulatedDto<TeamSummaryDto>>,
        pub host_team: Option<PopulatedDto<TeamSummaryDto>>,
        pub visiting_team: Option<PopulatedDto<TeamSummaryDto>>,
        #[serde(rename = "match")]
        pub r#match: Option<PopulatedDto<MatchSummaryDto>>,
        pub status: InvitationStatus,
        pub scheduled_at: Option<chrono::NaiveDateTime>,
        pub created_at: chrono::NaiveDateTime,
        #[serde(flatten)]
        pub full: Option<InvitationFullViewDto>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvitationFullViewDto {
        pub updated_at: chrono::NaiveDateTime,
        pub responded_at: Option<chrono::NaiveDateTime>,
}

impl View for InvitationWithRelationships {
        type Output = InvitationViewDto;

        fn view(&self, full: bool) -> InvitationViewDto {
                let invitation = &self.invitation;
                InvitationViewDto {
                        id: invitation.id.to_string(),
                        user: self.user.clone().map(PopulatedDto::from),
                        guest_user: self.guest_user.clone().map(PopulatedDto::from),
                        team: self.team.clone().map(PopulatedDto::from),
                        guest_team: self.guest_team.clone().map(PopulatedDto::from),
                        host_team: self.host_team.clone().map(PopulatedDto::from),
                        visiting_team: self.visiting_team.clone().map(PopulatedDto::from),
                        r#match: self.r#match.clone().map(PopulatedDto::from),
                        status: invitation.status,
                        scheduled_at: invitation.scheduled_at,
                        created_at: invitation.created_at,
                        full: full.then(|| InvitationFullViewDto {
                                updated_at: invitation.updated_at,
                                responded_at: invitation.responded_at,
                        }),
                }
        }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ListResponseDto<T> {
        pub count: i64,
        pub rows: Vec<T>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthResponseDto {
        pub token: String,
        pub user: UserViewDto,
}

#[derive(Deserialize, Debug, Clone)]
pub struct InvitationRequestDto {
        pub guest_user: String,
        pub team: Option<String>,
        pub guest_team: Option<String>,
        pub host_team: Option<String>,
        pub visiting_team: Option<String>,
        #[serde(rename = "match")]
        pub r#match: Option<String>,
        pub status: Option<InvitationStatus>,
        pub scheduled_at: Option<chrono::NaiveDateTime>,
        /// Opening message for the guest. Only a JSON string starts a conversation.
        pub message: Option<Value>,
}

impl InvitationRequestDto {
        pub fn message_text(&self) -> Option<&str> {
                match &self.message {
                        Some(Value::String(text)) => Some(text.as_str()),
                        _ => None,
                }
        }

        pub fn references(&self) -> Result<InvitationReferences, Problem> {
                Ok(InvitationReferences {
                        guest_user_id: parse_id("guest_user", &self.guest_user)?,
                        team_id: parse_optional_id("team", self.team.as_ref())?,
                        guest_team_id: parse_optional_id("guest_team", self.guest_team.as_ref())?,
                        host_team_id: parse_optional_id("host_team", self.host_team.as_ref())?,
                        visiting_team_id: parse_optional_id("visiting_team", self.visiting_team.as_ref())?,
                        match_id: parse_optional_id("match", self.r#match.as_ref())?,
                })
        }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvitationReferences {
        pub guest_user_id: i64,
        pub team_id: Option<i64>,
        pub guest_team_id: Option<i64>,
        pub host_team_id: Option<i64>,
        pub visiting_team_id: Option<i64>,
        pub match_id: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct InvitationIndexQuery {
        pub page: Option<i64>,
        pub limit: Option<i64>,
        pub sort: Option<String>,
        pub fields: Option<String>,
        pub status: Option<InvitationStatus>,
        pub team: Option<String>,
        #[serde(rename = "match")]
        pub r#match: Option<String>,
        pub guest_user: Option<String>,
}

impl InvitationIndexQuery {
        pub fn filter(&self) -> Result<InvitationFilter, Problem> {
                Ok(InvitationFilter {
                        status: self.status,
                        team_id: parse_optional_id("team", self.team.as_ref())?,
                        match_id: parse_optional_id("match", self.r#match.as_ref())?,
                        guest_user_id: parse_optional_id("guest_user", self.guest_user.as_ref())?,
                })
        }

        pub fn cursor(&self) -> Result<Cursor, Problem> {
                let default = Cursor::default();
                let (page, limit) = paginate(self.page, self.limit)?;

                let sort = match self.sort.as_deref().map(str::trim) {
                        None | Some("") => default.sort,
                        Some("created_at") => InvitationSort::CreatedAtAsc,
                        Some("-created_at") => InvitationSort::CreatedAtDesc,
                        Some("scheduled_at") => InvitationSort::ScheduledAtAsc,
                        Some("-scheduled_at") => InvitationSort::ScheduledAtDesc,
                        Some(other) => return Err(Problem::BadRequest(format!("cannot sort by {}", other))),
                };

                Ok(Cursor { page, limit, sort })
        }

        /// Requested view keys, `None` when every key is wanted.
        pub fn selection(&self) -> Option<Vec<String>> {
                self.fields.as_ref().map(|fields| {
                        fields.split(',')
                                .map(|field| field.trim().to_string())
                                .filter(|field| !field.is_empty())
                                .collect()
                })
        }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserSearchQuery {
        pub q: Option<String>,
        pub page: Option<i64>,
        pub limit: Option<i64>,
}

impl UserSearchQuery {
        /// Whitespace separated terms, lowercased. Empty when every user matches.
        pub fn keywords(&self) -> Vec<String> {
                self.q.as_deref()
                        .unwrap_or_default()
                        .split_whitespace()
                        .map(str::to_lowercase)
                        .collect()
        }

        pub fn page(&self) -> Result<Page, Problem> {
                let (page, limit) = paginate(self.page, self.limit)?;
                Ok(Page { page, limit })
        }
}

/// Keeps only the selected keys of a serialized view. `id` always survives.
pub fn select_fields(value: Value, selection: Option<&[String]>) -> Value {
        match (value, selection) {
                (Value::Object(map), Some(selection)) if !selection.is_empty() => Value::Object(
                        map.into_iter()
                                .filter(|(key, _)| key == "id" || selection.iter().any(|field| field == key))
                                .collect(),
                ),
                (value, _) => value,
        }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserRequestDto {
        pub email: String,
        pub password: String,
        pub display_name: Option<String>,
        pub picture: Option<String>,
        pub gender: Option<Gender>,
        pub role: Option<Role>,
        pub current_contract: Option<Contract>,
        pub sponsor: Option<String>,
}

impl TryFrom<UserRequestDto> for NewUser {
        type Error = Problem;

        fn try_from(request: UserRequestDto) -> Result<Self, Self::Error> {
                Ok(NewUser {
                        sponsor_id: parse_optional_id("sponsor", request.sponsor.as_ref())?,
                        email: request.email,
                        password: request.password,
                        display_name: request.display_name,
                        picture: request.picture,
                        gender: request.gender,
                        role: request.role,
                        current_contract: request.current_contract,
                        provider: None,
                })
        }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserUpdateDto {
        pub email: Option<String>,
        pub display_name: Option<String>,
        pub picture: Option<String>,
        pub gender: Option<Gender>,
        pub registration_ids: Option<Vec<String>>,
        pub activities: Option<Vec<Activity>>,
        pub settings: Option<Vec<Setting>>,
}

impl From<UserUpdateDto> for UserChanges {
        fn from(request: UserUpdateDto) -> Self {
                UserChanges {
                        email: request.email,
                        display_name: request.display_name,
                        picture: request.picture,
                        gender: request.gender,
                        registration_ids: request.registration_ids,
                        activities: request.activities,
                        settings: request.settings,
                }
        }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PasswordUpdateDto {
        pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderLoginRequestDto {
        pub access_token: String,
}
