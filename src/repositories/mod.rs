use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::PgConnection;
use tracing::error;

use crate::errors::problem::Problem;
use crate::models::{
        Expansion, Invitation, InvitationStatus, InvitationWithRelationships, Message, Provider, User,
};

pub mod invitation_repository;
pub mod message_repository;
pub mod user_repository;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub(crate) fn connection(pool: &DbPool) -> Result<PooledConnection<ConnectionManager<PgConnection>>, Problem> {
        pool.get().map_err(|err| {
                error!("failed to pool connection: {}", err);
                Problem::InternalServerError("failed to pool connection".to_string())
        })
}

pub(crate) fn map_db_error(err: DieselError) -> Problem {
        match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                        Problem::Conflict(info.details().unwrap_or(info.message()).to_string())
                }
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                        Problem::BadRequest(info.details().unwrap_or(info.message()).to_string())
                }
                err => {
                        error!("failed to query database: {}", err);
                        Problem::InternalServerError("failed to query database".to_string())
                }
        }
}

pub trait UserRepository: Send + Sync {
        fn find_by_id(&self, id: i64) -> Result<Option<User>, Problem>;

        fn find_by_email(&self, email: &str) -> Result<Option<User>, Problem>;

        fn find_by_provider_or_email(
                &self,
                provider: Provider,
                provider_id: &str,
                email: &str,
        ) -> Result<Option<User>, Problem>;

        /// Draws the next public `user_id` from the sequence.
        fn next_user_id(&self) -> Result<i64, Problem>;

        fn save(&self, user: User) -> Result<User, Problem>;

        /// Counts users whose email or display name contains every keyword.
        fn count_search(&self, keywords: &[String]) -> Result<i64, Problem>;

        fn search(&self, keywords: &[String], page: &Page) -> Result<Vec<User>, Problem>;

        fn follow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem>;

        fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem>;
}

/// Caller supplied narrowing applied on top of the party restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvitationFilter {
        pub status: Option<InvitationStatus>,
        pub team_id: Option<i64>,
        pub match_id: Option<i64>,
        pub guest_user_id: Option<i64>,
}

impl InvitationFilter {
        pub fn matches(&self, invitation: &Invitation) -> bool {
                self.status.map_or(true, |status| invitation.status == status)
                        && self.team_id.map_or(true, |team_id| invitation.team_id == Some(team_id))
                        && self.match_id.map_or(true, |match_id| invitation.match_id == Some(match_id))
                        && self.guest_user_id
                                .map_or(true, |guest_user_id| invitation.guest_user_id == guest_user_id)
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationSort {
        CreatedAtAsc,
        CreatedAtDesc,
        ScheduledAtAsc,
        ScheduledAtDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
        pub page: i64,
        pub limit: i64,
        pub sort: InvitationSort,
}

impl Cursor {
        pub fn offset(&self) -> i64 {
                (self.page - 1) * self.limit
        }
}

impl Default for Cursor {
        fn default() -> Self {
                Cursor {
                        page: 1,
                        limit: 30,
                        sort: InvitationSort::CreatedAtDesc,
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
        pub page: i64,
        pub limit: i64,
}

impl Page {
        pub fn offset(&self) -> i64 {
                (self.page - 1) * self.limit
        }
}

pub trait InvitationRepository: Send + Sync {
        /// Counts invitations where `user_id` is the inviter or the guest.
        fn count_by_party(&self, user_id: i64, filter: &InvitationFilter) -> Result<i64, Problem>;

        fn find_by_party(
                &self,
                user_id: i64,
                filter: &InvitationFilter,
                cursor: &Cursor,
        ) -> Result<Vec<InvitationWithRelationships>, Problem>;

        fn find_by_id_and_party(
                &self,
                invitation_id: i64,
                user_id: i64,
                expansion: Expansion,
        ) -> Result<Option<InvitationWithRelationships>, Problem>;

        fn find_plain_by_id_and_party(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem>;

        fn find_by_id_and_user_id(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem>;

        fn save(&self, invitation: Invitation) -> Result<Invitation, Problem>;

        fn delete(&self, invitation_id: i64) -> Result<(), Problem>;
}

pub trait MessageRepository: Send + Sync {
        fn save(&self, message: Message) -> Result<Message, Problem>;

        /// Bumps the conversation counter and stamps the result on the message.
        fn assign_next_chat_id(&self, message_id: i64) -> Result<i64, Problem>;

        fn find_without_chat_id(&self, limit: i64) -> Result<Vec<Message>, Problem>;
}
