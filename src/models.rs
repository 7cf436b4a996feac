use std::fmt::{Display, Formatter};
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use lazy_static::lazy_static;
use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema;

const GRAVATAR_URL: &str = "https://gravatar.com";

lazy_static! {
        static ref EMAIL_PATTERN: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
        static ref EMAIL_LOCAL_PART: Regex = Regex::new(r"^(.+)@.+$").unwrap();
}

/// Declares a string-backed enum stored in a `Text` column.
macro_rules! text_enum {
        ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
                $(#[$meta])*
                #[derive(AsExpression, FromSqlRow, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
                #[diesel(sql_type = Text)]
                #[serde(try_from = "String")]
                pub enum $name {
                        $(#[serde(rename = $value)] $variant),+
                }

                impl $name {
                        pub fn as_str(&self) -> &'static str {
                                match self {
                                        $($name::$variant => $value),+
                                }
                        }
                }

                impl Display for $name {
                        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                                f.write_str(self.as_str())
                        }
                }

                impl FromStr for $name {
                        type Err = String;

                        fn from_str(value: &str) -> Result<Self, Self::Err> {
                                match value.trim().to_lowercase().as_str() {
                                        $($value => Ok($name::$variant),)+
                                        other => Err(format!("`{}` is not a valid {}", other, stringify!($name))),
                                }
                        }
                }

                impl TryFrom<String> for $name {
                        type Error = String;

                        fn try_from(value: String) -> Result<Self, Self::Error> {
                                value.parse()
                        }
                }

                impl ToSql<Text, Pg> for $name {
                        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                                out.write_all(self.as_str().as_bytes())?;
                                Ok(IsNull::No)
                        }
                }

                impl FromSql<Text, Pg> for $name {
                        fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                                let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                                value.parse::<$name>().map_err(Into::into)
                        }
                }
        };
}

text_enum!(Role {
        Athleta => "athleta",
        Manager => "manager",
});

text_enum!(Contract {
        Basic => "basic",
        Premium => "premium",
});

text_enum!(Gender {
        Male => "male",
        Female => "female",
        Undefined => "undefined",
});

text_enum!(
        /// External identity providers a user can sign in with.
        Provider {
                Facebook => "facebook",
                Google => "google",
        }
);

text_enum!(InvitationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
        Canceled => "canceled",
});

impl Default for Role {
        fn default() -> Self {
                Role::Athleta
        }
}

impl Default for Contract {
        fn default() -> Self {
                Contract::Basic
        }
}

impl Default for Gender {
        fn default() -> Self {
                Gender::Undefined
        }
}

impl Default for InvitationStatus {
        fn default() -> Self {
                InvitationStatus::Pending
        }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Activity {
        pub activity: String,
        pub points: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Setting {
        pub setting: String,
        pub value: serde_json::Value,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct User {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub user_id: i64,
        pub sponsor_id: Option<i64>,
        pub email: String,
        pub display_name: String,
        pub current_contract: Contract,
        pub gender: Gender,
        pub registration_ids: Vec<String>,
        pub password: String,
        pub role: Role,
        pub picture: Option<String>,
        pub facebook_id: Option<String>,
        pub google_id: Option<String>,
        pub activities: serde_json::Value,
        pub settings: serde_json::Value,
}

impl User {
        /// Writes `email` and re-derives the gravatar picture and display name.
        ///
        /// The picture is only replaced while it is unset or still gravatar-sourced, and the
        /// display name only while it is empty.
        pub fn assign_email(&mut self, email: &str) {
                let email = email.trim().to_lowercase();

                let gravatar_sourced = self
                        .picture
                        .as_deref()
                        .map_or(true, |picture| picture.is_empty() || picture.starts_with(GRAVATAR_URL));
                if gravatar_sourced {
                        self.picture = Some(gravatar_url(&email));
                }

                if self.display_name.trim().is_empty() {
                        self.display_name = EMAIL_LOCAL_PART.replace(&email, "$1").into_owned();
                }

                self.email = email;
        }

        pub fn provider_id(&self, provider: Provider) -> Option<&str> {
                match provider {
                        Provider::Facebook => self.facebook_id.as_deref(),
                        Provider::Google => self.google_id.as_deref(),
                }
        }

        pub fn set_provider_id(&mut self, provider: Provider, id: String) {
                match provider {
                        Provider::Facebook => self.facebook_id = Some(id),
                        Provider::Google => self.google_id = Some(id),
                }
        }

        pub fn summary(&self) -> UserSummary {
                UserSummary {
                        id: self.id,
                        display_name: self.display_name.clone(),
                        picture: self.picture.clone(),
                }
        }
}

pub fn gravatar_url(email: &str) -> String {
        let hash = Md5::digest(email.as_bytes());
        format!("{}/avatar/{:x}?d=identicon", GRAVATAR_URL, hash)
}

pub fn is_valid_email(email: &str) -> bool {
        EMAIL_PATTERN.is_match(email)
}

/// An identity asserted by an external login provider.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
        pub provider: Provider,
        pub id: String,
        pub email: String,
        pub name: Option<String>,
        pub picture: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::user_follows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserFollow {
        pub follower_id: i64,
        pub following_id: i64,
        pub created_at: chrono::NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Team {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub display_name: String,
        pub pictures: Vec<String>,
        pub address: Option<String>,
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::matches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Match {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub home_team_id: i64,
        pub visiting_team_id: i64,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct Invitation {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub user_id: i64,
        pub guest_user_id: i64,
        pub team_id: Option<i64>,
        pub guest_team_id: Option<i64>,
        pub host_team_id: Option<i64>,
        pub visiting_team_id: Option<i64>,
        pub match_id: Option<i64>,
        pub status: InvitationStatus,
        pub scheduled_at: Option<chrono::NaiveDateTime>,
        pub responded_at: Option<chrono::NaiveDateTime>,
}

impl Invitation {
        pub fn is_party(&self, user_id: i64) -> bool {
                self.user_id == user_id || self.guest_user_id == user_id
        }
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Message {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub sender_id: i64,
        pub receiver_id: i64,
        pub author_id: i64,
        pub text: String,
        pub chat_id: Option<i64>,
}

impl Message {
        /// The unordered participant pair a chat id sequence is scoped to.
        pub fn conversation(&self) -> (i64, i64) {
                if self.sender_id <= self.receiver_id {
                        (self.sender_id, self.receiver_id)
                } else {
                        (self.receiver_id, self.sender_id)
                }
        }
}

/// A reference that is either left as an id or expanded into the related record.
#[derive(Debug, Clone, PartialEq)]
pub enum Populated<T> {
        Id(i64),
        Document(T),
}

/// How far related records are expanded when invitations are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
        Shallow,
        Deep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
        pub id: i64,
        pub display_name: String,
        pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamSummary {
        pub id: i64,
        pub display_name: String,
        pub pictures: Vec<String>,
        pub address: Option<String>,
}

impl TeamSummary {
        pub fn from_team(team: &Team, expansion: Expansion) -> Self {
                TeamSummary {
                        id: team.id,
                        display_name: team.display_name.clone(),
                        pictures: team.pictures.clone(),
                        address: match expansion {
                                Expansion::Deep => team.address.clone(),
                                Expansion::Shallow => None,
                        },
                }
        }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
        pub id: i64,
        pub home_team_id: i64,
        pub visiting_team_id: i64,
}

impl From<&Match> for MatchSummary {
        fn from(r#match: &Match) -> Self {
                MatchSummary {
                        id: r#match.id,
                        home_team_id: r#match.home_team_id,
                        visiting_team_id: r#match.visiting_team_id,
                }
        }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvitationWithRelationships {
        pub invitation: Invitation,
        pub user: Option<Populated<UserSummary>>,
        pub guest_user: Option<Populated<UserSummary>>,
        pub team: Option<Populated<TeamSummary>>,
        pub guest_team: Option<Populated<TeamSummary>>,
        pub host_team: Option<Populated<TeamSummary>>,
        pub visiting_team: Option<Populated<TeamSummary>>,
        pub r#match: Option<Populated<MatchSummary>>,
}

impl From<Invitation> for InvitationWithRelationships {
        fn from(invitation: Invitation) -> Self {
                InvitationWithRelationships {
                        user: Some(Populated::Id(invitation.user_id)),
                        guest_user: Some(Populated::Id(invitation.guest_user_id)),
                        team: invitation.team_id.map(Populated::Id),
                        guest_team: invitation.guest_team_id.map(Populated::Id),
                        host_team: invitation.host_team_id.map(Populated::Id),
                        visiting_team: invitation.visiting_team_id.map(Populated::Id),
                        r#match: invitation.match_id.map(Populated::Id),
                        invitation,
                }
        }
}

#[cfg(test)]
mod tests {
        use super::*;

        fn blank_user() -> User {
                let now = chrono::Utc::now().naive_utc();
                User {
                        id: 1,
                        created_at: now,
                        updated_at: now,
                        user_id: 1,
                        sponsor_id: None,
                        email: String::new(),
                        display_name: String::new(),
                        current_contract: Contract::default(),
                        gender: Gender::default(),
                        registration_ids: vec![],
                        password: String::new(),
                        role: Role::default(),
                        picture: None,
                        facebook_id: None,
                        google_id: None,
                        activities: serde_json::json!([]),
                        settings: serde_json::json!([]),
                }
        }

        #[test]
        fn gravatar_is_keyed_by_md5_of_email() {
                assert_eq!(
                        gravatar_url("john@doe.com"),
                        "https://gravatar.com/avatar/6a6c19fea4a3676970167ce51f39e6ee?d=identicon"
                );
        }

        #[test]
        fn assign_email_derives_picture_and_display_name() {
                let mut user = blank_user();
                user.assign_email("  John.Doe@Example.com ");

                assert_eq!(user.email, "john.doe@example.com");
                assert_eq!(user.display_name, "john.doe");
                assert_eq!(user.picture, Some(gravatar_url("john.doe@example.com")));
        }

        #[test]
        fn assign_email_is_idempotent_on_picture() {
                let mut user = blank_user();
                user.assign_email("a@b.co");
                let first = user.picture.clone();
                user.assign_email("a@b.co");

                assert_eq!(user.picture, first);
        }

        #[test]
        fn assign_email_keeps_custom_picture_and_display_name() {
                let mut user = blank_user();
                user.display_name = "Keeper".to_string();
                user.picture = Some("https://cdn.example.com/me.png".to_string());
                user.assign_email("new@mail.com");

                assert_eq!(user.display_name, "Keeper");
                assert_eq!(user.picture.as_deref(), Some("https://cdn.example.com/me.png"));
        }

        #[test]
        fn assign_email_refreshes_gravatar_picture() {
                let mut user = blank_user();
                user.assign_email("old@mail.com");
                user.assign_email("new@mail.com");

                assert_eq!(user.picture, Some(gravatar_url("new@mail.com")));
        }

        #[test]
        fn validates_email_shape() {
                assert!(is_valid_email("player@club.com"));
                assert!(!is_valid_email("player@club"));
                assert!(!is_valid_email("pla yer@club.com"));
        }

        #[test]
        fn text_enums_parse_case_insensitively() {
                assert_eq!("PREMIUM".parse::<Contract>().unwrap(), Contract::Premium);
                assert_eq!(serde_json::from_str::<Role>("\"Manager\"").unwrap(), Role::Manager);
                assert!(serde_json::from_str::<Gender>("\"other\"").is_err());
                assert_eq!(serde_json::to_string(&InvitationStatus::Accepted).unwrap(), "\"accepted\"");
        }

        #[test]
        fn conversation_is_unordered() {
                let now = chrono::Utc::now().naive_utc();
                let message = Message {
                        id: 1,
                        created_at: now,
                        updated_at: now,
                        sender_id: 9,
                        receiver_id: 3,
                        author_id: 9,
                        text: "hi".to_string(),
                        chat_id: None,
                };

                assert_eq!(message.conversation(), (3, 9));
        }
}
