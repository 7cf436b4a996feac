#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use playmaker_api::authorization::sign_token;
use playmaker_api::config::Config;
use playmaker_api::errors::problem::Problem;
use playmaker_api::models::{
        Expansion, Invitation, InvitationWithRelationships, Message, Populated, Provider, User,
};
use playmaker_api::repositories::{
        Cursor, InvitationFilter, InvitationRepository, InvitationSort, MessageRepository, Page, UserRepository,
};
use playmaker_api::services::mail_service::{Mail, Mailer};
use playmaker_api::services::user_service::NewUser;
use playmaker_api::{router, AppState};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
pub struct InMemoryUserRepository {
        users: Mutex<HashMap<i64, User>>,
        follows: Mutex<HashSet<(i64, i64)>>,
        sequence: AtomicI64,
}

impl InMemoryUserRepository {
        pub fn all(&self) -> Vec<User> {
                self.users.lock().unwrap().values().cloned().collect()
        }

        pub fn follows(&self, follower_id: i64, following_id: i64) -> bool {
                self.follows.lock().unwrap().contains(&(follower_id, following_id))
        }

        fn matching(&self, keywords: &[String]) -> Vec<User> {
                let mut users: Vec<User> = self
                        .users
                        .lock()
                        .unwrap()
                        .values()
                        .filter(|user| {
                                keywords.iter().all(|keyword| {
                                        user.email.to_lowercase().contains(keyword.as_str())
                                                || user.display_name.to_lowercase().contains(keyword.as_str())
                                })
                        })
                        .cloned()
                        .collect();
                users.sort_by_key(|user| user.user_id);
                users
        }
}

impl UserRepository for InMemoryUserRepository {
        fn find_by_id(&self, id: i64) -> Result<Option<User>, Problem> {
                Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        fn find_by_email(&self, email: &str) -> Result<Option<User>, Problem> {
                Ok(self.users.lock().unwrap().values().find(|user| user.email == email).cloned())
        }

        fn find_by_provider_or_email(
                &self,
                provider: Provider,
                provider_id: &str,
                email: &str,
        ) -> Result<Option<User>, Problem> {
                Ok(self.users
                        .lock()
                        .unwrap()
                        .values()
                        .find(|user| user.provider_id(provider) == Some(provider_id) || user.email == email)
                        .cloned())
        }

        fn next_user_id(&self) -> Result<i64, Problem> {
                Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn save(&self, user: User) -> Result<User, Problem> {
                let mut users = self.users.lock().unwrap();
                if users.values().any(|other| other.id != user.id && other.email == user.email) {
                        return Err(Problem::Conflict("email already exists".to_string()));
                }
                users.insert(user.id, user.clone());
                Ok(user)
        }

        fn count_search(&self, keywords: &[String]) -> Result<i64, Problem> {
                Ok(self.matching(keywords).len() as i64)
        }

        fn search(&self, keywords: &[String], page: &Page) -> Result<Vec<User>, Problem> {
                Ok(self.matching(keywords)
                        .into_iter()
                        .skip(page.offset() as usize)
                        .take(page.limit as usize)
                        .collect())
        }

        fn follow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem> {
                self.follows.lock().unwrap().insert((follower_id, following_id));
                Ok(())
        }

        fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem> {
                self.follows.lock().unwrap().remove(&(follower_id, following_id));
                Ok(())
        }
}

pub struct InMemoryInvitationRepository {
        invitations: Mutex<Vec<Invitation>>,
        users: Arc<InMemoryUserRepository>,
}

impl InMemoryInvitationRepository {
        pub fn new(users: Arc<InMemoryUserRepository>) -> Self {
                Self {
                        invitations: Mutex::new(vec![]),
                        users,
                }
        }

        pub fn all(&self) -> Vec<Invitation> {
                self.invitations.lock().unwrap().clone()
        }

        fn populate(&self, invitation: Invitation, expansion: Expansion) -> InvitationWithRelationships {
                let summary = |id: i64| {
                        self.users
                                .find_by_id(id)
                                .ok()
                                .flatten()
                                .map(|user| Populated::Document(user.summary()))
                };

                let mut populated = InvitationWithRelationships::from(invitation.clone());
                populated.user = summary(invitation.user_id);
                if expansion == Expansion::Deep {
                        populated.guest_user = summary(invitation.guest_user_id);
                }
                populated
        }

        fn by_party(&self, user_id: i64, filter: &InvitationFilter) -> Vec<Invitation> {
                self.invitations
                        .lock()
                        .unwrap()
                        .iter()
                        .filter(|invitation| invitation.is_party(user_id) && filter.matches(invitation))
                        .cloned()
                        .collect()
        }
}

impl InvitationRepository for InMemoryInvitationRepository {
        fn count_by_party(&self, user_id: i64, filter: &InvitationFilter) -> Result<i64, Problem> {
                Ok(self.by_party(user_id, filter).len() as i64)
        }

        fn find_by_party(
                &self,
                user_id: i64,
                filter: &InvitationFilter,
                cursor: &Cursor,
        ) -> Result<Vec<InvitationWithRelationships>, Problem> {
                let mut invitations = self.by_party(user_id, filter);
                invitations.sort_by(|a, b| match cursor.sort {
                        InvitationSort::CreatedAtAsc => a.created_at.cmp(&b.created_at),
                        InvitationSort::CreatedAtDesc => b.created_at.cmp(&a.created_at),
                        InvitationSort::ScheduledAtAsc => a.scheduled_at.cmp(&b.scheduled_at),
                        InvitationSort::ScheduledAtDesc => b.scheduled_at.cmp(&a.scheduled_at),
                });

                Ok(invitations
                        .into_iter()
                        .skip(cursor.offset() as usize)
                        .take(cursor.limit as usize)
                        .map(|invitation| self.populate(invitation, Expansion::Shallow))
                        .collect())
        }

        fn find_by_id_and_party(
                &self,
                invitation_id: i64,
                user_id: i64,
                expansion: Expansion,
        ) -> Result<Option<InvitationWithRelationships>, Problem> {
                Ok(self.find_plain_by_id_and_party(invitation_id, user_id)?
                        .map(|invitation| self.populate(invitation, expansion)))
        }

        fn find_plain_by_id_and_party(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem> {
                Ok(self.by_party(user_id, &InvitationFilter::default())
                        .into_iter()
                        .find(|invitation| invitation.id == invitation_id))
        }

        fn find_by_id_and_user_id(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem> {
                Ok(self.invitations
                        .lock()
                        .unwrap()
                        .iter()
                        .find(|invitation| invitation.id == invitation_id && invitation.user_id == user_id)
                        .cloned())
        }

        fn save(&self, invitation: Invitation) -> Result<Invitation, Problem> {
                let mut invitations = self.invitations.lock().unwrap();
                invitations.retain(|other| other.id != invitation.id);
                invitations.push(invitation.clone());
                Ok(invitation)
        }

        fn delete(&self, invitation_id: i64) -> Result<(), Problem> {
                self.invitations.lock().unwrap().retain(|invitation| invitation.id != invitation_id);
                Ok(())
        }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
        messages: Mutex<Vec<Message>>,
        counters: Mutex<HashMap<(i64, i64), i64>>,
        pub fail_saves: AtomicBool,
        pub fail_chat_ids: AtomicBool,
}

impl InMemoryMessageRepository {
        pub fn all(&self) -> Vec<Message> {
                self.messages.lock().unwrap().clone()
        }
}

impl MessageRepository for InMemoryMessageRepository {
        fn save(&self, message: Message) -> Result<Message, Problem> {
                if self.fail_saves.load(Ordering::SeqCst) {
                        return Err(Problem::InternalServerError("failed to query database".to_string()));
                }
                let mut messages = self.messages.lock().unwrap();
                messages.retain(|other| other.id != message.id);
                messages.push(message.clone());
                Ok(message)
        }

        fn assign_next_chat_id(&self, message_id: i64) -> Result<i64, Problem> {
                if self.fail_chat_ids.load(Ordering::SeqCst) {
                        return Err(Problem::InternalServerError("failed to query database".to_string()));
                }
                let mut messages = self.messages.lock().unwrap();
                let message = messages
                        .iter_mut()
                        .find(|message| message.id == message_id)
                        .ok_or(Problem::NotFound("Message not found".to_string()))?;
                if let Some(chat_id) = message.chat_id {
                        return Ok(chat_id);
                }

                let mut counters = self.counters.lock().unwrap();
                let seq = counters.entry(message.conversation()).or_insert(0);
                *seq += 1;
                message.chat_id = Some(*seq);
                Ok(*seq)
        }

        fn find_without_chat_id(&self, limit: i64) -> Result<Vec<Message>, Problem> {
                let mut pending: Vec<Message> = self
                        .messages
                        .lock()
                        .unwrap()
                        .iter()
                        .filter(|message| message.chat_id.is_none())
                        .cloned()
                        .collect();
                pending.sort_by_key(|message| message.created_at);
                pending.truncate(limit as usize);
                Ok(pending)
        }
}

#[derive(Default)]
pub struct RecordingMailer {
        mails: Mutex<Vec<Mail>>,
}

impl RecordingMailer {
        pub fn sent(&self) -> Vec<Mail> {
                self.mails.lock().unwrap().clone()
        }
}

impl Mailer for RecordingMailer {
        fn send_mail(&self, mail: Mail) {
                self.mails.lock().unwrap().push(mail);
        }
}

pub struct TestApp {
        pub state: Arc<AppState>,
        pub users: Arc<InMemoryUserRepository>,
        pub invitations: Arc<InMemoryInvitationRepository>,
        pub messages: Arc<InMemoryMessageRepository>,
        pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
        pub fn new() -> Self {
                Self::with_config(Config::for_tests())
        }

        pub fn with_config(config: Config) -> Self {
                let users = Arc::new(InMemoryUserRepository::default());
                let invitations = Arc::new(InMemoryInvitationRepository::new(users.clone()));
                let messages = Arc::new(InMemoryMessageRepository::default());
                let mailer = Arc::new(RecordingMailer::default());

                let state = Arc::new(AppState::new(
                        config,
                        users.clone(),
                        invitations.clone(),
                        messages.clone(),
                        mailer.clone(),
                ));

                Self {
                        state,
                        users,
                        invitations,
                        messages,
                        mailer,
                }
        }

        pub fn create_user(&self, email: &str, password: &str) -> User {
                self.state
                        .user_service
                        .create(NewUser {
                                email: email.to_string(),
                                password: password.to_string(),
                                ..Default::default()
                        })
                        .unwrap()
        }

        pub fn token(&self, user: &User) -> String {
                sign_token(user.id, &self.state.config.jwt_secret, self.state.config.jwt_expiration).unwrap()
        }

        pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
                let response = router(self.state.clone()).oneshot(request).await.unwrap();
                let status = response.status();
                let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                let body = if bytes.is_empty() {
                        Value::Null
                } else {
                        serde_json::from_slice(&bytes).unwrap()
                };
                (status, body)
        }

        pub async fn request(
                &self,
                method: Method,
                uri: &str,
                token: Option<&str>,
                body: Option<Value>,
        ) -> (StatusCode, Value) {
                let mut builder = Request::builder().method(method).uri(uri);
                if let Some(token) = token {
                        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
                }
                let request = match body {
                        Some(body) => builder
                                .header(header::CONTENT_TYPE, "application/json")
                                .body(Body::from(body.to_string()))
                                .unwrap(),
                        None => builder.body(Body::empty()).unwrap(),
                };
                self.send(request).await
        }
}
