use std::sync::{Arc, Mutex};

use axum::routing::{get, post, put};
use axum::Router;
use snowflake::SnowflakeIdGenerator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::controllers::{auth_controller, debug_controller, invitation_controller, user_controller};
use crate::errors::problem::Problem;
use crate::repositories::{InvitationRepository, MessageRepository, UserRepository};
use crate::services::chat_service::ChatService;
use crate::services::mail_service::Mailer;
use crate::services::provider_service::ProviderService;
use crate::services::user_service::UserService;

pub mod authorization;
pub mod capabilities;
pub mod config;
pub mod controllers;
pub mod dtos;
pub mod errors;
pub mod merge;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;

/// Snowflake ids shared by every writer in the process.
#[derive(Debug, Clone)]
pub struct IdGenerator(Arc<Mutex<SnowflakeIdGenerator>>);

impl IdGenerator {
        pub fn new(machine_id: i32, node_id: i32) -> Self {
                Self(Arc::new(Mutex::new(SnowflakeIdGenerator::new(machine_id, node_id))))
        }

        pub fn generate(&self) -> Result<i64, Problem> {
                let mut id_generator = self.0.lock().map_err(|_| {
                        error!("id generator lock poisoned");
                        Problem::InternalServerError("failed to generate id".to_string())
                })?;
                Ok(id_generator.generate())
        }
}

pub struct AppState {
        pub config: Config,
        pub id_generator: IdGenerator,

        pub user_repository: Arc<dyn UserRepository>,
        pub invitation_repository: Arc<dyn InvitationRepository>,
        pub message_repository: Arc<dyn MessageRepository>,

        pub user_service: UserService,
        pub chat_service: ChatService,
        pub provider_service: ProviderService,
}

impl AppState {
        pub fn new(
                config: Config,
                user_repository: Arc<dyn UserRepository>,
                invitation_repository: Arc<dyn InvitationRepository>,
                message_repository: Arc<dyn MessageRepository>,
                mailer: Arc<dyn Mailer>,
        ) -> Self {
                let id_generator = IdGenerator::new(1, 1);

                Self {
                        user_service: UserService::new(
                                user_repository.clone(),
                                mailer,
                                id_generator.clone(),
                                config.environment,
                        ),
                        chat_service: ChatService::new(message_repository.clone()),
                        provider_service: ProviderService::new(reqwest::Client::new()),
                        config,
                        id_generator,
                        user_repository,
                        invitation_repository,
                        message_repository,
                }
        }
}

pub fn router(state: Arc<AppState>) -> Router {
        let v1 = Router::new()
                .route("/auth", post(auth_controller::login))
                .route("/auth/:provider", post(auth_controller::provider_login))
                .route("/users", post(user_controller::create_user).get(user_controller::search_users))
                .route("/users/me", get(user_controller::get_me).put(user_controller::update_me))
                .route("/users/me/password", put(user_controller::update_password))
                .route("/users/:user_id", get(user_controller::get_user))
                .route(
                        "/users/:user_id/follow",
                        post(user_controller::follow_user).delete(user_controller::unfollow_user),
                )
                .route(
                        "/invitations",
                        post(invitation_controller::create_invitation).get(invitation_controller::get_invitations),
                )
                .route(
                        "/invitations/:invitation_id",
                        get(invitation_controller::get_invitation)
                                .put(invitation_controller::update_invitation)
                                .delete(invitation_controller::delete_invitation),
                );

        Router::new()
                .route("/health", get(debug_controller::health))
                .nest("/v1", v1)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .with_state(state)
}
