use std::sync::Arc;

use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use playmaker_api::config::Config;
use playmaker_api::repositories::invitation_repository::PgInvitationRepository;
use playmaker_api::repositories::message_repository::PgMessageRepository;
use playmaker_api::repositories::user_repository::PgUserRepository;
use playmaker_api::services::mail_service::HttpMailService;
use playmaker_api::{router, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
const CHAT_ID_RECONCILE_BATCH: i64 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        dotenv().ok();

        tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                .init();

        let config = Config::load()?;

        let manager = ConnectionManager::<PgConnection>::new(config.database_url.clone());
        let pool = r2d2::Pool::builder().build(manager)?;
        pool.get()?.run_pending_migrations(MIGRATIONS)?;
        info!("migrations applied");

        let mailer = HttpMailService::new(
                reqwest::Client::new(),
                config.mail_api_url.clone(),
                config.mail_api_key.clone(),
                config.mail_sender.clone(),
        );

        let state = Arc::new(AppState::new(
                config.clone(),
                Arc::new(PgUserRepository::new(pool.clone())),
                Arc::new(PgInvitationRepository::new(pool.clone())),
                Arc::new(PgMessageRepository::new(pool.clone())),
                Arc::new(mailer),
        ));

        let chat_service = state.chat_service.clone();
        tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.chat_id_reconcile_interval);
                loop {
                        interval.tick().await;
                        let chat_service = chat_service.clone();
                        let reconciled =
                                tokio::task::spawn_blocking(move || chat_service.reconcile(CHAT_ID_RECONCILE_BATCH));
                        match reconciled.await {
                                Ok(Err(err)) => error!("chat id reconciliation failed: {}", err),
                                Err(err) => error!("chat id reconciliation panicked: {}", err),
                                Ok(Ok(_)) => {}
                        }
                }
        });

        let address = format!("{}:{}", state.config.host, state.config.port);
        let listener = TcpListener::bind(&address).await?;
        info!("server running on {}", address);

        axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

        info!("server shutting down");
        Ok(())
}

async fn shutdown_signal() {
        if let Err(err) = signal::ctrl_c().await {
                error!("failed to install ctrl-c handler: {}", err);
                std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
}
