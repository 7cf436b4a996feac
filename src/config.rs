use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
        Production,
        Development,
        Test,
}

impl FromStr for Environment {
        type Err = String;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.to_lowercase().as_str() {
                        "production" | "prod" => Ok(Environment::Production),
                        "development" | "dev" => Ok(Environment::Development),
                        "test" => Ok(Environment::Test),
                        other => Err(format!("unknown environment {other}")),
                }
        }
}

#[derive(Debug, Clone)]
pub struct Config {
        pub environment: Environment,
        pub database_url: String,
        pub host: String,
        pub port: u16,
        pub jwt_secret: String,
        pub jwt_expiration: Duration,
        pub mail_api_url: String,
        pub mail_api_key: String,
        pub mail_sender: String,
        pub chat_id_reconcile_interval: Duration,
}

#[derive(Debug)]
pub struct ConfigError(String);

impl Display for ConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
        }
}

impl std::error::Error for ConfigError {}

impl Config {
        pub fn load() -> Result<Self, ConfigError> {
                let environment: Environment = try_load("APP_ENV", "development")?;

                let jwt_secret = match environment {
                        Environment::Production => required("JWT_SECRET")?,
                        _ => try_load("JWT_SECRET", "playmaker-development-secret")?,
                };

                Ok(Self {
                        environment,
                        database_url: required("DATABASE_URL")?,
                        host: try_load("SERVER_HOST", "127.0.0.1")?,
                        port: try_load("SERVER_PORT", "8080")?,
                        jwt_secret,
                        jwt_expiration: Duration::from_secs(try_load("JWT_EXPIRATION_SECS", "604800")?),
                        mail_api_url: try_load("MAIL_API_URL", "https://api.sendgrid.com/v3/mail/send")?,
                        mail_api_key: try_load("MAIL_API_KEY", "")?,
                        mail_sender: try_load("MAIL_SENDER", "no-reply@playmaker.app")?,
                        chat_id_reconcile_interval: Duration::from_secs(try_load(
                                "CHAT_ID_RECONCILE_INTERVAL_SECS",
                                "60",
                        )?),
                })
        }

        /// Settings for exercising the application without a live database.
        pub fn for_tests() -> Self {
                Self {
                        environment: Environment::Test,
                        database_url: String::new(),
                        host: "127.0.0.1".to_string(),
                        port: 0,
                        jwt_secret: "test-secret".to_string(),
                        jwt_expiration: Duration::from_secs(3600),
                        mail_api_url: String::new(),
                        mail_api_key: String::new(),
                        mail_sender: "no-reply@playmaker.test".to_string(),
                        chat_id_reconcile_interval: Duration::from_secs(60),
                }
        }
}

fn required(key: &str) -> Result<String, ConfigError> {
        env::var(key).map_err(|_| ConfigError(format!("{key} must be set")))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
        T::Err: Display,
{
        env::var(key)
                .unwrap_or_else(|_| {
                        info!("{key} not set, using default: {default}");
                        default.to_string()
                })
                .parse()
                .map_err(|e| {
                        warn!("Invalid {key} value: {e}");
                        ConfigError(format!("invalid {key} value: {e}"))
                })
}
