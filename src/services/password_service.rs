use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::error;

use crate::capabilities::Authenticate;
use crate::config::Environment;
use crate::errors::problem::Problem;
use crate::models::User;

pub const MIN_PASSWORD_LENGTH: usize = 6;

fn hasher(environment: Environment) -> Result<Argon2<'static>, Problem> {
        let params = match environment {
                Environment::Test => Params::new(Params::MIN_M_COST, 1, 1, None),
                _ => Params::new(19_456, 2, 1, None),
        }
        .map_err(|err| {
                error!("invalid argon2 params: {}", err);
                Problem::InternalServerError("failed to hash password".to_string())
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str, environment: Environment) -> Result<String, Problem> {
        let salt = SaltString::generate(&mut OsRng);

        hasher(environment)?
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| {
                        error!("failed to hash password: {}", err);
                        Problem::InternalServerError("failed to hash password".to_string())
                })
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, Problem> {
        let parsed = PasswordHash::new(hash).map_err(|err| {
                error!("stored password hash is unreadable: {}", err);
                Problem::InternalServerError("failed to compare password".to_string())
        })?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(err) => {
                        error!("failed to compare password: {}", err);
                        Err(Problem::InternalServerError("failed to compare password".to_string()))
                }
        }
}

impl Authenticate for User {
        fn authenticate(&self, password: &str) -> Result<Option<&Self>, Problem> {
                Ok(verify_password(password, &self.password)?.then_some(self))
        }
}
