use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use tracing::{error, info};

use crate::capabilities::ProviderReconciler;
use crate::config::Environment;
use crate::errors::problem::Problem;
use crate::models::{is_valid_email, Activity, Contract, Gender, Provider, ProviderIdentity, Role, Setting, User};
use crate::repositories::UserRepository;
use crate::services::mail_service::{welcome_mail, Mailer};
use crate::services::password_service::{hash_password, MIN_PASSWORD_LENGTH};
use crate::IdGenerator;

const GENERATED_PASSWORD_LENGTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
        pub email: String,
        pub password: String,
        pub display_name: Option<String>,
        pub picture: Option<String>,
        pub gender: Option<Gender>,
        pub role: Option<Role>,
        pub current_contract: Option<Contract>,
        pub sponsor_id: Option<i64>,
        pub provider: Option<(Provider, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
        pub email: Option<String>,
        pub display_name: Option<String>,
        pub picture: Option<String>,
        pub gender: Option<Gender>,
        pub registration_ids: Option<Vec<String>>,
        pub activities: Option<Vec<Activity>>,
        pub settings: Option<Vec<Setting>>,
}

fn trimmed(value: Option<String>) -> Option<String> {
        value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn generate_password() -> String {
        rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(GENERATED_PASSWORD_LENGTH)
                .map(char::from)
                .collect()
}

fn validate_password(password: &str) -> Result<(), Problem> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(Problem::BadRequest(format!(
                        "password must be at least {} characters",
                        MIN_PASSWORD_LENGTH
                )));
        }
        Ok(())
}

fn validate(user: &User) -> Result<(), Problem> {
        if !is_valid_email(&user.email) {
                return Err(Problem::BadRequest("email is invalid".to_string()));
        }
        if user.display_name.trim().is_empty() {
                return Err(Problem::BadRequest("Display name is required".to_string()));
        }
        Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, Problem> {
        serde_json::to_value(value).map_err(|err| {
                error!("failed to serialize user field: {}", err);
                Problem::InternalServerError("failed to serialize user".to_string())
        })
}

/// Persistence lifecycle of users: normalization, hashing and the welcome mail.
#[derive(Clone)]
pub struct UserService {
        user_repository: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        id_generator: IdGenerator,
        environment: Environment,
}

impl UserService {
        pub fn new(
                user_repository: Arc<dyn UserRepository>,
                mailer: Arc<dyn Mailer>,
                id_generator: IdGenerator,
                environment: Environment,
        ) -> Self {
                Self {
                        user_repository,
                        mailer,
                        id_generator,
                        environment,
                }
        }

        pub fn create(&self, new_user: NewUser) -> Result<User, Problem> {
                let now = Utc::now().naive_utc();
                let mut user = User {
                        id: self.id_generator.generate()?,
                        created_at: now,
                        updated_at: now,
                        user_id: 0,
                        sponsor_id: new_user.sponsor_id,
                        email: String::new(),
                        display_name: trimmed(new_user.display_name).unwrap_or_default(),
                        current_contract: new_user.current_contract.unwrap_or_default(),
                        gender: new_user.gender.unwrap_or_default(),
                        registration_ids: vec![],
                        password: String::new(),
                        role: new_user.role.unwrap_or_default(),
                        picture: trimmed(new_user.picture),
                        facebook_id: None,
                        google_id: None,
                        activities: json!([]),
                        settings: json!([]),
                };
                if let Some((provider, provider_id)) = new_user.provider {
                        user.set_provider_id(provider, provider_id);
                }
                user.assign_email(&new_user.email);

                validate(&user)?;
                validate_password(&new_user.password)?;

                if self.user_repository.find_by_email(&user.email)?.is_some() {
                        return Err(Problem::Conflict("Email already registered".to_string()));
                }

                user.user_id = self.user_repository.next_user_id()?;

                self.persist(user, true, Some(new_user.password))
        }

        pub fn update(&self, mut user: User, changes: UserChanges) -> Result<User, Problem> {
                if let Some(display_name) = changes.display_name {
                        user.display_name = display_name.trim().to_string();
                }
                if let Some(picture) = changes.picture {
                        user.picture = trimmed(Some(picture));
                }
                if let Some(email) = changes.email {
                        let normalized = email.trim().to_lowercase();
                        if normalized != user.email && self.user_repository.find_by_email(&normalized)?.is_some() {
                                return Err(Problem::Conflict("Email already registered".to_string()));
                        }
                        user.assign_email(&normalized);
                }
                if let Some(gender) = changes.gender {
                        user.gender = gender;
                }
                if let Some(registration_ids) = changes.registration_ids {
                        user.registration_ids = registration_ids;
                }
                if let Some(activities) = changes.activities {
                        user.activities = to_json(&activities)?;
                }
                if let Some(settings) = changes.settings {
                        user.settings = to_json(&settings)?;
                }

                validate(&user)?;

                self.persist(user, false, None)
        }

        pub fn update_password(&self, user: User, password: String) -> Result<User, Problem> {
                validate_password(&password)?;

                self.persist(user, false, Some(password))
        }

        /// Runs the pre-persist hooks and writes the user.
        ///
        /// New users get the welcome mail in production. A supplied plaintext password is
        /// hashed before the write, and the write is skipped when hashing fails.
        fn persist(&self, mut user: User, is_new: bool, password: Option<String>) -> Result<User, Problem> {
                if is_new && self.environment == Environment::Production {
                        info!("sending welcome mail to user {}", user.id);
                        self.mailer
                                .send_mail(welcome_mail(&user.display_name, &user.email, password.as_deref()));
                }

                if let Some(password) = password {
                        user.password = hash_password(&password, self.environment)?;
                }

                user.updated_at = Utc::now().naive_utc();
                self.user_repository.save(user)
        }
}

impl ProviderReconciler for UserService {
        fn find_or_create_from_provider(&self, identity: ProviderIdentity) -> Result<User, Problem> {
                let existing = self.user_repository.find_by_provider_or_email(
                        identity.provider,
                        &identity.id,
                        &identity.email,
                )?;

                match existing {
                        Some(mut user) => {
                                info!("linking {} identity to user {}", identity.provider, user.id);
                                user.set_provider_id(identity.provider, identity.id);
                                if let Some(name) = trimmed(identity.name) {
                                        user.display_name = name;
                                }
                                if let Some(picture) = trimmed(identity.picture) {
                                        user.picture = Some(picture);
                                }
                                self.persist(user, false, None)
                        }
                        None => {
                                info!("creating user from {} identity", identity.provider);
                                self.create(NewUser {
                                        email: identity.email,
                                        password: generate_password(),
                                        display_name: identity.name,
                                        picture: identity.picture,
                                        provider: Some((identity.provider, identity.id)),
                                        ..Default::default()
                                })
                        }
                }
        }
}
