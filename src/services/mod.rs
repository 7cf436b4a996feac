pub mod chat_service;
pub mod mail_service;
pub mod password_service;
pub mod provider_service;
pub mod user_service;
