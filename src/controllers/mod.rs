pub mod auth_controller;
pub mod debug_controller;
pub mod invitation_controller;
pub mod user_controller;
