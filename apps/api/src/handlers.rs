pub mod health;
pub mod identifier;
pub mod login_attempts;
pub mod write_budget;

mod guard_response;
