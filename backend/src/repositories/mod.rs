pub mod recovery_token;
pub mod user;
