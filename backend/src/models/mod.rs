//! Data models shared across database access and handlers.

pub mod recovery_token;
pub mod user;
