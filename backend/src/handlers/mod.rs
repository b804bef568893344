pub mod auth;
pub mod home;
pub mod recovery;
pub mod users;
