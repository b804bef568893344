use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Length of the secret embedded in password recovery links.
pub const RECOVERY_TOKEN_LENGTH: usize = 48;

pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Digest stored in place of the raw recovery secret.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Accepts only same-site absolute paths as post-login redirect targets.
pub fn is_local_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(char::is_control)
}
