//! Password recovery tokens (`token_recuperacion`).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

use crate::validation::rules;

#[derive(Debug, Clone, FromRow)]
/// Database representation of a recovery token.
pub struct RecoveryToken {
    pub id: i32,
    #[sqlx(rename = "usuario_id")]
    pub user_id: i32,
    /// SHA-256 digest of the secret sent by email.
    #[sqlx(rename = "token")]
    pub token_hash: Option<String>,
    #[sqlx(rename = "fecha_expiracion")]
    pub expires_at: DateTime<Utc>,
    #[sqlx(rename = "usado")]
    pub used: bool,
}

impl RecoveryToken {
    /// A token authorises a reset only once and only before it expires.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[derive(Debug, Deserialize, Validate)]
/// Form posted to `/Recuperacion/SolicitarRecuperacion`.
pub struct RecoveryRequestForm {
    #[validate(email(message = "Ingresa un correo válido"))]
    pub correo: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
/// Form posted to `/Recuperacion/RestablecerContrasena`.
pub struct ResetPasswordForm {
    #[validate(custom(function = "rules::validate_recovery_token"))]
    pub token: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub clave: String,
    pub confirmacion: String,
}
