//! Common validation rules shared across form payloads.

use validator::ValidationError;

use crate::models::user::Role;
use crate::utils::security::RECOVERY_TOKEN_LENGTH;

/// Validates password strength.
///
/// Requirements:
/// - At least 8 characters
/// - At least one letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new("password_too_short")
            .with_message("La contraseña debe tener al menos 8 caracteres".into()));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(ValidationError::new("password_too_weak")
            .with_message("La contraseña debe combinar letras y números".into()));
    }
    Ok(())
}

pub fn validate_role_name(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("role_unknown").with_message("Rol no válido".into()))
}

/// Recovery secrets are fixed-length alphanumeric strings.
pub fn validate_recovery_token(token: &str) -> Result<(), ValidationError> {
    if token.len() != RECOVERY_TOKEN_LENGTH || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("recovery_token_invalid")
            .with_message("Enlace de recuperación no válido".into()));
    }
    Ok(())
}
