//! Users, roles and the forms that manage them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use validator::Validate;

use crate::validation::rules;

#[derive(Debug, Clone, FromRow)]
/// Account row joined with its role name.
pub struct User {
    #[sqlx(rename = "id_usuario")]
    pub id: i32,
    #[sqlx(rename = "nombre")]
    pub name: String,
    #[sqlx(rename = "correo")]
    pub email: String,
    /// Argon2 PHC string.
    #[sqlx(rename = "clave")]
    pub password_hash: String,
    #[sqlx(rename = "id_rol")]
    pub role_id: i32,
    #[sqlx(rename = "rol")]
    pub role_name: String,
    #[sqlx(rename = "activo")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        self.role_name.parse().ok()
    }
}

/// Roles seeded by the initial migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrador,
    Recepcionista,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Administrador, Role::Recepcionista];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "Administrador",
            Role::Recepcionista => "Recepcionista",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

#[derive(Debug, Deserialize)]
/// Login form posted to `/Inicio/IniciarSesion`.
pub struct LoginForm {
    pub correo: String,
    pub clave: String,
    #[serde(rename = "ReturnUrl", default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "ReturnUrl", default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
/// Form used by administrators to open a new account.
pub struct CreateUserForm {
    #[validate(length(min = 1, max = 100, message = "El nombre es obligatorio"))]
    pub nombre: String,
    #[validate(email(message = "Correo no válido"))]
    pub correo: String,
    #[validate(custom(function = "rules::validate_password_strength"))]
    pub clave: String,
    #[validate(custom(function = "rules::validate_role_name"))]
    pub rol: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("administrador".parse::<Role>(), Ok(Role::Administrador));
        assert_eq!(" Recepcionista ".parse::<Role>(), Ok(Role::Recepcionista));
        assert!("Cliente".parse::<Role>().is_err());
    }

    #[test]
    fn create_user_form_validation_collects_field_errors() {
        let form = CreateUserForm {
            nombre: String::new(),
            correo: "no-es-correo".into(),
            clave: "corta".into(),
            rol: "Cliente".into(),
        };
        let errors = form.validate().expect_err("form is invalid");
        let fields = errors.field_errors();
        assert!(fields.contains_key("nombre"));
        assert!(fields.contains_key("correo"));
        assert!(fields.contains_key("clave"));
        assert!(fields.contains_key("rol"));
    }
}
