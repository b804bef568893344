use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::error::AppError;
use crate::models::user::{Role, User};

const SELECT_USER: &str = r#"
    SELECT u.id_usuario, u.nombre, u.correo, u.clave, u.id_rol, r.nombre AS rol,
           u.activo, u.created_at, u.updated_at
    FROM usuarios u
    JOIN roles r ON r.id_rol = u.id_rol
"#;

pub async fn find_active_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "{SELECT_USER} WHERE LOWER(u.correo) = LOWER($1) AND u.activo = TRUE"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!("{SELECT_USER} ORDER BY u.nombre, u.id_usuario"))
        .fetch_all(pool)
        .await?;

    Ok(users)
}

pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        WITH inserted AS (
            INSERT INTO usuarios (nombre, correo, clave, id_rol)
            SELECT $1, $2, $3, id_rol FROM roles WHERE nombre = $4
            RETURNING *
        )
        SELECT u.id_usuario, u.nombre, u.correo, u.clave, u.id_rol, r.nombre AS rol,
               u.activo, u.created_at, u.updated_at
        FROM inserted u
        JOIN roles r ON r.id_rol = u.id_rol
        "#,
    )
    .bind(name.trim())
    .bind(email.trim())
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Ya existe un usuario con ese correo".to_string())
        }
        other => other.into(),
    })?
    .ok_or_else(|| AppError::BadRequest(format!("El rol {} no existe", role)))?;

    Ok(user)
}

pub async fn update_password<'e, E>(
    executor: E,
    user_id: i32,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE usuarios SET clave = $1, updated_at = $2 WHERE id_usuario = $3")
        .bind(password_hash)
        .bind(now)
        .bind(user_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Usuario no encontrado".to_string()));
    }
    Ok(())
}
