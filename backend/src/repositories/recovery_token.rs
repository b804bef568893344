use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::error::AppError;
use crate::models::recovery_token::RecoveryToken;

const COLUMNS: &str = "id, usuario_id, token, fecha_expiracion, usado";

pub async fn create_recovery_token(
    pool: &PgPool,
    user_id: i32,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<RecoveryToken, AppError> {
    let record = sqlx::query_as::<_, RecoveryToken>(&format!(
        r#"
        INSERT INTO token_recuperacion (usuario_id, token, fecha_expiracion, usado)
        VALUES ($1, $2, $3, FALSE)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn find_usable_token(
    pool: &PgPool,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<RecoveryToken>, AppError> {
    let record = sqlx::query_as::<_, RecoveryToken>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM token_recuperacion
        WHERE token = $1
        AND usado = FALSE
        AND fecha_expiracion > $2
        "#
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Flips `usado` to true and returns the token, or `None` when the token is
/// unknown, already used or expired. The check and the flip are one statement
/// so two concurrent resets cannot both succeed.
pub async fn consume_token<'e, E>(
    executor: E,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<RecoveryToken>, AppError>
where
    E: PgExecutor<'e>,
{
    let record = sqlx::query_as::<_, RecoveryToken>(&format!(
        r#"
        UPDATE token_recuperacion
        SET usado = TRUE
        WHERE token = $1
        AND usado = FALSE
        AND fecha_expiracion > $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    Ok(record)
}

/// Removes tokens that can no longer be redeemed.
pub async fn delete_stale_tokens(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM token_recuperacion
        WHERE usado = TRUE
        OR fecha_expiracion < $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
