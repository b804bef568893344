use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex},
    time::{Duration as StdDuration, Instant},
};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use url::Url;
use validator::Validate;

use crate::{
    config::Config,
    db::connection::DbPool,
    error::AppError,
    models::{recovery_token::ResetPasswordForm, user::User},
    repositories::{recovery_token as recovery_repo, user as user_repo},
    utils::{
        email::{DeliveryOutcome, Mailer},
        password::hash_password,
        security::{generate_token, hash_token, RECOVERY_TOKEN_LENGTH},
        time::{format_local, Clock},
    },
    validation::rules,
    views,
};

pub const RECOVERY_SUBJECT: &str = "Recuperación de contraseña - Glamping Addventure";
pub const RESET_PATH: &str = "/Recuperacion/RestablecerContrasena";

const LIMITER_CLEANUP_INTERVAL: StdDuration = StdDuration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryRequestOutcome {
    Sent,
    UnknownEmail,
    Throttled,
    DeliveryFailed(String),
}

pub struct PasswordRecoveryService {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    limiter: DefaultKeyedRateLimiter<String>,
    limiter_cleanup_threshold: usize,
    last_limiter_cleanup: Mutex<Instant>,
    token_ttl: Duration,
    public_base_url: String,
    time_zone: Tz,
}

impl PasswordRecoveryService {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let per_hour =
            NonZeroU32::new(config.recovery_requests_per_hour).unwrap_or(NonZeroU32::MIN);
        Self {
            pool,
            mailer,
            clock,
            limiter: RateLimiter::keyed(Quota::per_hour(per_hour)),
            limiter_cleanup_threshold: config.recovery_limiter_cleanup_threshold.max(1),
            last_limiter_cleanup: Mutex::new(Instant::now()),
            token_ttl: config.recovery_token_ttl(),
            public_base_url: config.public_base_url.clone(),
            time_zone: config.time_zone,
        }
    }

    /// Issues a token and mails the reset link. Callers must answer the same
    /// way whatever the outcome, so the page does not reveal which addresses
    /// have accounts.
    pub async fn request_recovery(&self, email: &str) -> Result<RecoveryRequestOutcome, AppError> {
        let email = email.trim().to_lowercase();
        if !self.admit(&email) {
            tracing::warn!(email = %email, "Recovery request throttled");
            return Ok(RecoveryRequestOutcome::Throttled);
        }

        let Some(user) = user_repo::find_active_by_email(&self.pool, &email).await? else {
            tracing::info!("Recovery requested for an unknown or inactive address");
            return Ok(RecoveryRequestOutcome::UnknownEmail);
        };

        let secret = generate_token(RECOVERY_TOKEN_LENGTH);
        let expires_at = self.clock.now() + self.token_ttl;
        recovery_repo::create_recovery_token(&self.pool, user.id, &hash_token(&secret), expires_at)
            .await?;

        Ok(self.send_recovery_email(&user, &secret, expires_at).await?)
    }

    fn admit(&self, email: &str) -> bool {
        let admitted = self.limiter.check_key(&email.to_string()).is_ok();
        self.cleanup_limiter_if_due(Instant::now());
        admitted
    }

    /// Drops throttle state of addresses whose quota has fully replenished.
    fn cleanup_limiter_if_due(&self, now: Instant) -> bool {
        let mut last_cleanup = self
            .last_limiter_cleanup
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !should_cleanup_limiter(
            self.limiter.len(),
            self.limiter_cleanup_threshold,
            now,
            *last_cleanup,
            LIMITER_CLEANUP_INTERVAL,
        ) {
            return false;
        }
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        *last_cleanup = now;
        tracing::debug!(tracked = self.limiter.len(), "Pruned recovery throttle state");
        true
    }

    async fn send_recovery_email(
        &self,
        user: &User,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<RecoveryRequestOutcome> {
        let link = self.reset_link(secret)?;
        let body = views::recovery_email(
            &user.name,
            link.as_str(),
            &format_local(expires_at, &self.time_zone),
        );

        match self.mailer.send_html(&user.email, RECOVERY_SUBJECT, &body).await {
            DeliveryOutcome::Delivered => {
                tracing::info!(user_id = user.id, "Recovery email sent");
                Ok(RecoveryRequestOutcome::Sent)
            }
            DeliveryOutcome::Failed(reason) => {
                tracing::error!(user_id = user.id, reason = %reason, "Failed to send recovery email");
                Ok(RecoveryRequestOutcome::DeliveryFailed(reason))
            }
        }
    }

    pub fn reset_link(&self, secret: &str) -> anyhow::Result<Url> {
        let mut link = Url::parse(&self.public_base_url)?.join(RESET_PATH)?;
        link.query_pairs_mut().append_pair("token", secret);
        Ok(link)
    }

    /// Whether the secret from a link can still be redeemed. Malformed
    /// secrets are rejected without a query.
    pub async fn is_token_usable(&self, secret: &str) -> Result<bool, AppError> {
        if rules::validate_recovery_token(secret).is_err() {
            return Ok(false);
        }
        let now = self.clock.now();
        let token = recovery_repo::find_usable_token(&self.pool, &hash_token(secret), now).await?;
        Ok(token.is_some_and(|token| token.is_usable(now)))
    }

    /// Redeems the token and stores the new password in one transaction.
    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<i32, AppError> {
        form.validate()?;
        if form.clave != form.confirmacion {
            return Err(AppError::Validation(vec![
                "Las contraseñas no coinciden".to_string()
            ]));
        }

        let new_hash = hash_password(&form.clave)?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let token = recovery_repo::consume_token(&mut *tx, &hash_token(&form.token), now)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(
                    "El enlace de recuperación expiró o ya fue utilizado".to_string(),
                )
            })?;
        user_repo::update_password(&mut *tx, token.user_id, &new_hash, now).await?;
        tx.commit().await?;

        tracing::info!(user_id = token.user_id, token_id = token.id, "Password reset with recovery token");
        Ok(token.user_id)
    }
}

fn should_cleanup_limiter(
    tracked: usize,
    threshold: usize,
    now: Instant,
    last_cleanup_at: Instant,
    interval: StdDuration,
) -> bool {
    tracked > threshold || now.saturating_duration_since(last_cleanup_at) >= interval
}
