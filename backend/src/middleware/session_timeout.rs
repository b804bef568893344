//! Rolling idle timeout for signed-in users.
//!
//! Every request of an authenticated principal stamps `LastActivity` in the
//! server-side session. When the gap since the previous stamp exceeds the
//! configured limit the principal is signed out and redirected to the login
//! page before any handler runs. This limit is tighter than, and independent
//! of, the expiry of the auth cookie and of the session store.
//!
//! Concurrent requests from the same client are not serialised: the last
//! write of `LastActivity` wins.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tower_sessions::Session;

use crate::{
    error::AppError,
    middleware::auth::{sign_out_redirect, Principal},
    state::AppState,
    utils::time::Clock,
};

pub const LAST_ACTIVITY_KEY: &str = "LastActivity";

/// Per-client storage of the last activity stamp.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn last_activity(&self) -> anyhow::Result<Option<String>>;
    async fn record_activity(&self, stamp: String) -> anyhow::Result<()>;
    async fn clear_activity(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl ActivityStore for Session {
    async fn last_activity(&self) -> anyhow::Result<Option<String>> {
        Ok(self.get::<String>(LAST_ACTIVITY_KEY).await?)
    }

    async fn record_activity(&self, stamp: String) -> anyhow::Result<()> {
        self.insert(LAST_ACTIVITY_KEY, stamp).await?;
        Ok(())
    }

    async fn clear_activity(&self) -> anyhow::Result<()> {
        self.remove::<String>(LAST_ACTIVITY_KEY).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No principal; the store was not touched.
    Anonymous,
    /// `LastActivity` now holds the current time.
    Refreshed,
    /// Idle limit exceeded; `LastActivity` was removed.
    Expired { idle: Duration },
}

pub struct SessionGuard {
    idle_limit: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionGuard {
    pub fn new(idle_limit: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { idle_limit, clock }
    }

    pub async fn process<S>(&self, authenticated: bool, store: &S) -> anyhow::Result<GuardOutcome>
    where
        S: ActivityStore + ?Sized,
    {
        if !authenticated {
            return Ok(GuardOutcome::Anonymous);
        }

        let now = self.clock.now();
        let last_activity = store
            .last_activity()
            .await?
            .and_then(|raw| parse_activity_stamp(&raw));

        if let Some(last_activity) = last_activity {
            let idle = now - last_activity;
            if idle > self.idle_limit {
                store.clear_activity().await?;
                return Ok(GuardOutcome::Expired { idle });
            }
        }

        store.record_activity(format_activity_stamp(now)).await?;
        Ok(GuardOutcome::Refreshed)
    }
}

pub fn format_activity_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Unreadable stamps count as absent.
fn parse_activity_stamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(value = raw, error = %err, "Ignoring unparseable LastActivity value");
            None
        }
    }
}

pub async fn session_timeout(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = request.extensions().get::<Principal>().cloned();
    let guard = SessionGuard::new(state.config.activity_idle_limit(), state.clock.clone());

    match guard.process(principal.is_some(), &session).await? {
        GuardOutcome::Anonymous | GuardOutcome::Refreshed => Ok(next.run(request).await),
        GuardOutcome::Expired { idle } => {
            if let Some(principal) = principal {
                tracing::info!(
                    user_id = principal.user_id,
                    idle_seconds = idle.num_seconds(),
                    "Session idle limit exceeded, signing out"
                );
            }
            Ok(sign_out_redirect(&state.config, &state.config.login_path)?)
        }
    }
}
