use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    services::password_recovery::PasswordRecoveryService,
    utils::{email::Mailer, time::Clock},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
    pub recovery: Arc<PasswordRecoveryService>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        let recovery = Arc::new(PasswordRecoveryService::new(
            pool.clone(),
            mailer.clone(),
            clock.clone(),
            &config,
        ));
        Self {
            pool,
            config: Arc::new(config),
            mailer,
            clock,
            recovery,
        }
    }
}
