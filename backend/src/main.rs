use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glamping_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    routes::build_router,
    state::AppState,
    utils::{email::EmailService, time::SystemClock},
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glamping_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        bind_addr = %config.bind_addr,
        time_zone = %config.time_zone,
        auth_secret = %mask_secret(&config.auth_secret),
        auth_expiration_minutes = config.auth_expiration_minutes,
        activity_idle_limit_minutes = config.activity_idle_limit_minutes,
        session_idle_timeout_minutes = config.session_idle_timeout_minutes,
        smtp_server = %config.email.smtp_server,
        smtp_username = %config.email.smtp_username,
        smtp_password = %mask_secret(&config.email.smtp_password),
        smtp_skip_send = config.email.skip_send,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url, config.database_max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let mailer = Arc::new(EmailService::new(&config.email)?);
    let addr = config.bind_addr;
    let state = AppState::new(pool, config, mailer, Arc::new(SystemClock));
    let app = build_router(state);

    // Start server
    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
