use chrono::Utc;
use glamping_backend::{
    config::Config, db::connection::create_pool, repositories::recovery_token as recovery_repo,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_cleanup=info,glamping_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url, 1).await?;

    let deleted = recovery_repo::delete_stale_tokens(&pool, Utc::now()).await?;
    tracing::info!(deleted, "Deleted expired or used recovery tokens");

    sqlx::query("VACUUM (ANALYZE) token_recuperacion")
        .execute(&pool)
        .await?;

    Ok(())
}
