use glamping_backend::{
    config::Config,
    db::connection::create_pool,
    models::user::{CreateUserForm, Role},
    repositories::user as user_repo,
    utils::password::hash_password,
    validation::Validate,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: create_admin <nombre> <correo> <clave>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "create_admin=info,glamping_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(nombre), Some(correo), Some(clave)) = (args.next(), args.next(), args.next()) else {
        anyhow::bail!(USAGE);
    };

    let form = CreateUserForm {
        nombre,
        correo,
        clave,
        rol: Role::Administrador.as_str().to_string(),
    };
    form.validate()?;

    let config = Config::load()?;
    let pool = create_pool(&config.database_url, 1).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let password_hash = hash_password(&form.clave)?;
    let user = user_repo::create_user(
        &pool,
        &form.nombre,
        &form.correo,
        &password_hash,
        Role::Administrador,
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Administrator created");
    Ok(())
}
