use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Form,
};
use tower_sessions::Session;

use crate::{
    error::AppError,
    middleware::{
        auth::{redirect_found, sign_in, sign_out_redirect, with_auth_cookie},
        session_timeout::ActivityStore,
    },
    models::user::{LoginForm, LoginQuery},
    repositories::user as user_repo,
    state::AppState,
    utils::{
        password::{verify_against_dummy, verify_password},
        security::is_local_redirect,
    },
    views,
};

const INVALID_CREDENTIALS: &str = "Correo o contraseña incorrectos";
pub const HOME_PATH: &str = "/Home/Index";

pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    views::login_page(&[], "", query.return_url.as_deref()).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = user_repo::find_active_by_email(&state.pool, &form.correo).await?;

    let verified = match &user {
        Some(user) => verify_password(&form.clave, &user.password_hash)?,
        None => {
            verify_against_dummy(&form.clave);
            false
        }
    };

    let Some(user) = user.filter(|_| verified) else {
        tracing::warn!(email = %form.correo.trim(), "Failed login attempt");
        return Ok(views::login_page(
            &[INVALID_CREDENTIALS.to_string()],
            form.correo.trim(),
            form.return_url.as_deref(),
        )
        .into_response());
    };

    session.cycle_id().await?;
    session.clear_activity().await?;

    let (principal, cookie) = sign_in(&user, state.clock.now(), &state.config)?;
    tracing::info!(user_id = principal.user_id, role = %principal.role, "User signed in");

    let target = form
        .return_url
        .as_deref()
        .filter(|url| is_local_redirect(url))
        .unwrap_or(HOME_PATH);
    Ok(with_auth_cookie(redirect_found(target), cookie))
}

pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    session.flush().await?;
    Ok(sign_out_redirect(&state.config, &state.config.login_path)?)
}

pub async fn root(State(state): State<AppState>) -> Response {
    redirect_found(&state.config.login_path)
}
