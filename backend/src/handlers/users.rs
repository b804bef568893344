use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use validator::Validate;

use crate::{
    error::AppError,
    middleware::auth::{redirect_found, Principal},
    models::user::{CreateUserForm, Role},
    repositories::user as user_repo,
    state::AppState,
    utils::password::hash_password,
    views,
};

const USERS_PATH: &str = "/Usuarios/Index";

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, AppError> {
    let users = user_repo::list_users(&state.pool).await?;
    Ok(views::users_page(&principal, &users, &[]).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<CreateUserForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = validate_form(&form) {
        return rerender(&state, &principal, StatusCode::BAD_REQUEST, errors).await;
    }

    let role: Role = form
        .rol
        .parse()
        .map_err(|_| AppError::BadRequest(format!("El rol {} no existe", form.rol)))?;
    let password_hash = hash_password(&form.clave)?;

    match user_repo::create_user(&state.pool, &form.nombre, &form.correo, &password_hash, role).await {
        Ok(user) => {
            tracing::info!(
                admin_id = principal.user_id,
                user_id = user.id,
                role = %role,
                "User created"
            );
            Ok(redirect_found(USERS_PATH))
        }
        Err(AppError::Conflict(message)) => {
            rerender(&state, &principal, StatusCode::CONFLICT, vec![message]).await
        }
        Err(other) => Err(other),
    }
}

fn validate_form(form: &CreateUserForm) -> Result<(), Vec<String>> {
    form.validate().map_err(|errors| match AppError::from(errors) {
        AppError::Validation(messages) => messages,
        other => other.user_messages(),
    })
}

async fn rerender(
    state: &AppState,
    principal: &Principal,
    status: StatusCode,
    messages: Vec<String>,
) -> Result<Response, AppError> {
    let users = user_repo::list_users(&state.pool).await?;
    Ok((status, views::users_page(principal, &users, &messages)).into_response())
}
