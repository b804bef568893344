use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::recovery_token::{RecoveryRequestForm, ResetPasswordForm, ResetQuery},
    services::password_recovery::RecoveryRequestOutcome,
    state::AppState,
    views,
};

pub async fn request_page() -> Response {
    views::recovery_request_page(false, &[]).into_response()
}

/// Every accepted address gets the same page, whether or not a mail left.
pub async fn request_submit(
    State(state): State<AppState>,
    Form(form): Form<RecoveryRequestForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        let messages = AppError::from(errors).user_messages();
        return Ok((
            StatusCode::BAD_REQUEST,
            views::recovery_request_page(false, &messages),
        )
            .into_response());
    }

    let outcome = state.recovery.request_recovery(&form.correo).await?;
    tracing::debug!(outcome = outcome_label(&outcome), "Recovery request handled");
    Ok(views::recovery_request_page(true, &[]).into_response())
}

fn outcome_label(outcome: &RecoveryRequestOutcome) -> &'static str {
    match outcome {
        RecoveryRequestOutcome::Sent => "sent",
        RecoveryRequestOutcome::UnknownEmail => "unknown_email",
        RecoveryRequestOutcome::Throttled => "throttled",
        RecoveryRequestOutcome::DeliveryFailed(_) => "delivery_failed",
    }
}

pub async fn reset_page(
    State(state): State<AppState>,
    Query(query): Query<ResetQuery>,
) -> Result<Response, AppError> {
    if !state.recovery.is_token_usable(&query.token).await? {
        return Ok(views::reset_link_invalid_page().into_response());
    }
    Ok(views::reset_password_page(&query.token, &[]).into_response())
}

pub async fn reset_submit(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    match state.recovery.reset_password(&form).await {
        Ok(_) => Ok(views::reset_done_page().into_response()),
        Err(AppError::Validation(messages)) => Ok((
            StatusCode::BAD_REQUEST,
            views::reset_password_page(&form.token, &messages),
        )
            .into_response()),
        Err(AppError::BadRequest(_)) => {
            Ok((StatusCode::BAD_REQUEST, views::reset_link_invalid_page()).into_response())
        }
        Err(other) => Err(other),
    }
}
