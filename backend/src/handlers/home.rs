use axum::{
    extract::{Extension, State},
    response::Html,
};

use crate::{middleware::auth::Principal, state::AppState, utils::time::format_local, views};

pub async fn index(Extension(principal): Extension<Principal>) -> Html<String> {
    views::home_page(&principal)
}

pub async fn reception(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Html<String> {
    let local_now = format_local(state.clock.now(), &state.config.time_zone);
    views::reception_page(&principal, &local_now)
}
