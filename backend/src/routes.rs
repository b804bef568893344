use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie, Expiry, MemoryStore, SessionManagerLayer};

use crate::{
    config::Config,
    handlers::{auth, home, recovery, users},
    middleware::{authenticate, authorize, cache_and_transport_headers, session_timeout, Policy},
    state::AppState,
    utils::cookies::SameSite,
};

pub const SESSION_COOKIE_NAME: &str = "glamping.session";

fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let same_site = match config.cookie_same_site {
        SameSite::Lax => cookie::SameSite::Lax,
        SameSite::Strict => cookie::SameSite::Strict,
        SameSite::None => cookie::SameSite::None,
    };
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_http_only(true)
        .with_secure(config.cookie_secure)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_idle_timeout_minutes as i64,
        )))
}

/// Builds the application router. Outermost first: tracing, cache headers,
/// server-side session, identity cookie, idle guard, then per-group policies.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::root))
        .route(
            "/Inicio/IniciarSesion",
            get(auth::login_page).post(auth::login),
        )
        .route("/Inicio/CerrarSesion", post(auth::logout))
        .route(
            "/Recuperacion/SolicitarRecuperacion",
            get(recovery::request_page).post(recovery::request_submit),
        )
        .route(
            "/Recuperacion/RestablecerContrasena",
            get(recovery::reset_page).post(recovery::reset_submit),
        );

    let member_routes = Router::new()
        .route("/Home/Index", get(home::index))
        .route_layer(from_fn_with_state(
            (state.clone(), Policy::Authenticated),
            authorize,
        ));

    let admin_routes = Router::new()
        .route("/Usuarios/Index", get(users::list))
        .route("/Usuarios/Crear", post(users::create))
        .route_layer(from_fn_with_state(
            (state.clone(), Policy::Administradores),
            authorize,
        ));

    let reception_routes = Router::new()
        .route("/Recepcion/Index", get(home::reception))
        .route_layer(from_fn_with_state(
            (state.clone(), Policy::Recepcionistas),
            authorize,
        ));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
        .merge(reception_routes)
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(state.clone(), cache_and_transport_headers))
                .layer(session_layer(&state.config))
                .layer(from_fn_with_state(state.clone(), authenticate))
                .layer(from_fn_with_state(state.clone(), session_timeout)),
        )
        .with_state(state)
}
