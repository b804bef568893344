use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    models::user::{Role, User},
    state::AppState,
    utils::{
        cookies::{build_auth_cookie, build_clear_cookie, extract_cookie_value, CookieOptions},
        jwt::{decode_auth_token, encode_auth_token, Claims},
    },
};

/// Identity of a signed-in user, attached to the request by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_in_role(&self, role: Role) -> bool {
        self.role.eq_ignore_ascii_case(role.as_str())
    }

    fn from_claims(claims: Claims) -> Option<Self> {
        Some(Self {
            user_id: claims.sub.parse().ok()?,
            expires_at: claims.expires_at()?,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        })
    }

    fn to_claims(&self, issued_at: DateTime<Utc>, config: &Config) -> Claims {
        Claims::new(
            self.user_id,
            self.name.clone(),
            self.email.clone(),
            self.role.clone(),
            issued_at,
            config.auth_lifetime(),
        )
    }
}

/// Marks a response that already wrote or cleared the auth cookie, so
/// sliding renewal leaves it alone.
#[derive(Debug, Clone, Copy)]
pub struct AuthCookieWritten;

/// Named role requirements applied to route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Authenticated,
    Administradores,
    Recepcionistas,
}

impl Policy {
    pub fn allows(&self, principal: &Principal) -> bool {
        match self {
            Policy::Authenticated => true,
            Policy::Administradores => principal.is_in_role(Role::Administrador),
            Policy::Recepcionistas => principal.is_in_role(Role::Recepcionista),
        }
    }
}

/// Reads the auth cookie and attaches a [`Principal`] when it is valid.
/// Missing, tampered or expired cookies leave the request anonymous.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let now = state.clock.now();
    let principal = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, &state.config.auth_cookie_name))
        .and_then(|token| principal_from_token(&token, &state.config, now));

    let renewal = principal
        .as_ref()
        .filter(|p| state.config.auth_sliding_expiration && needs_renewal(p, now, &state.config))
        .cloned();

    if let Some(principal) = principal {
        request.extensions_mut().insert(principal);
    }

    let mut response = next.run(request).await;

    if let Some(principal) = renewal {
        if response.extensions().get::<AuthCookieWritten>().is_none() {
            match auth_cookie_for(&principal, now, &state.config) {
                Ok(cookie) => {
                    tracing::debug!(user_id = principal.user_id, "Renewing auth cookie");
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                }
                Err(err) => tracing::warn!(error = ?err, "Failed to renew auth cookie"),
            }
        }
    }

    response
}

/// Enforces a [`Policy`]: anonymous callers are sent to the login page,
/// callers lacking the role to the access-denied page.
pub async fn authorize(
    State((state, policy)): State<(AppState, Policy)>,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        return challenge(&state.config, request.uri());
    };
    if !policy.allows(principal) {
        tracing::warn!(
            user_id = principal.user_id,
            role = %principal.role,
            policy = ?policy,
            uri = %request.uri(),
            "Access denied"
        );
        return redirect_found(&state.config.access_denied_path);
    }
    next.run(request).await
}

pub fn principal_from_token(token: &str, config: &Config, now: DateTime<Utc>) -> Option<Principal> {
    let claims = decode_auth_token(token, &config.auth_secret).ok()?;
    if claims.is_expired(now) {
        return None;
    }
    Principal::from_claims(claims)
}

/// Renewal happens once less than half of the cookie lifetime remains.
fn needs_renewal(principal: &Principal, now: DateTime<Utc>, config: &Config) -> bool {
    principal.expires_at - now < config.auth_lifetime() / 2
}

fn auth_cookie_for(
    principal: &Principal,
    now: DateTime<Utc>,
    config: &Config,
) -> anyhow::Result<HeaderValue> {
    let token = encode_auth_token(&principal.to_claims(now, config), &config.auth_secret)?;
    let max_age = config.auth_lifetime().to_std()?;
    let cookie = build_auth_cookie(
        &config.auth_cookie_name,
        &token,
        max_age,
        CookieOptions::from_config(config),
    );
    Ok(HeaderValue::from_str(&cookie)?)
}

/// Issues the auth cookie for `user` and returns the principal it encodes.
pub fn sign_in(
    user: &User,
    now: DateTime<Utc>,
    config: &Config,
) -> anyhow::Result<(Principal, HeaderValue)> {
    let principal = Principal {
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role_name.clone(),
        expires_at: now + config.auth_lifetime(),
    };
    let cookie = auth_cookie_for(&principal, now, config)?;
    Ok((principal, cookie))
}

/// `Set-Cookie` value that removes the auth cookie.
pub fn sign_out_cookie(config: &Config) -> anyhow::Result<HeaderValue> {
    let cookie = build_clear_cookie(&config.auth_cookie_name, CookieOptions::from_config(config));
    Ok(HeaderValue::from_str(&cookie)?)
}

/// Redirect that also signs the principal out.
pub fn sign_out_redirect(config: &Config, location: &str) -> anyhow::Result<Response> {
    Ok(with_auth_cookie(redirect_found(location), sign_out_cookie(config)?))
}

pub fn with_auth_cookie(mut response: Response, cookie: HeaderValue) -> Response {
    response.headers_mut().append(header::SET_COOKIE, cookie);
    response.extensions_mut().insert(AuthCookieWritten);
    response
}

/// `302 Found` to `location`.
pub fn redirect_found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

fn challenge(config: &Config, uri: &Uri) -> Response {
    let return_url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let encoded: String = url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
    redirect_found(&format!("{}?ReturnUrl={}", config.login_path, encoded))
}
