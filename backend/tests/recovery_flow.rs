use axum::http::StatusCode;
use chrono::Duration;
use glamping_backend::{
    error::AppError,
    models::{recovery_token::ResetPasswordForm, user::Role},
    repositories::{recovery_token as recovery_repo, user as user_repo},
    services::password_recovery::{RecoveryRequestOutcome, RECOVERY_SUBJECT},
    utils::{
        password::verify_password,
        security::{generate_token, hash_token, RECOVERY_TOKEN_LENGTH},
        time::Clock,
    },
};

mod support;

use support::{body_text, get, post_form, test_config, CookieJar, TestApp};

const EMAIL: &str = "isabela@glamping.test";
const OLD_PASSWORD: &str = "Montana2024";
const NEW_PASSWORD: &str = "Cabana2025";

fn secret_from_mail(body: &str) -> String {
    let start = body.find("token=").expect("link in mail") + "token=".len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn reset_form(token: &str, password: &str) -> ResetPasswordForm {
    ResetPasswordForm {
        token: token.to_string(),
        clave: password.to_string(),
        confirmacion: password.to_string(),
    }
}

#[tokio::test]
async fn recovery_token_is_single_use() {
    let Some(pool) = support::test_pool("recovery_token_is_single_use").await else {
        return;
    };
    let _guard = support::db_lock().await;
    support::reset_database(&pool).await;
    let user = support::seed_user(&pool, "Isabela", EMAIL, OLD_PASSWORD, Role::Recepcionista).await;

    let app = TestApp::new(pool.clone(), test_config());
    let outcome = app.state.recovery.request_recovery(EMAIL).await.expect("request");
    assert_eq!(outcome, RecoveryRequestOutcome::Sent);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, EMAIL);
    assert_eq!(sent[0].subject, RECOVERY_SUBJECT);
    assert!(sent[0]
        .body
        .contains("http://glamping.test/Recuperacion/RestablecerContrasena?token="));

    let secret = secret_from_mail(&sent[0].body);
    assert_eq!(secret.len(), RECOVERY_TOKEN_LENGTH);

    let stored = recovery_repo::find_usable_token(&pool, &hash_token(&secret), app.clock.now())
        .await
        .expect("lookup")
        .expect("token stored");
    assert_eq!(stored.user_id, user.id);
    assert_eq!(stored.token_hash.as_deref(), Some(hash_token(&secret).as_str()));
    assert_eq!(stored.expires_at, app.clock.now() + Duration::minutes(60));

    let user_id = app
        .state
        .recovery
        .reset_password(&reset_form(&secret, NEW_PASSWORD))
        .await
        .expect("first reset");
    assert_eq!(user_id, user.id);

    let second = app
        .state
        .recovery
        .reset_password(&reset_form(&secret, "Otra2026clave"))
        .await;
    assert!(matches!(second, Err(AppError::BadRequest(_))));

    let updated = user_repo::find_active_by_email(&pool, EMAIL)
        .await
        .expect("lookup")
        .expect("user");
    assert!(verify_password(NEW_PASSWORD, &updated.password_hash).expect("verify"));
    assert!(!verify_password(OLD_PASSWORD, &updated.password_hash).expect("verify"));
}

#[tokio::test]
async fn expired_recovery_token_is_rejected() {
    let Some(pool) = support::test_pool("expired_recovery_token_is_rejected").await else {
        return;
    };
    let _guard = support::db_lock().await;
    support::reset_database(&pool).await;
    let user = support::seed_user(&pool, "Isabela", EMAIL, OLD_PASSWORD, Role::Recepcionista).await;

    let app = TestApp::new(pool.clone(), test_config());
    let secret = generate_token(RECOVERY_TOKEN_LENGTH);
    recovery_repo::create_recovery_token(
        &pool,
        user.id,
        &hash_token(&secret),
        app.clock.now() + Duration::minutes(60),
    )
    .await
    .expect("create token");

    app.clock.advance(Duration::minutes(61));
    assert!(!app.state.recovery.is_token_usable(&secret).await.expect("check"));
    let result = app
        .state
        .recovery
        .reset_password(&reset_form(&secret, NEW_PASSWORD))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let deleted = recovery_repo::delete_stale_tokens(&pool, app.clock.now())
        .await
        .expect("cleanup");
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn recovery_page_answers_the_same_for_unknown_addresses() {
    let Some(pool) = support::test_pool("recovery_page_answers_the_same_for_unknown_addresses").await else {
        return;
    };
    let _guard = support::db_lock().await;
    support::reset_database(&pool).await;
    support::seed_user(&pool, "Isabela", EMAIL, OLD_PASSWORD, Role::Recepcionista).await;

    let app = TestApp::new(pool, test_config());
    let jar = CookieJar::default();

    let known = app
        .send(post_form(
            "/Recuperacion/SolicitarRecuperacion",
            &jar,
            &[("correo", EMAIL)],
        ))
        .await;
    assert_eq!(known.status(), StatusCode::OK);
    let known_body = body_text(known).await;

    let unknown = app
        .send(post_form(
            "/Recuperacion/SolicitarRecuperacion",
            &jar,
            &[("correo", "nadie@glamping.test")],
        ))
        .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(body_text(unknown).await, known_body);

    assert_eq!(app.mailer.sent().len(), 1);
}

#[tokio::test]
async fn recovery_requests_are_throttled_per_address() {
    let Some(pool) = support::test_pool("recovery_requests_are_throttled_per_address").await else {
        return;
    };
    let _guard = support::db_lock().await;
    support::reset_database(&pool).await;
    support::seed_user(&pool, "Isabela", EMAIL, OLD_PASSWORD, Role::Recepcionista).await;

    let app = TestApp::new(pool, test_config());
    for _ in 0..3 {
        let outcome = app.state.recovery.request_recovery(EMAIL).await.expect("request");
        assert_eq!(outcome, RecoveryRequestOutcome::Sent);
    }
    let outcome = app.state.recovery.request_recovery(EMAIL).await.expect("request");
    assert_eq!(outcome, RecoveryRequestOutcome::Throttled);
    assert_eq!(app.mailer.sent().len(), 3);
}

#[tokio::test]
async fn reset_through_pages_then_sign_in_with_new_password() {
    let Some(pool) = support::test_pool("reset_through_pages_then_sign_in_with_new_password").await else {
        return;
    };
    let _guard = support::db_lock().await;
    support::reset_database(&pool).await;
    support::seed_user(&pool, "Isabela", EMAIL, OLD_PASSWORD, Role::Recepcionista).await;

    let app = TestApp::new(pool, test_config());
    let mut jar = CookieJar::default();
    app.state.recovery.request_recovery(EMAIL).await.expect("request");
    let secret = secret_from_mail(&app.mailer.sent()[0].body);

    let page = app
        .send(get(
            &format!("/Recuperacion/RestablecerContrasena?token={secret}"),
            &jar,
        ))
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains(&secret));

    let mismatch = app
        .send(post_form(
            "/Recuperacion/RestablecerContrasena",
            &jar,
            &[("token", secret.as_str()), ("clave", NEW_PASSWORD), ("confirmacion", "Distinta2025")],
        ))
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(mismatch).await.contains("Las contraseñas no coinciden"));

    let done = app
        .send(post_form(
            "/Recuperacion/RestablecerContrasena",
            &jar,
            &[("token", secret.as_str()), ("clave", NEW_PASSWORD), ("confirmacion", NEW_PASSWORD)],
        ))
        .await;
    assert_eq!(done.status(), StatusCode::OK);
    assert!(body_text(done).await.contains("Contraseña actualizada"));

    let login = app
        .send(post_form(
            "/Inicio/IniciarSesion",
            &jar,
            &[("correo", EMAIL), ("clave", NEW_PASSWORD)],
        ))
        .await;
    assert_eq!(login.status(), StatusCode::FOUND);
    assert_eq!(support::location(&login), "/Home/Index");
    jar.absorb(login.headers());
    assert!(jar.get("glamping_auth").is_some());
}

#[test]
#[should_panic(expected = "recovery_token_is_single_use requires a database")]
fn required_database_is_never_skipped() {
    support::skip_without_database("recovery_token_is_single_use", true);
}

#[test]
fn optional_database_is_skipped_with_a_notice() {
    support::skip_without_database("recovery_token_is_single_use", false);
}
