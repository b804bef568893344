//! Server-rendered HTML pages.

use axum::{http::StatusCode, response::Html};

use crate::middleware::auth::Principal;
use crate::models::user::{Role, User};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, principal: Option<&Principal>, body: &str) -> Html<String> {
    let nav = match principal {
        Some(p) => format!(
            r#"<nav><span>{} ({})</span>
<form method="post" action="/Inicio/CerrarSesion"><button type="submit">Cerrar sesión</button></form></nav>"#,
            escape(&p.name),
            escape(&p.role)
        ),
        None => String::new(),
    };
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{title} - Glamping Addventure</title>
<link rel="stylesheet" href="/css/site.css">
</head>
<body>
<header><h1>Glamping Addventure</h1>{nav}</header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

fn message_list(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", escape(m)))
        .collect();
    format!(r#"<ul class="errores">{items}</ul>"#)
}

pub fn error_page(status: StatusCode, messages: &[String]) -> Html<String> {
    let body = format!(
        "<h2>Error {}</h2>{}<p><a href=\"/\">Volver al inicio</a></p>",
        status.as_u16(),
        message_list(messages)
    );
    layout("Error", None, &body)
}

pub fn login_page(messages: &[String], email: &str, return_url: Option<&str>) -> Html<String> {
    let return_field = return_url
        .map(|url| format!(r#"<input type="hidden" name="ReturnUrl" value="{}">"#, escape(url)))
        .unwrap_or_default();
    let body = format!(
        r#"<h2>Iniciar sesión</h2>
{errors}
<form method="post" action="/Inicio/IniciarSesion">
{return_field}
<label>Correo <input type="email" name="correo" value="{email}" required></label>
<label>Contraseña <input type="password" name="clave" required></label>
<button type="submit">Ingresar</button>
</form>
<p><a href="/Recuperacion/SolicitarRecuperacion">¿Olvidaste tu contraseña?</a></p>"#,
        errors = message_list(messages),
        email = escape(email),
    );
    layout("Iniciar sesión", None, &body)
}

pub fn home_page(principal: &Principal) -> Html<String> {
    let mut links = Vec::new();
    if principal.is_in_role(Role::Administrador) {
        links.push(r#"<li><a href="/Usuarios/Index">Usuarios</a></li>"#);
    }
    if principal.is_in_role(Role::Recepcionista) {
        links.push(r#"<li><a href="/Recepcion/Index">Recepción</a></li>"#);
    }
    let body = format!(
        "<h2>Bienvenido, {}</h2><ul>{}</ul>",
        escape(&principal.name),
        links.concat()
    );
    layout("Inicio", Some(principal), &body)
}

pub fn reception_page(principal: &Principal, local_now: &str) -> Html<String> {
    let body = format!(
        "<h2>Recepción</h2><p>Turno de {} &middot; {}</p>",
        escape(&principal.name),
        escape(local_now)
    );
    layout("Recepción", Some(principal), &body)
}

pub fn users_page(principal: &Principal, users: &[User], messages: &[String]) -> Html<String> {
    let rows: String = users
        .iter()
        .map(|user| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&user.name),
                escape(&user.email),
                escape(&user.role_name),
                if user.active { "Activo" } else { "Inactivo" }
            )
        })
        .collect();
    let options: String = Role::ALL
        .iter()
        .map(|role| format!(r#"<option value="{0}">{0}</option>"#, role.as_str()))
        .collect();
    let body = format!(
        r#"<h2>Usuarios</h2>
<table><thead><tr><th>Nombre</th><th>Correo</th><th>Rol</th><th>Estado</th></tr></thead>
<tbody>{rows}</tbody></table>
<h3>Nuevo usuario</h3>
{errors}
<form method="post" action="/Usuarios/Crear">
<label>Nombre <input name="nombre" required></label>
<label>Correo <input type="email" name="correo" required></label>
<label>Contraseña <input type="password" name="clave" required></label>
<label>Rol <select name="rol">{options}</select></label>
<button type="submit">Crear</button>
</form>"#,
        errors = message_list(messages),
    );
    layout("Usuarios", Some(principal), &body)
}

pub fn recovery_request_page(sent: bool, messages: &[String]) -> Html<String> {
    let notice = if sent {
        "<p class=\"aviso\">Si el correo está registrado, recibirás un enlace para restablecer tu contraseña.</p>"
    } else {
        ""
    };
    let body = format!(
        r#"<h2>Recuperar contraseña</h2>
{notice}
{errors}
<form method="post" action="/Recuperacion/SolicitarRecuperacion">
<label>Correo <input type="email" name="correo" required></label>
<button type="submit">Enviar enlace</button>
</form>
<p><a href="/Inicio/IniciarSesion">Volver a iniciar sesión</a></p>"#,
        errors = message_list(messages),
    );
    layout("Recuperar contraseña", None, &body)
}

pub fn reset_password_page(token: &str, messages: &[String]) -> Html<String> {
    let body = format!(
        r#"<h2>Restablecer contraseña</h2>
{errors}
<form method="post" action="/Recuperacion/RestablecerContrasena">
<input type="hidden" name="token" value="{token}">
<label>Nueva contraseña <input type="password" name="clave" required></label>
<label>Confirmar contraseña <input type="password" name="confirmacion" required></label>
<button type="submit">Guardar</button>
</form>"#,
        errors = message_list(messages),
        token = escape(token),
    );
    layout("Restablecer contraseña", None, &body)
}

pub fn reset_link_invalid_page() -> Html<String> {
    layout(
        "Enlace no válido",
        None,
        r#"<h2>Enlace no válido</h2>
<p>El enlace de recuperación expiró o ya fue utilizado.</p>
<p><a href="/Recuperacion/SolicitarRecuperacion">Solicitar un nuevo enlace</a></p>"#,
    )
}

pub fn reset_done_page() -> Html<String> {
    layout(
        "Contraseña actualizada",
        None,
        r#"<h2>Contraseña actualizada</h2>
<p><a href="/Inicio/IniciarSesion">Iniciar sesión</a></p>"#,
    )
}

/// HTML body of the password recovery email.
pub fn recovery_email(name: &str, link: &str, expires_local: &str) -> String {
    format!(
        r#"<p>Hola {name},</p>
<p>Recibimos una solicitud para restablecer la contraseña de tu cuenta en Glamping Addventure.</p>
<p><a href="{link}">Restablecer contraseña</a></p>
<p>El enlace vence el {expires} y solo puede usarse una vez.</p>
<p>Si no solicitaste este cambio, ignora este mensaje.</p>"#,
        name = escape(name),
        link = escape(link),
        expires = escape(expires_local),
    )
}
