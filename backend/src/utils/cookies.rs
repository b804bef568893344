use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lax" => Some(SameSite::Lax),
            "strict" => Some(SameSite::Strict),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secure: config.cookie_secure,
            same_site: config.cookie_same_site,
        }
    }
}

pub const AUTH_COOKIE_PATH: &str = "/";

pub fn build_auth_cookie(name: &str, value: &str, max_age: Duration, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        AUTH_COOKIE_PATH,
        max_age.as_secs(),
        options.same_site.as_str()
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(name: &str, options: CookieOptions) -> String {
    build_auth_cookie(name, "", Duration::ZERO, options)
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}
