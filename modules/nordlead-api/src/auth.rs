use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const COOKIE_NAME: &str = "nl_session";
const SESSION_DURATION_SECS: i64 = 7 * 24 * 3600; // 7 days

/// Authenticated admin session. Extract this in handlers that require auth;
/// API handlers get a plain 401 when the cookie is missing or invalid.
/// Page handlers take `Option<AdminSession>` and redirect themselves.
pub struct AdminSession;

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if let Some(value) = parse_cookie(cookie_header, COOKIE_NAME) {
            if verify_session(&value, state.config.session_secret()) {
                return Ok(AdminSession);
            }
        }

        Err(StatusCode::UNAUTHORIZED.into_response())
    }
}

/// Create a signed session cookie value: `admin|expiry|signature`.
pub fn create_session(secret: &str) -> String {
    let expiry = chrono::Utc::now().timestamp() + SESSION_DURATION_SECS;
    let payload = format!("admin|{expiry}");
    let sig = sign(&payload, secret);
    format!("{payload}|{sig}")
}

/// Build the Set-Cookie header value.
/// In release builds, adds `Secure` to prevent transmission over HTTP.
pub fn session_cookie(secret: &str) -> String {
    let value = create_session(secret);
    let secure = if cfg!(debug_assertions) { "" } else { "; Secure" };
    format!(
        "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_DURATION_SECS}{secure}"
    )
}

/// Build a Set-Cookie header that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verify a session cookie value: signature and expiry.
fn verify_session(value: &str, secret: &str) -> bool {
    let parts: Vec<&str> = value.splitn(3, '|').collect();
    if parts.len() != 3 {
        return false;
    }
    let (subject, expiry_str, sig) = (parts[0], parts[1], parts[2]);

    let payload = format!("{subject}|{expiry_str}");
    if sign(&payload, secret) != sig {
        return false;
    }

    let Ok(expiry) = expiry_str.parse::<i64>() else {
        return false;
    };
    chrono::Utc::now().timestamp() < expiry
}

/// Cookie-header check for page handlers, which redirect to the login page
/// instead of answering 401.
pub fn has_session(headers: &axum::http::HeaderMap, secret: &str) -> bool {
    let cookie_header = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    parse_cookie(cookie_header, COOKIE_NAME)
        .map(|value| verify_session(&value, secret))
        .unwrap_or(false)
}

fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
