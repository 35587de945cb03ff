//! Server-rendered pages: login and the dashboard.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::warn;

use crate::auth;
use crate::components::{render_dashboard, render_login};
use crate::rest::internal_error;
use crate::AppState;

/// Max login attempts per IP per hour.
const AUTH_RATE_LIMIT_PER_HOUR: usize = 10;

#[derive(Deserialize)]
pub struct LoginForm {
    password: String,
}

pub async fn login_page() -> impl IntoResponse {
    Html(render_login(None))
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    Form(form): Form<LoginForm>,
) -> Response {
    {
        let mut limiter = state.rate_limiter.lock().await;
        let entries = limiter.entry(addr.ip()).or_default();
        if !check_rate_limit(entries, Instant::now(), AUTH_RATE_LIMIT_PER_HOUR) {
            return Html(render_login(Some(
                "Too many attempts. Try again later.".to_string(),
            )))
            .into_response();
        }
    }

    if form.password != state.config.admin_password {
        warn!(ip = %addr.ip(), "Rejected login attempt");
        return Html(render_login(Some("Wrong password.".to_string()))).into_response();
    }

    (
        [(
            header::SET_COOKIE,
            auth::session_cookie(state.config.session_secret()),
        )],
        Redirect::to("/dashboard"),
    )
        .into_response()
}

pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !auth::has_session(&headers, state.config.session_secret()) {
        return Redirect::to("/login").into_response();
    }

    let stats = match state.catalog.dashboard_stats().await {
        Ok(stats) => stats,
        Err(err) => return internal_error(err).into_response(),
    };
    let top = match state.catalog.list_companies(&Default::default(), 10, 0).await {
        Ok(page) => page,
        Err(err) => return internal_error(err).into_response(),
    };

    Html(render_dashboard(&stats, &top.companies)).into_response()
}

/// Sliding one-hour window per IP.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, limit_per_hour: usize) -> bool {
    entries.retain(|t| now.duration_since(*t).as_secs() < 3600);
    if entries.len() >= limit_per_hour {
        return false;
    }
    entries.push(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_caps_per_window() {
        let mut entries = Vec::new();
        let now = Instant::now();
        for _ in 0..AUTH_RATE_LIMIT_PER_HOUR {
            assert!(check_rate_limit(&mut entries, now, AUTH_RATE_LIMIT_PER_HOUR));
        }
        assert!(!check_rate_limit(&mut entries, now, AUTH_RATE_LIMIT_PER_HOUR));
    }
}
