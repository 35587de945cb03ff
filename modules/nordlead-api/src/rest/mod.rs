pub mod companies;
pub mod export;
pub mod integrations;
pub mod models;
pub mod stats;
pub mod sync;

use axum::http::StatusCode;
use tracing::warn;

pub(crate) fn internal_error(err: impl std::fmt::Display) -> StatusCode {
    warn!(error = %err, "Request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
