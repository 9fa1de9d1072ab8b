pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod shopping;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};

// Recipe images arrive inline as base64.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    handlers::routes().layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
