//! Short AI reflections and next-week suggestions for journal entries.

use crate::state::AppState;
use axum::Router;

pub mod client;
pub mod dto;
pub mod fallback;
pub mod handlers;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::ai_routes()
}
