#![forbid(unsafe_code)]

pub mod error;
pub mod extract;
mod routes;
pub mod state;

use axum::Router;

pub use error::ApiError;
pub use extract::{AdminUser, AuthUser};
pub use state::ApiState;

/// The platform's JSON API under `/api`.
#[must_use]
pub fn router(state: ApiState) -> Router {
    Router::new()
        .merge(routes::auth::router())
        .merge(routes::writing::router())
        .merge(routes::essays::router())
        .merge(routes::reading::router())
        .merge(routes::prompts::router())
        .with_state(state)
}
