use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use extractors::{AuthUser, MaybeAuthUser};
pub use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
