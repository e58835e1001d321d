pub mod handlers;
mod repo;
mod services;

pub use repo::SlugIndex;
pub use services::{claim_unique_slug, generate_slug, SlugClaim, MAX_SLUG_ATTEMPTS};
