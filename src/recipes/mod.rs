//! Recipe publishing: listing with relationship filters, full and short
//! views, and author-only create/update/delete.

mod dto;
mod filters;
pub mod handlers;
mod repo;
mod repo_types;
mod services;

pub use dto::RecipeShort;
pub use repo_types::Recipe;
pub(crate) use services::short_views;
