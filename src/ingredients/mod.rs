pub mod handlers;
mod repo;

pub use repo::Ingredient;
