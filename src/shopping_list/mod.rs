//! Aggregated shopping list for the recipes in a user's cart.

pub mod handlers;
mod repo;
mod services;

pub use repo::CartSource;
pub use services::{aggregate, render, CartLine, IngredientTotal, EMPTY_CART};

use uuid::Uuid;

/// Loads the cart and renders the plain-text report.
pub async fn build_report<C>(source: &C, user_id: Uuid) -> anyhow::Result<String>
where
    C: CartSource + ?Sized,
{
    let lines = source.cart_lines(user_id).await?;
    let totals = aggregate(lines);
    tracing::debug!(%user_id, groups = totals.len(), "shopping list aggregated");
    Ok(render(&totals))
}
