use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::services::CartLine;

/// Source of ingredient rows for every recipe in a user's cart.
#[async_trait]
pub trait CartSource: Send + Sync {
    async fn cart_lines(&self, user_id: Uuid) -> anyhow::Result<Vec<CartLine>>;
}

#[async_trait]
impl CartSource for PgPool {
    async fn cart_lines(&self, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT i.name, i.measurement_unit, ri.amount
              FROM shopping_cart sc
              JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
              JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE sc.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(self)
        .await
        .context("load shopping cart lines")?;
        Ok(rows)
    }
}
