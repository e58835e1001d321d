use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::recipes::Recipe;

/// Resolves a short slug to the recipe it points at.
#[async_trait]
pub trait SlugIndex: Send + Sync {
    async fn recipe_for_slug(&self, slug: &str) -> anyhow::Result<Option<Uuid>>;
}

#[async_trait]
impl SlugIndex for PgPool {
    async fn recipe_for_slug(&self, slug: &str) -> anyhow::Result<Option<Uuid>> {
        Recipe::id_by_slug(self, slug).await
    }
}
