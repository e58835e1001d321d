use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use tracing::warn;

pub const SLUG_LEN: usize = 8;

/// How many fresh slugs to try before giving up on a unique-index collision.
pub const MAX_SLUG_ATTEMPTS: usize = 5;

pub fn generate_slug() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

/// One attempt at persisting a row under `slug`; `None` means the slug was taken.
#[async_trait]
pub trait SlugClaim: Send {
    type Output: Send;

    async fn try_claim(&mut self, slug: &str) -> anyhow::Result<Option<Self::Output>>;
}

/// Retries `claim` with fresh slugs until one is free.
pub async fn claim_unique_slug<C: SlugClaim>(claim: &mut C) -> anyhow::Result<C::Output> {
    for _ in 0..MAX_SLUG_ATTEMPTS {
        let slug = generate_slug();
        if let Some(out) = claim.try_claim(&slug).await? {
            return Ok(out);
        }
        warn!(%slug, "short slug collision, retrying");
    }
    anyhow::bail!("could not allocate a unique short slug in {MAX_SLUG_ATTEMPTS} attempts")
}

pub fn short_link_url(base_url: &str, slug: &str) -> String {
    format!("{}/s/{}/", base_url, slug)
}

pub fn recipe_path(recipe_id: uuid::Uuid) -> String {
    format!("/api/v1/recipes/{}", recipe_id)
}
