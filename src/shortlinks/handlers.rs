use axum::{
    extract::State,
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    repo::SlugIndex,
    services::{recipe_path, short_link_url},
};
use crate::{error::AppError, extract::Path, recipes::Recipe, state::AppState};

#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

/// Mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/recipes/:id/get-link", get(get_link))
}

/// Mounted at the root.
pub fn redirect_routes() -> Router<AppState> {
    Router::new()
        .route("/s/:slug", get(follow))
        .route("/s/:slug/", get(follow))
}

#[instrument(skip(state))]
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShortLinkResponse>, AppError> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(ShortLinkResponse {
        short_link: short_link_url(&state.config.public_base_url, &recipe.short_slug),
    }))
}

/// Temporary redirect to the recipe detail path, or 404 for an unknown slug.
pub(crate) async fn resolve(index: &dyn SlugIndex, slug: &str) -> Result<Redirect, AppError> {
    let recipe_id = index
        .recipe_for_slug(slug)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(%slug, %recipe_id, "short link resolved");
    Ok(Redirect::temporary(&recipe_path(recipe_id)))
}

#[instrument(skip(state))]
pub async fn follow(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Redirect, AppError> {
    resolve(&state.db, &slug).await
}
