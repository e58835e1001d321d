use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::repo::Ingredient;
use crate::{
    error::AppError,
    extract::{Path, Query},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    #[serde(default)]
    pub name: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    Ok(Json(Ingredient::search(&state.db, q.name.trim()).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ingredient>, AppError> {
    Ingredient::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}
