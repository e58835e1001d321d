use axum::{
    extract::{DefaultBodyLimit, Multipart, OriginalUri, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{RecipePayload, RecipeShort, RecipeView},
    filters::RecipeQuery,
    repo_types::Recipe,
    services::{
        create_recipe, delete_recipe, full_views, require_author, short_views, update_recipe,
        validate_payload,
    },
};
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::AppError,
    extract::{Path, Query},
    images::{read_multipart_image, ImageError, UploadItem},
    pagination::Paginated,
    relations::{toggle, RelationKind, ToggleAction},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe_json))
        .route(
            "/recipes/upload",
            post(create_recipe_multipart).layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
        .route(
            "/recipes/:id",
            get(get_recipe).patch(patch_recipe).delete(remove_recipe),
        )
        .route("/recipes/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route("/recipes/:id/shopping_cart", post(add_to_cart).delete(remove_from_cart))
}

async fn load_recipe(st: &AppState, id: Uuid) -> Result<Recipe, AppError> {
    Recipe::find_by_id(&st.db, id).await?.ok_or(AppError::NotFound)
}

async fn full_view(st: &AppState, viewer: Option<Uuid>, recipe: Recipe) -> Result<RecipeView, AppError> {
    full_views(st, viewer, vec![recipe])
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

fn created(view: RecipeView) -> Result<(StatusCode, HeaderMap, Json<RecipeView>), AppError> {
    let mut headers = HeaderMap::new();
    let location: HeaderValue = format!("/api/v1/recipes/{}", view.id)
        .parse()
        .map_err(|e| anyhow::anyhow!("location header: {e}"))?;
    headers.insert(header::LOCATION, location);
    Ok((StatusCode::CREATED, headers, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(q): Query<RecipeQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Paginated<RecipeView>>, AppError> {
    let filter = q.to_filter(viewer)?;
    let params = q.page_params();
    let window = params.window(state.config.page_size)?;

    let (recipes, count) = Recipe::list(&state.db, &filter, window).await?;
    let results = full_views(&state, viewer, recipes).await?;
    Ok(Json(params.paginate(
        window,
        count,
        results,
        &state.config.public_base_url,
        uri.path(),
        uri.query(),
    )?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeView>, AppError> {
    let recipe = load_recipe(&state, id).await?;
    Ok(Json(full_view(&state, viewer, recipe).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe_json(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeView>), AppError> {
    let valid = validate_payload(&payload, true, None)?;
    let recipe = create_recipe(&state, user_id, valid).await?;
    created(full_view(&state, Some(user_id), recipe).await?)
}

/// Multipart form: `recipe` is the JSON body without `image`, `image` is the file.
#[instrument(skip(state, mp))]
pub async fn create_recipe_multipart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<RecipeView>), AppError> {
    let mut payload: Option<RecipePayload> = None;
    let mut image: Option<Result<UploadItem, ImageError>> = None;

    while let Some(field) = mp.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("recipe") => {
                let raw = field.bytes().await?;
                let parsed = serde_json::from_slice(&raw)
                    .map_err(|e| AppError::field("recipe", format!("Invalid JSON: {e}.")))?;
                payload = Some(parsed);
            }
            Some("image") => image = Some(read_multipart_image(field).await?),
            other => warn!(field = ?other, "ignoring unexpected multipart field"),
        }
    }

    let mut payload = payload.ok_or_else(|| AppError::field("recipe", "This field is required."))?;
    // the file part wins over an inline data URI
    if image.is_some() {
        payload.image = None;
    }
    let valid = validate_payload(&payload, true, image)?;
    let recipe = create_recipe(&state, user_id, valid).await?;
    created(full_view(&state, Some(user_id), recipe).await?)
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeView>, AppError> {
    let current = load_recipe(&state, id).await?;
    require_author(&current, user_id)?;
    let valid = validate_payload(&payload, false, None)?;
    let recipe = update_recipe(&state, current, valid).await?;
    Ok(Json(full_view(&state, Some(user_id), recipe).await?))
}

#[instrument(skip(state))]
pub async fn remove_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let recipe = load_recipe(&state, id).await?;
    require_author(&recipe, user_id)?;
    delete_recipe(&state, recipe).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    st: &AppState,
    kind: RelationKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    let recipe = load_recipe(st, id).await?;
    toggle(&st.db, kind, user_id, recipe.id, ToggleAction::Add).await?;
    let view = short_views(st, vec![recipe])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn remove_relation(
    st: &AppState,
    kind: RelationKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<StatusCode, AppError> {
    let recipe = load_recipe(st, id).await?;
    toggle(&st.db, kind, user_id, recipe.id, ToggleAction::Remove).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    add_relation(&state, RelationKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    remove_relation(&state, RelationKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    add_relation(&state, RelationKind::ShoppingCart, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    remove_relation(&state, RelationKind::ShoppingCart, user_id, id).await
}
