use axum::{
    extract::{DefaultBodyLimit, Multipart, OriginalUri, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AvatarRequest, AvatarResponse, PublicUser, RecipesLimit, SetPasswordRequest,
        SubscriptionsQuery, UserWithRecipes,
    },
    repo_types::User,
    services::{public_user, public_users, recipes_limit, with_recipes},
};
use crate::{
    auth::{
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        AuthUser, MaybeAuthUser,
    },
    error::AppError,
    extract::{Path, Query},
    images::{self, decode_data_uri, read_multipart_image, UploadItem},
    pagination::{LimitOffsetParams, Paginated},
    relations::{toggle, RelationKind, ToggleAction},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/set_password", post(set_password))
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id", get(get_user))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
        .route(
            "/users/me/avatar",
            put(put_avatar_base64).delete(delete_avatar),
        )
        .route(
            "/users/me/avatar/upload",
            put(put_avatar_multipart).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
}

async fn load_user(st: &AppState, id: Uuid) -> Result<User, AppError> {
    User::find_by_id(&st.db, id).await?.ok_or(AppError::NotFound)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(p): Query<LimitOffsetParams>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Paginated<PublicUser>>, AppError> {
    let window = p.window(state.config.page_size);
    let (users, count) = User::list(&state.db, window).await?;
    let results = public_users(&state, viewer, users).await?;
    Ok(Json(LimitOffsetParams::paginate(
        window,
        count,
        results,
        &state.config.public_base_url,
        uri.path(),
        uri.query(),
    )))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token for missing user");
        AppError::Unauthorized("User not found".into())
    })?;
    Ok(Json(public_user(&state, Some(user_id), user).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let user = load_user(&state, id).await?;
    Ok(Json(public_user(&state, viewer, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let user = load_user(&state, user_id).await?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(%user_id, "set_password with wrong current password");
        return Err(AppError::field("current_password", "Invalid password."));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::field(
            "new_password",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }

    let hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionsQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Paginated<UserWithRecipes>>, AppError> {
    let limit = recipes_limit(q.recipes_limit)?;
    let window = LimitOffsetParams {
        limit: q.limit,
        offset: q.offset,
    }
    .window(state.config.page_size);

    let (authors, count) = User::list_subscriptions(&state.db, user_id, window).await?;
    let results = with_recipes(&state, Some(user_id), authors, limit).await?;
    Ok(Json(LimitOffsetParams::paginate(
        window,
        count,
        results,
        &state.config.public_base_url,
        uri.path(),
        uri.query(),
    )))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(q): Query<RecipesLimit>,
) -> Result<(StatusCode, Json<UserWithRecipes>), AppError> {
    let limit = recipes_limit(q.recipes_limit)?;
    // self-subscription is rejected by toggle whether or not the id exists
    let author = if author_id == user_id {
        None
    } else {
        Some(load_user(&state, author_id).await?)
    };

    toggle(&state.db, RelationKind::Subscription, user_id, author_id, ToggleAction::Add).await?;

    let author = author.ok_or(AppError::NotFound)?;
    let mut views = with_recipes(&state, Some(user_id), vec![author], limit).await?;
    let view = views.pop().ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if author_id != user_id {
        load_user(&state, author_id).await?;
    }
    toggle(&state.db, RelationKind::Subscription, user_id, author_id, ToggleAction::Remove).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_avatar(
    st: &AppState,
    user_id: Uuid,
    img: UploadItem,
) -> Result<Json<AvatarResponse>, AppError> {
    let user = load_user(st, user_id).await?;
    let key = images::store_image(st, "avatars", img).await?;
    User::set_avatar(&st.db, user_id, Some(&key)).await?;
    if let Some(old) = user.avatar_key.as_deref() {
        images::discard_image(st, old).await;
    }
    info!(%user_id, %key, "avatar updated");
    Ok(Json(AvatarResponse {
        avatar: images::image_url(st, Some(&key)).await?,
    }))
}

#[instrument(skip(state, payload))]
pub async fn put_avatar_base64(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AvatarRequest>,
) -> Result<Json<AvatarResponse>, AppError> {
    let raw = payload
        .avatar
        .ok_or_else(|| AppError::field("avatar", "This field is required."))?;
    let img = decode_data_uri(&raw).map_err(|e| AppError::field("avatar", e.to_string()))?;
    replace_avatar(&state, user_id, img).await
}

#[instrument(skip(state, mp))]
pub async fn put_avatar_multipart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    while let Some(field) = mp.next_field().await? {
        if field.name() == Some("avatar") {
            let img = read_multipart_image(field)
                .await?
                .map_err(|e| AppError::field("avatar", e.to_string()))?;
            return replace_avatar(&state, user_id, img).await;
        }
    }
    Err(AppError::field("avatar", "This field is required."))
}

#[instrument(skip(state))]
pub async fn delete_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AppError> {
    let user = load_user(&state, user_id).await?;
    let key = user.avatar_key.ok_or(AppError::NotFound)?;
    User::set_avatar(&state.db, user_id, None).await?;
    images::discard_image(&state, &key).await;
    info!(%user_id, "avatar removed");
    Ok(StatusCode::NO_CONTENT)
}
