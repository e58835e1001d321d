use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    repo::CartSource,
    services::{CONTENT_DISPOSITION, CONTENT_TYPE},
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/recipes/download_shopping_cart", get(download_shopping_cart))
}

/// The report as a `shopping_list.txt` attachment.
pub(crate) async fn shopping_list_attachment(
    source: &dyn CartSource,
    user_id: Uuid,
) -> Result<Response, AppError> {
    let report = super::build_report(source, user_id).await?;
    info!(%user_id, bytes = report.len(), "shopping list downloaded");
    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CONTENT_DISPOSITION),
        ],
        report,
    )
        .into_response())
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, AppError> {
    shopping_list_attachment(&state.db, user_id).await
}
