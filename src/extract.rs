//! `Path` and `Query` that reject with the JSON `{"detail": ..}` body instead
//! of axum's plain-text one.

use axum::{
    async_trait,
    extract::{
        rejection::{PathRejection, QueryRejection},
        FromRequestParts,
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub struct Path<T>(pub T);

pub struct Query<T>(pub T);

fn path_error(e: PathRejection) -> AppError {
    if e.status().is_client_error() {
        AppError::BadRequest(e.body_text())
    } else {
        // route/extractor mismatch, not the caller's fault
        AppError::Internal(anyhow::anyhow!("path extraction: {}", e.body_text()))
    }
}

fn query_error(e: QueryRejection) -> AppError {
    AppError::BadRequest(e.body_text())
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Path(value)| Path(value))
            .map_err(path_error)
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Query<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| Query(value))
            .map_err(query_error)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use serde::Deserialize;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Filters {
        limit: Option<i64>,
    }

    #[tokio::test]
    async fn bad_query_is_a_detail_error() {
        let (mut parts, _) = Request::get("/recipes?limit=lots").body(()).unwrap().into_parts();
        let Err(err) = Query::<Filters>::from_request_parts(&mut parts, &()).await else {
            panic!("non-numeric limit must be rejected");
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("limit")));
    }

    #[tokio::test]
    async fn good_query_passes_through() {
        let (mut parts, _) = Request::get("/recipes?limit=5").body(()).unwrap().into_parts();
        let Ok(Query(f)) = Query::<Filters>::from_request_parts(&mut parts, &()).await else {
            panic!("valid query must parse");
        };
        assert_eq!(f.limit, Some(5));
    }

    #[tokio::test]
    async fn path_outside_a_router_is_internal() {
        let (mut parts, _) = Request::get("/recipes/x").body(()).unwrap().into_parts();
        let Err(err) = Path::<Uuid>::from_request_parts(&mut parts, &()).await else {
            panic!("no matched route means no path params");
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
