use axum::{
    extract::FromRef,
    http::{header, HeaderValue, StatusCode},
};
use axum_test::{
    multipart::{MultipartForm, Part},
    TestServer,
};
use larder::{app::build_app, auth::JwtKeys, state::AppState};
use serde_json::{json, Value};
use uuid::Uuid;

fn server() -> (TestServer, AppState) {
    let state = AppState::fake();
    let server = TestServer::new(build_app(state.clone())).unwrap();
    (server, state)
}

fn bearer(state: &AppState, user_id: Uuid) -> HeaderValue {
    let token = JwtKeys::from_ref(state).sign_access(user_id).unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (server, _) = server();
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn relationship_toggles_require_auth() {
    let (server, _) = server();
    let id = Uuid::new_v4();
    for path in [
        format!("/api/v1/recipes/{id}/favorite"),
        format!("/api/v1/recipes/{id}/shopping_cart"),
        format!("/api/v1/users/{id}/subscribe"),
    ] {
        let response = server.post(&path).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn shopping_list_download_requires_auth() {
    let (server, _) = server();
    let response = server.get("/api/v1/recipes/download_shopping_cart").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (server, _) = server();
    let response = server
        .get("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_boolean_filter_is_a_field_error() {
    let (server, _) = server();
    let response = server.get("/api/v1/recipes?is_favorited=maybe").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["is_favorited"][0],
        "Select a valid choice. maybe is not one of the available choices."
    );
}

#[tokio::test]
async fn page_zero_is_not_found() {
    let (server, _) = server();
    let response = server.get("/api/v1/recipes?page=0").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Not found.");
}

#[tokio::test]
async fn self_subscription_is_rejected() {
    let (server, state) = server();
    let me = Uuid::new_v4();
    for response in [
        server
            .post(&format!("/api/v1/users/{me}/subscribe"))
            .add_header(header::AUTHORIZATION, bearer(&state, me))
            .await,
        server
            .delete(&format!("/api/v1/users/{me}/subscribe"))
            .add_header(header::AUTHORIZATION, bearer(&state, me))
            .await,
    ] {
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["detail"], "Cannot subscribe to yourself.");
    }
}

#[tokio::test]
async fn recipe_without_ingredients_is_rejected() {
    let (server, state) = server();
    let response = server
        .post("/api/v1/recipes")
        .add_header(header::AUTHORIZATION, bearer(&state, Uuid::new_v4()))
        .json(&json!({
            "ingredients": [],
            "name": "Toast",
            "text": "Toast the bread.",
            "cooking_time": 3,
            "image": "data:image/png;base64,iVBORw0KGgo="
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["ingredients"][0], "Ingredients cannot be empty.");
}

#[tokio::test]
async fn recipe_with_repeated_ingredient_is_rejected() {
    let (server, state) = server();
    let ingredient = Uuid::new_v4();
    let response = server
        .post("/api/v1/recipes")
        .add_header(header::AUTHORIZATION, bearer(&state, Uuid::new_v4()))
        .json(&json!({
            "ingredients": [
                {"id": ingredient, "amount": 1},
                {"id": ingredient, "amount": 2}
            ],
            "name": "Toast",
            "text": "Toast the bread.",
            "cooking_time": 3,
            "image": "data:image/png;base64,iVBORw0KGgo="
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["ingredients"][0], "Ingredients cannot repeat.");
}

#[tokio::test]
async fn page_past_the_end_of_i64_is_not_found() {
    let (server, _) = server();
    let response = server.get("/api/v1/recipes?page=9223372036854775807").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Not found.");
}

#[tokio::test]
async fn malformed_path_id_is_a_json_400() {
    let (server, _) = server();
    for path in ["/api/v1/recipes/not-a-uuid", "/api/v1/ingredients/42", "/api/v1/users/me-too"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["detail"].is_string(), "{path}: {body}");
    }
}

#[tokio::test]
async fn malformed_query_is_a_json_400() {
    let (server, _) = server();
    let response = server.get("/api/v1/recipes?author=someone").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["detail"].as_str().is_some_and(|d| d.contains("author")));
}

#[tokio::test]
async fn oversized_avatar_upload_is_413() {
    let (server, state) = server();
    let form = MultipartForm::new().add_part(
        "avatar",
        Part::bytes(vec![0u8; 11 * 1024 * 1024])
            .file_name("big.png")
            .mime_type("image/png"),
    );
    let response = server
        .put("/api/v1/users/me/avatar/upload")
        .add_header(header::AUTHORIZATION, bearer(&state, Uuid::new_v4()))
        .multipart(form)
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert!(body["detail"].is_string());
}
