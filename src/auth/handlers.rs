use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
};
use crate::{
    error::{is_unique_violation, AppError, Validator},
    state::AppState,
    users::{check_profile, is_valid_email, public_user, NewUser, User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<(String, String), AppError> {
    let keys = JwtKeys::from_ref(state);
    Ok((keys.sign_access(user_id)?, keys.sign_refresh(user_id)?))
}

pub(crate) fn validate_registration(payload: &RegisterRequest) -> Result<(), AppError> {
    let mut v = Validator::new();
    if payload.email.is_empty() {
        v.add("email", "This field may not be blank.");
    } else {
        v.check(is_valid_email(&payload.email), "email", "Enter a valid email address.");
    }
    check_profile(&mut v, &payload.username, &payload.first_name, &payload.last_name);
    v.check(
        payload.password.len() >= MIN_PASSWORD_LEN,
        "password",
        "This password is too short. It must contain at least 8 characters.",
    );
    v.finish()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    validate_registration(&payload)?;

    let (email_taken, username_taken) =
        User::taken(&state.db, &payload.email, &payload.username).await?;
    let mut v = Validator::new();
    v.check(!email_taken, "email", "A user with that email already exists.");
    v.check(!username_taken, "username", "A user with that username already exists.");
    if let Err(e) = v.finish() {
        warn!(email = %payload.email, username = %payload.username, "registration conflict");
        return Err(e);
    }

    let hash = hash_password(&payload.password)?;
    let new = NewUser {
        email: &payload.email,
        username: &payload.username,
        first_name: payload.first_name.trim(),
        last_name: payload.last_name.trim(),
        password_hash: &hash,
    };
    let user = match User::create(&state.db, &new).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::field("email", "A user with that email or username already exists."));
        }
        Err(e) => return Err(e.into()),
    };

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: public_user(&state, None, user).await?,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let invalid = || AppError::Unauthorized("Invalid credentials provided.".into());

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, Some(user.id), user).await?,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, Some(user.id), user).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Ann".into(),
            last_name: "Cook".into(),
            password: "long-enough-pw".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&request()).is_ok());
    }

    #[test]
    fn registration_errors_are_field_scoped() {
        let payload = RegisterRequest {
            email: "nope".into(),
            password: "short".into(),
            ..request()
        };
        let Err(AppError::Validation(errors)) = validate_registration(&payload) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["email", "password"]);
    }

    #[test]
    fn missing_fields_default_to_blank() {
        let payload: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        let Err(AppError::Validation(errors)) = validate_registration(&payload) else {
            panic!("expected validation error");
        };
        for field in ["username", "first_name", "last_name", "password"] {
            assert!(errors.contains_key(field), "{field} should be reported");
        }
    }
}
