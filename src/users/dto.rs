use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recipes::RecipeShort;

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

/// Followed author with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct UserWithRecipes {
    #[serde(flatten)]
    pub user: PublicUser,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimit {
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}
