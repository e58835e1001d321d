use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::PublicUser;

/// Compact representation used in favorites/cart responses and author previews.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub author: PublicUser,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    pub id: Uuid,
    pub amount: i64,
}

/// Body of create and update. Every field is optional at the wire level so
/// missing ones come back as field errors rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub ingredients: Option<Vec<IngredientAmountInput>>,
    /// `data:image/<ext>;base64,...`
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}
