use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image_key: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub short_slug: String,
    pub published_at: OffsetDateTime,
}

/// A recipe's ingredient joined with the catalog entry.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeIngredientRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Column values written on insert or update.
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image_key: Option<String>,
}

/// List filters already resolved against the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// (viewer, wanted)
    pub favorited: Option<(Uuid, bool)>,
    pub in_cart: Option<(Uuid, bool)>,
}
