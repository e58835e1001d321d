use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{RecipeIngredientView, RecipePayload, RecipeShort, RecipeView},
    repo_types::{IngredientAmount, Recipe, RecipeFields, RecipeIngredientRow},
};
use crate::{
    error::{AppError, Validator},
    images::{self, decode_data_uri, image_url, ImageError, UploadItem},
    ingredients::Ingredient,
    shortlinks::{claim_unique_slug, SlugClaim},
    state::AppState,
    users::{public_users, PublicUser, User},
};

pub const MAX_NAME_LEN: usize = 256;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Payload that passed validation; `None` means "keep the current value".
#[derive(Debug)]
pub struct ValidRecipe {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Vec<IngredientAmount>,
    pub image: Option<UploadItem>,
}

fn positive_i32(v: &mut Validator, field: &str, value: i64, too_small: &str) -> Option<i32> {
    if value < 1 {
        v.add(field, too_small);
        return None;
    }
    match i32::try_from(value) {
        Ok(n) => Some(n),
        Err(_) => {
            v.add(field, format!("Ensure this value is less than or equal to {}.", i32::MAX));
            None
        }
    }
}

fn text_field(v: &mut Validator, field: &str, value: Option<&str>, required: bool, max: Option<usize>) -> Option<String> {
    let Some(raw) = value else {
        if required {
            v.add(field, REQUIRED);
        }
        return None;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        v.add(field, BLANK);
        return None;
    }
    if let Some(max) = max {
        if trimmed.chars().count() > max {
            v.add(field, format!("Ensure this field has no more than {max} characters."));
            return None;
        }
    }
    Some(trimmed.to_string())
}

/// Field-level validation shared by create (`creating = true`) and update.
///
/// `file_image` carries an image that arrived as a multipart file; when
/// absent, `payload.image` is decoded as a data URI.
pub fn validate_payload(
    payload: &RecipePayload,
    creating: bool,
    file_image: Option<Result<UploadItem, ImageError>>,
) -> Result<ValidRecipe, AppError> {
    let mut v = Validator::new();

    let mut ingredients = Vec::new();
    match payload.ingredients.as_deref() {
        None => v.add("ingredients", REQUIRED),
        Some([]) => v.add("ingredients", "Ingredients cannot be empty."),
        Some(items) => {
            let mut seen = HashSet::new();
            let mut repeated = false;
            for item in items {
                repeated |= !seen.insert(item.id);
                if let Some(amount) =
                    positive_i32(&mut v, "ingredients", item.amount, "Amount should be at least 1.")
                {
                    ingredients.push(IngredientAmount { id: item.id, amount });
                }
            }
            if repeated {
                v.add("ingredients", "Ingredients cannot repeat.");
            }
        }
    }

    let name = text_field(&mut v, "name", payload.name.as_deref(), creating, Some(MAX_NAME_LEN));
    let text = text_field(&mut v, "text", payload.text.as_deref(), creating, None);

    let cooking_time = match payload.cooking_time {
        Some(t) => positive_i32(&mut v, "cooking_time", t, "Cooking time should be at least 1."),
        None => {
            if creating {
                v.add("cooking_time", REQUIRED);
            }
            None
        }
    };

    let image = match (file_image, payload.image.as_deref()) {
        (Some(Ok(img)), _) => Some(img),
        (Some(Err(e)), _) => {
            v.add("image", e.to_string());
            None
        }
        (None, Some(raw)) => match decode_data_uri(raw) {
            Ok(img) => Some(img),
            Err(e) => {
                v.add("image", e.to_string());
                None
            }
        },
        (None, None) => {
            if creating {
                v.add("image", REQUIRED);
            }
            None
        }
    };

    v.finish()?;
    Ok(ValidRecipe {
        name,
        text,
        cooking_time,
        ingredients,
        image,
    })
}

/// Fails on the first referenced ingredient missing from the catalog.
pub async fn ensure_ingredients_exist(st: &AppState, items: &[IngredientAmount]) -> Result<(), AppError> {
    let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let existing: HashSet<Uuid> = Ingredient::existing_ids(&st.db, &ids).await?.into_iter().collect();
    match first_missing(&ids, &existing) {
        Some(id) => Err(AppError::BadRequest(format!(
            "Ingredient with id {id} does not exist."
        ))),
        None => Ok(()),
    }
}

fn first_missing(ids: &[Uuid], existing: &HashSet<Uuid>) -> Option<Uuid> {
    ids.iter().copied().find(|id| !existing.contains(id))
}

pub fn require_author(recipe: &Recipe, user_id: Uuid) -> Result<(), AppError> {
    if recipe.author_id == user_id {
        Ok(())
    } else {
        warn!(recipe_id = %recipe.id, %user_id, "non-author tried to modify recipe");
        Err(AppError::Forbidden)
    }
}

/// Inserts the recipe row inside an open transaction under a candidate slug.
struct RecipeInsert<'a, 'c> {
    tx: &'a mut Transaction<'c, Postgres>,
    author: Uuid,
    fields: &'a RecipeFields,
}

#[async_trait]
impl<'a, 'c> SlugClaim for RecipeInsert<'a, 'c> {
    type Output = Recipe;

    async fn try_claim(&mut self, slug: &str) -> anyhow::Result<Option<Recipe>> {
        Recipe::insert_tx(&mut *self.tx, self.author, self.fields, slug).await
    }
}

async fn insert_with_ingredients(
    st: &AppState,
    author: Uuid,
    fields: &RecipeFields,
    items: &[IngredientAmount],
) -> anyhow::Result<Recipe> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let recipe = claim_unique_slug(&mut RecipeInsert {
        tx: &mut tx,
        author,
        fields,
    })
    .await?;

    Recipe::replace_ingredients_tx(&mut tx, recipe.id, items).await?;
    tx.commit().await.context("commit tx")?;
    Ok(recipe)
}

pub async fn create_recipe(st: &AppState, author: Uuid, valid: ValidRecipe) -> Result<Recipe, AppError> {
    ensure_ingredients_exist(st, &valid.ingredients).await?;

    let image_key = match valid.image {
        Some(img) => Some(images::store_image(st, "recipes", img).await?),
        None => None,
    };
    let fields = RecipeFields {
        name: valid.name.ok_or_else(|| AppError::field("name", REQUIRED))?,
        text: valid.text.ok_or_else(|| AppError::field("text", REQUIRED))?,
        cooking_time: valid
            .cooking_time
            .ok_or_else(|| AppError::field("cooking_time", REQUIRED))?,
        image_key,
    };

    match insert_with_ingredients(st, author, &fields, &valid.ingredients).await {
        Ok(recipe) => {
            info!(recipe_id = %recipe.id, %author, slug = %recipe.short_slug, "recipe created");
            Ok(recipe)
        }
        Err(e) => {
            if let Some(key) = fields.image_key.as_deref() {
                images::discard_image(st, key).await;
            }
            Err(e.into())
        }
    }
}

pub async fn update_recipe(st: &AppState, current: Recipe, valid: ValidRecipe) -> Result<Recipe, AppError> {
    ensure_ingredients_exist(st, &valid.ingredients).await?;

    let new_key = match valid.image {
        Some(img) => Some(images::store_image(st, "recipes", img).await?),
        None => None,
    };
    let fields = RecipeFields {
        name: valid.name.unwrap_or(current.name),
        text: valid.text.unwrap_or(current.text),
        cooking_time: valid.cooking_time.unwrap_or(current.cooking_time),
        image_key: new_key.clone().or_else(|| current.image_key.clone()),
    };

    let result = async {
        let mut tx = st.db.begin().await.context("begin tx")?;
        let recipe = Recipe::update_tx(&mut tx, current.id, &fields).await?;
        Recipe::replace_ingredients_tx(&mut tx, current.id, &valid.ingredients).await?;
        tx.commit().await.context("commit tx")?;
        Ok::<_, anyhow::Error>(recipe)
    }
    .await;

    match (&result, new_key.as_deref(), current.image_key.as_deref()) {
        // replaced: the old object is now unreferenced
        (Ok(_), Some(_), Some(old)) => images::discard_image(st, old).await,
        // failed: the new object was never referenced
        (Err(_), Some(new), _) => images::discard_image(st, new).await,
        _ => {}
    }

    let recipe = result?;
    info!(recipe_id = %recipe.id, "recipe updated");
    Ok(recipe)
}

pub async fn delete_recipe(st: &AppState, recipe: Recipe) -> Result<(), AppError> {
    if !Recipe::delete(&st.db, recipe.id).await? {
        return Err(AppError::NotFound);
    }
    if let Some(key) = recipe.image_key.as_deref() {
        images::discard_image(st, key).await;
    }
    info!(recipe_id = %recipe.id, "recipe deleted");
    Ok(())
}

pub async fn short_views(st: &AppState, recipes: Vec<Recipe>) -> Result<Vec<RecipeShort>, AppError> {
    let mut out = Vec::with_capacity(recipes.len());
    for r in recipes {
        out.push(RecipeShort {
            image: image_url(st, r.image_key.as_deref()).await?,
            id: r.id,
            name: r.name,
            cooking_time: r.cooking_time,
        });
    }
    Ok(out)
}

fn group_ingredients(rows: Vec<RecipeIngredientRow>) -> HashMap<Uuid, Vec<RecipeIngredientView>> {
    let mut grouped: HashMap<Uuid, Vec<RecipeIngredientView>> = HashMap::new();
    for row in rows {
        grouped.entry(row.recipe_id).or_default().push(RecipeIngredientView {
            id: row.id,
            name: row.name,
            measurement_unit: row.measurement_unit,
            amount: row.amount,
        });
    }
    grouped
}

/// Full views for a page of recipes, batching author, ingredient and flag lookups.
pub async fn full_views(
    st: &AppState,
    viewer: Option<Uuid>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeView>, AppError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut ingredients = group_ingredients(Recipe::ingredients_for(&st.db, &ids).await?);

    let (favorited, in_cart) = match viewer {
        Some(v) => Recipe::viewer_flags(&st.db, v, &ids).await?,
        None => (HashSet::new(), HashSet::new()),
    };

    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let authors: HashMap<Uuid, PublicUser> =
        public_users(st, viewer, User::find_many(&st.db, &author_ids).await?)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

    let mut out = Vec::with_capacity(recipes.len());
    for r in recipes {
        let author = authors
            .get(&r.author_id)
            .cloned()
            .ok_or_else(|| anyhow!("recipe {} references missing author {}", r.id, r.author_id))?;
        out.push(RecipeView {
            ingredients: ingredients.remove(&r.id).unwrap_or_default(),
            is_favorited: favorited.contains(&r.id),
            is_in_shopping_cart: in_cart.contains(&r.id),
            image: image_url(st, r.image_key.as_deref()).await?,
            author,
            id: r.id,
            name: r.name,
            text: r.text,
            cooking_time: r.cooking_time,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::dto::IngredientAmountInput;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn payload(ingredients: Vec<(Uuid, i64)>) -> RecipePayload {
        RecipePayload {
            ingredients: Some(
                ingredients
                    .into_iter()
                    .map(|(id, amount)| IngredientAmountInput { id, amount })
                    .collect(),
            ),
            image: Some(PNG.into()),
            name: Some("Pancakes".into()),
            text: Some("Mix and fry.".into()),
            cooking_time: Some(20),
        }
    }

    fn errors_of(res: Result<ValidRecipe, AppError>) -> crate::error::FieldErrors {
        match res {
            Err(AppError::Validation(e)) => e,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_create_payload() {
        let id = Uuid::new_v4();
        let valid = validate_payload(&payload(vec![(id, 3)]), true, None).unwrap();
        assert_eq!(valid.ingredients, vec![IngredientAmount { id, amount: 3 }]);
        assert_eq!(valid.name.as_deref(), Some("Pancakes"));
        assert_eq!(valid.cooking_time, Some(20));
        assert_eq!(valid.image.unwrap().ext, "png");
    }

    #[test]
    fn zero_ingredients_rejected() {
        let errors = errors_of(validate_payload(&payload(vec![]), true, None));
        assert_eq!(errors["ingredients"], vec!["Ingredients cannot be empty."]);
    }

    #[test]
    fn missing_ingredients_rejected_on_update_too() {
        let p = RecipePayload {
            ingredients: None,
            ..payload(vec![])
        };
        let errors = errors_of(validate_payload(&p, false, None));
        assert_eq!(errors["ingredients"], vec![REQUIRED]);
    }

    #[test]
    fn duplicate_ingredient_rejected() {
        let id = Uuid::new_v4();
        let errors = errors_of(validate_payload(&payload(vec![(id, 1), (id, 2)]), true, None));
        assert_eq!(errors["ingredients"], vec!["Ingredients cannot repeat."]);
    }

    #[test]
    fn non_positive_amount_and_cooking_time_rejected() {
        let mut p = payload(vec![(Uuid::new_v4(), 0)]);
        p.cooking_time = Some(0);
        let errors = errors_of(validate_payload(&p, true, None));
        assert_eq!(errors["ingredients"], vec!["Amount should be at least 1."]);
        assert_eq!(errors["cooking_time"], vec!["Cooking time should be at least 1."]);
    }

    #[test]
    fn create_requires_every_field() {
        let p = RecipePayload {
            ingredients: Some(vec![IngredientAmountInput {
                id: Uuid::new_v4(),
                amount: 1,
            }]),
            ..Default::default()
        };
        let errors = errors_of(validate_payload(&p, true, None));
        for field in ["name", "text", "cooking_time", "image"] {
            assert_eq!(errors[field], vec![REQUIRED], "{field}");
        }
    }

    #[test]
    fn update_keeps_omitted_fields() {
        let mut p = payload(vec![(Uuid::new_v4(), 1)]);
        p.name = None;
        p.image = None;
        p.cooking_time = None;
        let valid = validate_payload(&p, false, None).unwrap();
        assert!(valid.name.is_none());
        assert!(valid.image.is_none());
        assert!(valid.cooking_time.is_none());
    }

    #[test]
    fn blank_and_overlong_names() {
        let mut p = payload(vec![(Uuid::new_v4(), 1)]);
        p.name = Some("   ".into());
        assert_eq!(errors_of(validate_payload(&p, true, None))["name"], vec![BLANK]);

        p.name = Some("x".repeat(MAX_NAME_LEN + 1));
        assert!(errors_of(validate_payload(&p, true, None))["name"][0].contains("256"));
    }

    #[test]
    fn multipart_image_takes_precedence_and_reports_errors() {
        let mut p = payload(vec![(Uuid::new_v4(), 1)]);
        p.image = None;
        let errors = errors_of(validate_payload(
            &p,
            true,
            Some(Err(ImageError::UnsupportedType("text/plain".into()))),
        ));
        assert!(errors["image"][0].contains("text/plain"));
    }

    #[test]
    fn first_missing_follows_request_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = HashSet::from([a]);
        assert_eq!(first_missing(&[a, c, b], &existing), Some(c));
        assert_eq!(first_missing(&[a], &existing), None);
    }

    #[test]
    fn only_author_may_modify() {
        let author = Uuid::new_v4();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            author_id: author,
            name: "n".into(),
            image_key: None,
            text: "t".into(),
            cooking_time: 1,
            short_slug: "abcdEFG1".into(),
            published_at: time::OffsetDateTime::now_utc(),
        };
        assert!(require_author(&recipe, author).is_ok());
        assert!(matches!(
            require_author(&recipe, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn ingredients_grouped_per_recipe() {
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        let row = |recipe_id, name: &str| RecipeIngredientRow {
            recipe_id,
            id: Uuid::new_v4(),
            name: name.into(),
            measurement_unit: "g".into(),
            amount: 1,
        };
        let grouped = group_ingredients(vec![row(r1, "Flour"), row(r2, "Salt"), row(r1, "Sugar")]);
        assert_eq!(grouped[&r1].len(), 2);
        assert_eq!(grouped[&r2][0].name, "Salt");
    }
}
