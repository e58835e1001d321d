use std::collections::HashSet;

use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::repo_types::{IngredientAmount, Recipe, RecipeFields, RecipeFilter, RecipeIngredientRow};
use crate::pagination::Window;

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.image_key, r.text, r.cooking_time, r.short_slug, r.published_at";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &RecipeFilter) {
    qb.push(" WHERE TRUE");
    if let Some(author) = f.author {
        qb.push(" AND r.author_id = ").push_bind(author);
    }
    for (rel, table) in [(f.favorited, "favorites"), (f.in_cart, "shopping_cart")] {
        if let Some((viewer, wanted)) = rel {
            qb.push(if wanted { " AND EXISTS" } else { " AND NOT EXISTS" });
            qb.push(format!(
                " (SELECT 1 FROM {table} j WHERE j.recipe_id = r.id AND j.user_id = "
            ));
            qb.push_bind(viewer).push(")");
        }
    }
}

impl Recipe {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find recipe")?;
        Ok(row)
    }

    pub async fn id_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM recipes WHERE short_slug = $1")
            .bind(slug)
            .fetch_optional(db)
            .await
            .context("resolve short slug")?;
        Ok(id)
    }

    /// Newest first.
    pub async fn list(
        db: &PgPool,
        filter: &RecipeFilter,
        window: Window,
    ) -> anyhow::Result<(Vec<Recipe>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY r.published_at DESC, r.id LIMIT ")
            .push_bind(window.limit)
            .push(" OFFSET ")
            .push_bind(window.offset);
        let rows = qb
            .build_query_as::<Recipe>()
            .fetch_all(db)
            .await
            .context("list recipes")?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut qb, filter);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(db)
            .await
            .context("count recipes")?;

        Ok((rows, count))
    }

    /// `limit = None` returns every recipe of the author.
    pub async fn list_by_author(
        db: &PgPool,
        author: Uuid,
        limit: Option<i64>,
    ) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            SELECT {RECIPE_COLUMNS}
              FROM recipes r
             WHERE r.author_id = $1
             ORDER BY r.published_at DESC, r.id
             LIMIT $2
            "#
        ))
        .bind(author)
        .bind(limit)
        .fetch_all(db)
        .await
        .context("list recipes by author")?;
        Ok(rows)
    }

    pub async fn count_by_authors(db: &PgPool, authors: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT author_id, COUNT(*)
              FROM recipes
             WHERE author_id = ANY($1)
             GROUP BY author_id
            "#,
        )
        .bind(authors)
        .fetch_all(db)
        .await
        .context("count recipes by authors")?;
        Ok(rows)
    }

    pub async fn ingredients_for(
        db: &PgPool,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<Vec<RecipeIngredientRow>> {
        let rows = sqlx::query_as::<_, RecipeIngredientRow>(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
              FROM recipe_ingredients ri
              JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ANY($1)
             ORDER BY i.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(db)
        .await
        .context("load recipe ingredients")?;
        Ok(rows)
    }

    /// Which of `recipe_ids` the viewer has favorited / put in the cart.
    pub async fn viewer_flags(
        db: &PgPool,
        viewer: Uuid,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<(HashSet<Uuid>, HashSet<Uuid>)> {
        let favorited = sqlx::query_scalar::<_, Uuid>(
            "SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)",
        )
        .bind(viewer)
        .bind(recipe_ids)
        .fetch_all(db)
        .await
        .context("load favorite flags")?;
        let in_cart = sqlx::query_scalar::<_, Uuid>(
            "SELECT recipe_id FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)",
        )
        .bind(viewer)
        .bind(recipe_ids)
        .fetch_all(db)
        .await
        .context("load cart flags")?;
        Ok((favorited.into_iter().collect(), in_cart.into_iter().collect()))
    }

    /// `None` when the slug is already taken; the caller retries with a new one.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        author: Uuid,
        fields: &RecipeFields,
        slug: &str,
    ) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes AS r (author_id, name, image_key, text, cooking_time, short_slug)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (short_slug) DO NOTHING
            RETURNING r.id, r.author_id, r.name, r.image_key, r.text, r.cooking_time,
                      r.short_slug, r.published_at
            "#,
        )
        .bind(author)
        .bind(&fields.name)
        .bind(fields.image_key.as_deref())
        .bind(&fields.text)
        .bind(fields.cooking_time)
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await
        .context("insert recipe")?;
        Ok(row)
    }

    pub async fn update_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        fields: &RecipeFields,
    ) -> anyhow::Result<Recipe> {
        let row = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes AS r
               SET name = $2, image_key = $3, text = $4, cooking_time = $5
             WHERE r.id = $1
            RETURNING r.id, r.author_id, r.name, r.image_key, r.text, r.cooking_time,
                      r.short_slug, r.published_at
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(fields.image_key.as_deref())
        .bind(&fields.text)
        .bind(fields.cooking_time)
        .fetch_one(&mut **tx)
        .await
        .context("update recipe")?;
        Ok(row)
    }

    pub async fn replace_ingredients_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
        items: &[IngredientAmount],
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut **tx)
            .await
            .context("clear recipe ingredients")?;

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let amounts: Vec<i32> = items.iter().map(|i| i.amount).collect();
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            SELECT $1, t.ingredient_id, t.amount
              FROM UNNEST($2::uuid[], $3::int4[]) AS t (ingredient_id, amount)
            "#,
        )
        .bind(recipe_id)
        .bind(&ids[..])
        .bind(&amounts[..])
        .execute(&mut **tx)
        .await
        .context("insert recipe ingredients")?;
        Ok(())
    }

    /// Ingredient, favorite and cart rows go with it (ON DELETE CASCADE).
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete recipe")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: RecipeFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM recipes r");
        push_filters(&mut qb, &filter);
        qb.sql().to_string()
    }

    #[test]
    fn no_filters_is_a_tautology() {
        assert_eq!(sql_for(RecipeFilter::default()), "SELECT 1 FROM recipes r WHERE TRUE");
    }

    #[test]
    fn negated_favorite_filter_uses_not_exists() {
        let viewer = Uuid::new_v4();
        let sql = sql_for(RecipeFilter {
            favorited: Some((viewer, false)),
            in_cart: Some((viewer, true)),
            ..Default::default()
        });
        assert!(sql.contains("AND NOT EXISTS (SELECT 1 FROM favorites j"));
        assert!(sql.contains("AND EXISTS (SELECT 1 FROM shopping_cart j"));
        assert!(sql.contains("$1") && sql.contains("$2"));
    }

    #[test]
    fn author_filter_binds_parameter() {
        let sql = sql_for(RecipeFilter {
            author: Some(Uuid::new_v4()),
            ..Default::default()
        });
        assert!(sql.ends_with("AND r.author_id = $1"));
    }
}
