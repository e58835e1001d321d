use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Catalog entry; not owned by any user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    /// Case-insensitive prefix search, ordered by name.
    pub async fn search(db: &PgPool, prefix: &str) -> anyhow::Result<Vec<Ingredient>> {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, measurement_unit
              FROM ingredients
             WHERE lower(name) LIKE $1
             ORDER BY name, measurement_unit
            "#,
        )
        .bind(pattern)
        .fetch_all(db)
        .await
        .context("search ingredients")?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>(
            r#"SELECT id, name, measurement_unit FROM ingredients WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find ingredient")?;
        Ok(row)
    }

    /// Returns the subset of `ids` present in the catalog.
    pub async fn existing_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM ingredients WHERE id = ANY($1)"#)
            .bind(ids)
            .fetch_all(db)
            .await
            .context("check ingredient ids")?;
        Ok(rows)
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
