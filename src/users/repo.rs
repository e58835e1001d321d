use std::collections::HashSet;

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::pagination::Window;

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, avatar_key, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(db)
        .await
        .context("find users by ids")?;
        Ok(users)
    }

    /// Returns which of email / username are already taken.
    pub async fn taken(db: &PgPool, email: &str, username: &str) -> anyhow::Result<(bool, bool)> {
        let row: (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE email = $1),
                   EXISTS (SELECT 1 FROM users WHERE username = $2)
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_one(db)
        .await
        .context("check email/username uniqueness")?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.username)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool, window: Window) -> anyhow::Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT $1 OFFSET $2"
        ))
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(db)
        .await
        .context("list users")?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
            .context("count users")?;
        Ok((users, count))
    }

    /// Authors `subscriber` follows, ordered by username.
    pub async fn list_subscriptions(
        db: &PgPool,
        subscriber: Uuid,
        window: Window,
    ) -> anyhow::Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name,
                   u.password_hash, u.avatar_key, u.created_at
              FROM subscriptions s
              JOIN users u ON u.id = s.author_id
             WHERE s.subscriber_id = $1
             ORDER BY u.username
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(subscriber)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(db)
        .await
        .context("list subscriptions")?;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(subscriber)
                .fetch_one(db)
                .await
                .context("count subscriptions")?;
        Ok((users, count))
    }

    /// Subset of `authors` that `viewer` is subscribed to.
    pub async fn subscribed_among(
        db: &PgPool,
        viewer: Uuid,
        authors: &[Uuid],
    ) -> anyhow::Result<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT author_id FROM subscriptions WHERE subscriber_id = $1 AND author_id = ANY($2)"#,
        )
        .bind(viewer)
        .bind(authors)
        .fetch_all(db)
        .await
        .context("load subscription flags")?;
        Ok(ids.into_iter().collect())
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await
            .context("update password")?;
        Ok(())
    }

    pub async fn set_avatar(db: &PgPool, id: Uuid, key: Option<&str>) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET avatar_key = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(db)
            .await
            .context("update avatar")?;
        Ok(())
    }
}
