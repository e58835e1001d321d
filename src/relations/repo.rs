use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::services::RelationKind;

#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Inserts the pair; `false` means it was already present.
    async fn insert_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool>;

    /// Deletes the pair; `false` means there was nothing to delete.
    async fn delete_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl RelationStore for PgPool {
    async fn insert_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool> {
        let (table, user_col, target_col) = kind.columns();
        let sql = format!(
            "INSERT INTO {table} ({user_col}, {target_col}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        let res = sqlx::query(&sql)
            .bind(user)
            .bind(target)
            .execute(self)
            .await
            .with_context(|| format!("insert into {table}"))?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool> {
        let (table, user_col, target_col) = kind.columns();
        let sql = format!("DELETE FROM {table} WHERE {user_col} = $1 AND {target_col} = $2");
        let res = sqlx::query(&sql)
            .bind(user)
            .bind(target)
            .execute(self)
            .await
            .with_context(|| format!("delete from {table}"))?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// In-process stand-in for the join tables.
    #[derive(Default)]
    pub struct MemoryRelations {
        rows: Mutex<HashSet<(RelationKind, Uuid, Uuid)>>,
        pub writes: Mutex<usize>,
    }

    #[async_trait]
    impl RelationStore for MemoryRelations {
        async fn insert_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool> {
            *self.writes.lock().unwrap() += 1;
            Ok(self.rows.lock().unwrap().insert((kind, user, target)))
        }

        async fn delete_pair(&self, kind: RelationKind, user: Uuid, target: Uuid) -> anyhow::Result<bool> {
            *self.writes.lock().unwrap() += 1;
            Ok(self.rows.lock().unwrap().remove(&(kind, user, target)))
        }
    }

    impl MemoryRelations {
        pub fn contains(&self, kind: RelationKind, user: Uuid, target: Uuid) -> bool {
            self.rows.lock().unwrap().contains(&(kind, user, target))
        }
    }
}
