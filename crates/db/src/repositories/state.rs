use async_trait::async_trait;
use sqlx::Row;

use super::{RepositoryError, StateStore};
use crate::DbPool;

pub struct SqlStateStore {
    pool: DbPool,
}

impl SqlStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SqlStateStore {
    async fn find_state_info(
        &self,
        name: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        let row = sqlx::query("SELECT info FROM states WHERE name = ? COLLATE NOCASE")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            serde_json::from_str(&row.get::<String, _>("info"))
                .map_err(|error| RepositoryError::Decode(error.to_string()))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::SqlStateStore;
    use crate::migrations::run_pending;
    use crate::repositories::StateStore;
    use crate::connect_with_settings;

    #[tokio::test]
    async fn state_lookup_is_case_insensitive() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        sqlx::query("INSERT INTO states (name, info) VALUES (?, ?)")
            .bind("Texas")
            .bind(r#"{"curfew": "none", "escort": "required over 14ft wide"}"#)
            .execute(&pool)
            .await
            .expect("insert state");

        let store = SqlStateStore::new(pool);
        let info = store.find_state_info("texas").await.expect("query").expect("present");
        assert_eq!(info["curfew"], "none");

        assert!(store.find_state_info("Atlantis").await.expect("query").is_none());
    }
}
