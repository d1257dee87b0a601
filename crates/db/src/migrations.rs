use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["orders", "drivers", "clients", "states", "idx_orders_imported_at"];

    #[tokio::test]
    async fn migrations_create_managed_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrations should apply");

        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx%'",
        )
        .fetch_all(&pool)
        .await
        .expect("schema listing");

        let names: Vec<String> = rows.iter().map(|row| row.get::<String, _>("name")).collect();
        for object in MANAGED_SCHEMA_OBJECTS {
            assert!(names.iter().any(|name| name == object), "missing schema object {object}");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run should be a no-op");
    }
}
