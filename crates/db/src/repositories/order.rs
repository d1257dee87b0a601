use async_trait::async_trait;
use sqlx::Row;

use haulvoice_core::domain::order::OrderDocument;
use haulvoice_core::domain::user::{Role, UserProfile};

use super::{OrderStore, RepositoryError};
use crate::DbPool;

const ADMIN_RECENT_ORDER_LIMIT: i64 = 20;

pub struct SqlOrderStore {
    pool: DbPool,
}

impl SqlOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn party_table(role: Role) -> Option<&'static str> {
        match role {
            Role::Driver => Some("drivers"),
            Role::Client => Some("clients"),
            Role::Admin => None,
        }
    }

    fn decode_document(raw: &str) -> Result<OrderDocument, RepositoryError> {
        serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(error.to_string()))
    }

    fn decode_order_ids(raw: &str) -> Result<Vec<i64>, RepositoryError> {
        serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(error.to_string()))
    }
}

#[async_trait]
impl OrderStore for SqlOrderStore {
    async fn find_order_by_id(&self, id: i64) -> Result<Option<OrderDocument>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::decode_document(&row.get::<String, _>("document"))).transpose()
    }

    async fn find_orders_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<OrderDocument>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            sqlx::QueryBuilder::new("SELECT document FROM orders WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::decode_document(&row.get::<String, _>("document")))
            .collect()
    }

    async fn find_user_order_ids(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Vec<i64>, RepositoryError> {
        let Some(table) = Self::party_table(role) else {
            let rows = sqlx::query("SELECT id FROM orders ORDER BY id DESC LIMIT ?")
                .bind(ADMIN_RECENT_ORDER_LIMIT)
                .fetch_all(&self.pool)
                .await?;
            return Ok(rows.iter().map(|row| row.get::<i64, _>("id")).collect());
        };

        let row = sqlx::query(&format!("SELECT order_ids FROM {table} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::decode_order_ids(&row.get::<String, _>("order_ids")),
            None => Ok(Vec::new()),
        }
    }

    async fn verify_email(&self, role: Role, email: &str) -> Result<bool, RepositoryError> {
        let Some(table) = Self::party_table(role) else {
            return Ok(true);
        };

        let row = sqlx::query(&format!("SELECT 1 AS present FROM {table} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn find_user_profile(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        let Some(table) = Self::party_table(role) else {
            return Ok(Some(UserProfile::admin()));
        };

        let row =
            sqlx::query(&format!("SELECT name, phone, order_ids FROM {table} WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserProfile {
            role,
            name: row.get::<String, _>("name"),
            email: email.to_string(),
            phone: row.get::<Option<String>, _>("phone"),
            order_ids: Self::decode_order_ids(&row.get::<String, _>("order_ids"))?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use haulvoice_core::domain::user::Role;

    use super::SqlOrderStore;
    use crate::migrations::run_pending;
    use crate::repositories::OrderStore;
    use crate::{connect_with_settings, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        for id in [4100_i64, 4101, 4102] {
            let document = serde_json::json!({
                "id": id,
                "order": { "order_status": "Open", "routeData": [] }
            });
            sqlx::query("INSERT INTO orders (id, document) VALUES (?, ?)")
                .bind(id)
                .bind(document.to_string())
                .execute(&pool)
                .await
                .expect("insert order");
        }

        sqlx::query("INSERT INTO drivers (email, name, phone, order_ids) VALUES (?, ?, ?, ?)")
            .bind("jo@example.com")
            .bind("Jo Hauler")
            .bind("555-0110")
            .bind("[4100, 4102]")
            .execute(&pool)
            .await
            .expect("insert driver");

        pool
    }

    #[tokio::test]
    async fn finds_and_decodes_documents() {
        let store = SqlOrderStore::new(seeded_pool().await);

        let document = store.find_order_by_id(4100).await.expect("query").expect("present");
        assert_eq!(document.id, 4100);
        assert_eq!(document.order.status_label(), "Open");

        assert!(store.find_order_by_id(9999).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn batch_lookup_skips_unknown_ids() {
        let store = SqlOrderStore::new(seeded_pool().await);
        let documents = store.find_orders_by_ids(&[4102, 4100, 9999]).await.expect("query");

        let ids: Vec<i64> = documents.iter().map(|doc| doc.id).collect();
        assert_eq!(ids, vec![4102, 4100]);
    }

    #[tokio::test]
    async fn admin_sees_recent_orders_descending() {
        let store = SqlOrderStore::new(seeded_pool().await);
        let ids = store.find_user_order_ids(Role::Admin, "admin").await.expect("query");
        assert_eq!(ids, vec![4102, 4101, 4100]);
    }

    #[tokio::test]
    async fn driver_sees_personal_assignment_list() {
        let store = SqlOrderStore::new(seeded_pool().await);

        let ids = store.find_user_order_ids(Role::Driver, "jo@example.com").await.expect("query");
        assert_eq!(ids, vec![4100, 4102]);

        let ids = store.find_user_order_ids(Role::Driver, "nobody@example.com").await.expect("query");
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn email_verification_is_role_scoped() {
        let store = SqlOrderStore::new(seeded_pool().await);

        assert!(store.verify_email(Role::Driver, "jo@example.com").await.expect("query"));
        assert!(!store.verify_email(Role::Client, "jo@example.com").await.expect("query"));
        assert!(store.verify_email(Role::Admin, "anyone").await.expect("query"));
    }

    #[tokio::test]
    async fn profiles_round_trip_with_order_lists() {
        let store = SqlOrderStore::new(seeded_pool().await);

        let profile = store
            .find_user_profile(Role::Driver, "jo@example.com")
            .await
            .expect("query")
            .expect("present");
        assert_eq!(profile.name, "Jo Hauler");
        assert_eq!(profile.order_ids, vec![4100, 4102]);

        let admin = store.find_user_profile(Role::Admin, "admin").await.expect("query");
        assert!(admin.is_some());
    }
}
