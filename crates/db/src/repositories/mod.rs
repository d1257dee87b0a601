use async_trait::async_trait;
use thiserror::Error;

use haulvoice_core::domain::order::OrderDocument;
use haulvoice_core::domain::user::{Role, UserProfile};

pub mod memory;
pub mod order;
pub mod state;

pub use memory::{InMemoryOrderStore, InMemoryStateStore};
pub use order::SqlOrderStore;
pub use state::SqlStateStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read access to order and party documents, scoped by role.
///
/// `find_user_order_ids` is the role-dependent visibility rule: admins see
/// the 20 most recent orders system-wide (newest first); drivers and
/// clients see their personal assignment list.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order_by_id(&self, id: i64) -> Result<Option<OrderDocument>, RepositoryError>;

    async fn find_orders_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<OrderDocument>, RepositoryError>;

    async fn find_user_order_ids(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Vec<i64>, RepositoryError>;

    async fn verify_email(&self, role: Role, email: &str) -> Result<bool, RepositoryError>;

    async fn find_user_profile(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<UserProfile>, RepositoryError>;
}

/// Reference data about state/province regulations.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn find_state_info(
        &self,
        name: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError>;
}
