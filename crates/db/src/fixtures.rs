use sqlx::Row;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_ORDER_IDS: &[i64] = &[4100, 4101, 4102, 4103];
const SEED_DRIVER_EMAIL: &str = "jo@demo.haulvoice.dev";
const SEED_CLIENT_EMAIL: &str = "ops@demo.haulvoice.dev";
const SEED_STATE_NAMES: &[&str] = &["Texas", "Oklahoma"];

/// Deterministic demo dataset: a driver, a client, four orders across
/// open/transit/completed states, and two state reference rows. Loading is
/// idempotent; the fixture deletes its own rows before re-inserting.
pub struct DemoSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub orders: usize,
    pub drivers: usize,
    pub clients: usize,
    pub states: usize,
}

impl DemoSeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for statement in Self::SQL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Self::verify(pool).await
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let orders = count(pool, "SELECT COUNT(*) AS n FROM orders WHERE id IN (4100, 4101, 4102, 4103)").await?;
        let drivers =
            count(pool, "SELECT COUNT(*) AS n FROM drivers WHERE email = 'jo@demo.haulvoice.dev'")
                .await?;
        let clients =
            count(pool, "SELECT COUNT(*) AS n FROM clients WHERE email = 'ops@demo.haulvoice.dev'")
                .await?;
        let states =
            count(pool, "SELECT COUNT(*) AS n FROM states WHERE name IN ('Texas', 'Oklahoma')")
                .await?;

        let result = SeedResult { orders, drivers, clients, states };
        if result.orders != SEED_ORDER_IDS.len()
            || result.drivers != 1
            || result.clients != 1
            || result.states != SEED_STATE_NAMES.len()
        {
            return Err(RepositoryError::Decode(format!(
                "demo seed verification failed: {result:?}"
            )));
        }

        Ok(result)
    }

    pub fn summary(result: &SeedResult) -> String {
        format!(
            "demo seed loaded: {} orders, driver {}, client {}, {} states",
            result.orders, SEED_DRIVER_EMAIL, SEED_CLIENT_EMAIL, result.states
        )
    }
}

async fn count(pool: &DbPool, query: &str) -> Result<usize, RepositoryError> {
    let row = sqlx::query(query).fetch_one(pool).await?;
    Ok(row.get::<i64, _>("n") as usize)
}
