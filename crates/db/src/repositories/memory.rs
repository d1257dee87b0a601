use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use haulvoice_core::domain::order::OrderDocument;
use haulvoice_core::domain::user::{Role, UserProfile};

use super::{OrderStore, RepositoryError, StateStore};

const ADMIN_RECENT_ORDER_LIMIT: usize = 20;

/// In-memory order store used by tests and local demos. Mutation methods
/// let a test script status changes and new assignments between polling
/// cycles.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    orders: BTreeMap<i64, OrderDocument>,
    profiles: HashMap<(Role, String), UserProfile>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(documents: Vec<OrderDocument>) -> Self {
        let store = Self::new();
        for document in documents {
            store.upsert_order(document);
        }
        store
    }

    pub fn upsert_order(&self, document: OrderDocument) {
        let mut state = self.inner.lock().expect("memory store lock");
        state.orders.insert(document.id, document);
    }

    pub fn remove_order(&self, id: i64) {
        let mut state = self.inner.lock().expect("memory store lock");
        state.orders.remove(&id);
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        let mut state = self.inner.lock().expect("memory store lock");
        state.profiles.insert((profile.role, profile.email.clone()), profile);
    }

    pub fn update_order(&self, id: i64, mutate: impl FnOnce(&mut OrderDocument)) {
        let mut state = self.inner.lock().expect("memory store lock");
        if let Some(document) = state.orders.get_mut(&id) {
            mutate(document);
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_order_by_id(&self, id: i64) -> Result<Option<OrderDocument>, RepositoryError> {
        let state = self.inner.lock().expect("memory store lock");
        Ok(state.orders.get(&id).cloned())
    }

    async fn find_orders_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<OrderDocument>, RepositoryError> {
        let state = self.inner.lock().expect("memory store lock");
        let mut documents: Vec<OrderDocument> =
            ids.iter().filter_map(|id| state.orders.get(id).cloned()).collect();
        documents.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(documents)
    }

    async fn find_user_order_ids(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Vec<i64>, RepositoryError> {
        let state = self.inner.lock().expect("memory store lock");
        if role.is_admin() {
            let ids: Vec<i64> =
                state.orders.keys().rev().take(ADMIN_RECENT_ORDER_LIMIT).copied().collect();
            return Ok(ids);
        }

        Ok(state
            .profiles
            .get(&(role, email.to_string()))
            .map(|profile| profile.order_ids.clone())
            .unwrap_or_default())
    }

    async fn verify_email(&self, role: Role, email: &str) -> Result<bool, RepositoryError> {
        if role.is_admin() {
            return Ok(true);
        }
        let state = self.inner.lock().expect("memory store lock");
        Ok(state.profiles.contains_key(&(role, email.to_string())))
    }

    async fn find_user_profile(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        if role.is_admin() {
            return Ok(Some(UserProfile::admin()));
        }
        let state = self.inner.lock().expect("memory store lock");
        Ok(state.profiles.get(&(role, email.to_string())).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, info: serde_json::Value) {
        let mut states = self.states.lock().expect("state store lock");
        states.insert(name.to_ascii_lowercase(), info);
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn find_state_info(
        &self,
        name: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        let states = self.states.lock().expect("state store lock");
        Ok(states.get(&name.to_ascii_lowercase()).cloned())
    }
}
