use std::sync::Arc;

use regex::Regex;
use tracing::error;

use haulvoice_core::context::{bare_numbers, match_position_phrase, position_description};
use haulvoice_core::domain::user::UserProfile;
use haulvoice_db::OrderStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub should_switch: bool,
    pub order_ids: Vec<i64>,
    pub explanation: String,
}

impl Resolution {
    fn switch(order_id: i64, explanation: String) -> Self {
        Self { should_switch: true, order_ids: vec![order_id], explanation }
    }

    fn keep(order_id: i64, explanation: String) -> Self {
        Self { should_switch: false, order_ids: vec![order_id], explanation }
    }

    fn none(explanation: impl Into<String>) -> Self {
        Self { should_switch: false, order_ids: Vec::new(), explanation: explanation.into() }
    }
}

/// Resolves which order a query refers to.
///
/// Admins reference orders by explicit ID anywhere in the system; drivers
/// and clients reference their own list by position ("third last"), ordinal
/// ("3rd latest"), or bare ID. Every failure mode resolves to an
/// explanation string, never an error.
pub struct OrderContextResolver {
    store: Arc<dyn OrderStore>,
    admin_id_patterns: Vec<Regex>,
    ordinal_pattern: Regex,
}

impl OrderContextResolver {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        // Tried in listed order; the first pattern whose captured ID exists
        // in the store wins.
        let admin_id_patterns = [
            r"order\s+#?(\d{4,})",
            r"#(\d{4,})",
            r"\b(\d{4,})\b",
            r"(?:about|for|id)\s+#?(\d{4,})",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("admin id pattern"))
        .collect();

        let ordinal_pattern =
            Regex::new(r"(\d+)(?:st|nd|rd|th)\s+latest").expect("ordinal pattern");

        Self { store, admin_id_patterns, ordinal_pattern }
    }

    pub async fn resolve(
        &self,
        query: &str,
        current_order_id: Option<i64>,
        profile: &UserProfile,
    ) -> Resolution {
        match self.try_resolve(query, current_order_id, profile).await {
            Ok(resolution) => resolution,
            Err(error) => {
                error!(error = %error, "order context resolution failed");
                Resolution::none("Error in processing")
            }
        }
    }

    async fn try_resolve(
        &self,
        query: &str,
        current_order_id: Option<i64>,
        profile: &UserProfile,
    ) -> anyhow::Result<Resolution> {
        if profile.role.is_admin() {
            return self.resolve_admin(query, current_order_id).await;
        }
        Ok(self.resolve_member(query, current_order_id, profile))
    }

    async fn resolve_admin(
        &self,
        query: &str,
        current_order_id: Option<i64>,
    ) -> anyhow::Result<Resolution> {
        if let Some(order_id) = self.extract_admin_order_id(query).await? {
            return Ok(Resolution::switch(order_id, format!("Accessing order {order_id} as admin")));
        }

        if let Some(current) = current_order_id {
            return Ok(Resolution::keep(
                current,
                format!("Continuing with current order {current}"),
            ));
        }

        Ok(Resolution::none("Please specify an order ID"))
    }

    async fn extract_admin_order_id(&self, query: &str) -> anyhow::Result<Option<i64>> {
        let query_lower = query.to_ascii_lowercase();

        for pattern in &self.admin_id_patterns {
            let Some(captures) = pattern.captures(&query_lower) else {
                continue;
            };
            let Ok(order_id) = captures[1].parse::<i64>() else {
                continue;
            };
            if self.store.find_order_by_id(order_id).await?.is_some() {
                return Ok(Some(order_id));
            }
        }

        Ok(None)
    }

    fn resolve_member(
        &self,
        query: &str,
        current_order_id: Option<i64>,
        profile: &UserProfile,
    ) -> Resolution {
        let order_ids = profile.order_ids_descending();
        let user_type = profile.role.as_str();
        let query_lower = query.to_ascii_lowercase();

        // 1. Digit ordinals ("3rd latest") before the phrase table; the
        //    bare "latest" entry would otherwise shadow them.
        if let Some(captures) = self.ordinal_pattern.captures(&query_lower) {
            let phrase = captures[0].to_string();
            let index = captures[1].parse::<usize>().ok().and_then(|n| n.checked_sub(1));
            if let Some(index) = index {
                if let Some(&order_id) = order_ids.get(index) {
                    return Resolution::switch(
                        order_id,
                        format!("Using {phrase} order ({order_id}) for {user_type}"),
                    );
                }
            }
            // Out of range is a final answer, not a fallthrough.
            return Resolution::none(format!("No {phrase} order available for {user_type}"));
        }

        // 2. Relative position phrases, compound phrases first.
        if let Some((phrase, index)) = match_position_phrase(&query_lower) {
            if let Some(&order_id) = order_ids.get(index) {
                let description = position_description(index);
                return Resolution::switch(
                    order_id,
                    format!("Using {description} order ({order_id}) for {user_type}"),
                );
            }
            return Resolution::none(format!(
                "No {phrase} order available for {user_type}"
            ));
        }

        // 3. A bare number that matches one of the user's own orders.
        for number in bare_numbers(&query_lower) {
            if let Some(position) = order_ids.iter().position(|&id| id == number) {
                let description = position_description(position);
                return Resolution::switch(
                    number,
                    format!("Using order {number} ({description} order) for {user_type}"),
                );
            }
        }

        // 4. Keep the active order.
        if let Some(current) = current_order_id {
            return Resolution::keep(
                current,
                format!("Continuing with current order {current} for {user_type}"),
            );
        }

        // 5. Default to the newest order.
        if let Some(&newest) = order_ids.first() {
            return Resolution::switch(
                newest,
                format!("Using latest order {newest} for {user_type}"),
            );
        }

        Resolution::none(format!("No orders found for {user_type}"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haulvoice_core::domain::order::{Order, OrderDocument};
    use haulvoice_core::domain::user::{Role, UserProfile};
    use haulvoice_db::InMemoryOrderStore;

    use super::OrderContextResolver;

    fn driver_profile(order_ids: Vec<i64>) -> UserProfile {
        UserProfile {
            role: Role::Driver,
            name: "Jo Hauler".to_string(),
            email: "jo@example.com".to_string(),
            phone: None,
            order_ids,
        }
    }

    fn resolver_with_orders(ids: &[i64]) -> OrderContextResolver {
        let documents = ids
            .iter()
            .map(|&id| OrderDocument {
                id,
                order: Order { order_status: Some("Open".to_string()), ..Order::default() },
            })
            .collect();
        OrderContextResolver::new(Arc::new(InMemoryOrderStore::with_orders(documents)))
    }

    #[tokio::test]
    async fn position_phrase_resolves_by_descending_index() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(vec![500, 450, 400, 350]);

        let resolution =
            resolver.resolve("show me the third last order", None, &profile).await;

        assert!(resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![400]);
        assert!(resolution.explanation.contains("third latest"));
    }

    #[tokio::test]
    async fn out_of_range_position_does_not_fall_back_to_current() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(vec![500, 450, 400, 350]);

        let resolution =
            resolver.resolve("show me the tenth last order", Some(500), &profile).await;

        assert!(!resolution.should_switch);
        assert!(resolution.order_ids.is_empty());
        assert!(resolution.explanation.contains("No tenth last order available"));
    }

    #[tokio::test]
    async fn ordinal_phrasing_resolves_one_based() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(vec![500, 450, 400]);

        let resolution = resolver.resolve("open the 2nd latest order", None, &profile).await;

        assert!(resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![450]);

        let resolution = resolver.resolve("open the 9th latest order", None, &profile).await;
        assert!(!resolution.should_switch);
        assert!(resolution.order_ids.is_empty());
    }

    #[tokio::test]
    async fn bare_id_matches_own_orders_with_position_description() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(vec![500, 450, 400]);

        let resolution = resolver.resolve("anything on 450", None, &profile).await;

        assert!(resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![450]);
        assert!(resolution.explanation.contains("second latest"));
    }

    #[tokio::test]
    async fn unmatched_query_keeps_current_then_defaults_to_newest() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(vec![500, 450]);

        let kept = resolver.resolve("what is the fee total", Some(450), &profile).await;
        assert!(!kept.should_switch);
        assert_eq!(kept.order_ids, vec![450]);

        let defaulted = resolver.resolve("what is the fee total", None, &profile).await;
        assert!(defaulted.should_switch);
        assert_eq!(defaulted.order_ids, vec![500]);
    }

    #[tokio::test]
    async fn empty_order_list_resolves_to_none() {
        let resolver = resolver_with_orders(&[]);
        let profile = driver_profile(Vec::new());

        let resolution = resolver.resolve("status please", None, &profile).await;
        assert!(!resolution.should_switch);
        assert!(resolution.order_ids.is_empty());
        assert_eq!(resolution.explanation, "No orders found for driver");
    }

    #[tokio::test]
    async fn admin_explicit_id_requires_existing_order() {
        let resolver = resolver_with_orders(&[2892]);
        let admin = UserProfile::admin();

        let resolution = resolver.resolve("tell me about order 2892", None, &admin).await;
        assert!(resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![2892]);

        let missing = resolver.resolve("tell me about order 7777", None, &admin).await;
        assert!(!missing.should_switch);
        assert!(missing.order_ids.is_empty());
        assert_eq!(missing.explanation, "Please specify an order ID");
    }

    #[tokio::test]
    async fn admin_without_reference_keeps_current_order() {
        let resolver = resolver_with_orders(&[2892]);
        let admin = UserProfile::admin();

        let resolution = resolver.resolve("what about the permits", Some(2892), &admin).await;
        assert!(!resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![2892]);
        assert!(resolution.explanation.contains("Continuing with current order 2892"));
    }

    #[tokio::test]
    async fn admin_hash_reference_is_recognized() {
        let resolver = resolver_with_orders(&[2892]);
        let admin = UserProfile::admin();

        let resolution = resolver.resolve("pull up #2892 please", None, &admin).await;
        assert!(resolution.should_switch);
        assert_eq!(resolution.order_ids, vec![2892]);
    }
}
