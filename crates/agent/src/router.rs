use haulvoice_core::keywords::{
    contains_any, ORDER_SWITCH_KEYWORDS, PERMIT_SWITCH_KEYWORDS, PROVISION_KEYWORDS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSystem {
    StateInfo,
    PermitInfo,
    Orders,
    OrderQuery,
    Exit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutedIntent {
    pub spoken_ack: Option<String>,
    pub target: TargetSystem,
}

/// Keyword classifier for raw utterances. The sets are not mutually
/// exclusive, so the test order is the tie-break: state info beats permit
/// wording, which beats order-switch wording; everything else is an order
/// query.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntentRouter;

impl IntentRouter {
    pub fn new() -> Self {
        Self
    }

    pub fn route(&self, query: &str, current_order_id: Option<i64>) -> RoutedIntent {
        if contains_any(query, PROVISION_KEYWORDS) {
            return RoutedIntent {
                spoken_ack: Some("Switching to State Information System...".to_string()),
                target: TargetSystem::StateInfo,
            };
        }

        if contains_any(query, PERMIT_SWITCH_KEYWORDS) {
            // Permit chat is always scoped to an order; without one we stay
            // on the order system and ask for a selection.
            if current_order_id.is_some() {
                return RoutedIntent {
                    spoken_ack: Some("Switching to Permit System...".to_string()),
                    target: TargetSystem::PermitInfo,
                };
            }
            return RoutedIntent {
                spoken_ack: Some(
                    "Please select an order first before checking permits.".to_string(),
                ),
                target: TargetSystem::Orders,
            };
        }

        if contains_any(query, ORDER_SWITCH_KEYWORDS) {
            return RoutedIntent {
                spoken_ack: Some("Switching to Orders...".to_string()),
                target: TargetSystem::Orders,
            };
        }

        RoutedIntent { spoken_ack: None, target: TargetSystem::OrderQuery }
    }
}

#[cfg(test)]
mod tests {
    use super::{IntentRouter, TargetSystem};

    #[test]
    fn state_keywords_win_over_permit_keywords() {
        let router = IntentRouter::new();
        // "state info" and "permit data" both appear; state routing dominates.
        let routed = router.route("give me state info about permit data", Some(4100));
        assert_eq!(routed.target, TargetSystem::StateInfo);
    }

    #[test]
    fn permit_routing_requires_an_active_order() {
        let router = IntentRouter::new();

        let with_order = router.route("show permits please", Some(4100));
        assert_eq!(with_order.target, TargetSystem::PermitInfo);

        let without_order = router.route("show permits please", None);
        assert_eq!(without_order.target, TargetSystem::Orders);
        assert_eq!(
            without_order.spoken_ack.as_deref(),
            Some("Please select an order first before checking permits.")
        );
    }

    #[test]
    fn permit_keywords_win_over_order_switch_keywords() {
        let router = IntentRouter::new();
        let routed = router.route("go back to permits then check orders", Some(4100));
        assert_eq!(routed.target, TargetSystem::PermitInfo);
    }

    #[test]
    fn order_switch_keywords_route_to_orders() {
        let routed = IntentRouter::new().route("switch to orders", None);
        assert_eq!(routed.target, TargetSystem::Orders);
        assert_eq!(routed.spoken_ack.as_deref(), Some("Switching to Orders..."));
    }

    #[test]
    fn unmatched_queries_fall_through_to_order_query() {
        let routed = IntentRouter::new().route("what is the status of my latest order", None);
        assert_eq!(routed.target, TargetSystem::OrderQuery);
        assert!(routed.spoken_ack.is_none());
    }
}
