use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stored order document: numeric ID plus the order payload. The
/// upstream API ships loosely-shaped JSON with inconsistent key spellings;
/// everything is normalized into this schema once, at deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDocument {
    pub id: i64,
    pub order: Order,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "orderStatus")]
    pub order_status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub order_created_date: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,

    #[serde(default)]
    pub origin_city: Option<String>,
    #[serde(default)]
    pub pickup_city: Option<String>,
    #[serde(default)]
    pub from_city: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub to_city: Option<String>,

    #[serde(default, alias = "pickupFormattedAddress")]
    pub pickup_address: Option<String>,
    // The upstream field name carries this typo; keep the alias faithful.
    #[serde(default, alias = "deliveryFormatedAddress")]
    pub delivery_address: Option<String>,

    #[serde(default, alias = "Trailer_Type")]
    pub trailer_type: Option<String>,
    #[serde(default, alias = "permitcount")]
    pub permit_count: Option<i64>,
    #[serde(default, alias = "estimatedTotalCostValue")]
    pub estimated_total_cost: Option<Decimal>,
    #[serde(default)]
    pub total_due: Option<Decimal>,

    #[serde(default, alias = "clientData")]
    pub client: Option<Party>,
    #[serde(default, alias = "driverData")]
    pub driver: Option<Party>,

    #[serde(default, alias = "routeData")]
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One per-state leg of the permit journey.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, alias = "product_name")]
    pub state_name: Option<String>,
    #[serde(default)]
    pub permit_status: Option<String>,
    #[serde(default)]
    pub attached_at: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub permit_link: Option<String>,
    #[serde(default)]
    pub use_tolls: Option<bool>,
    #[serde(default)]
    pub state_fee: Option<Decimal>,
    #[serde(default)]
    pub service_fee: Option<Decimal>,
    #[serde(default)]
    pub other_fee: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub permit_info: Option<serde_json::Value>,
}

impl Route {
    pub fn state_label(&self) -> &str {
        self.state_name.as_deref().unwrap_or("Unknown")
    }

    pub fn has_permit_issue(&self) -> bool {
        self.permit_status
            .as_deref()
            .map(|status| {
                matches!(status.to_ascii_lowercase().as_str(), "expired" | "rejected" | "cancelled")
            })
            .unwrap_or(false)
    }

    pub fn is_deleted(&self) -> bool {
        self.permit_status.as_deref() == Some("Delete")
    }
}

impl Order {
    /// First present status field, probing the historical spellings in
    /// order; "unknown" when none is set.
    pub fn status_label(&self) -> &str {
        [&self.status, &self.order_status, &self.state]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.is_empty())
            .unwrap_or("unknown")
    }

    /// Completed, delivered, or closed. Overdue-deadline alerts are
    /// suppressed for these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status_label().to_ascii_lowercase().as_str(),
            "completed" | "delivered" | "closed"
        )
    }

    /// Terminal or cancelled; weather checks skip these entirely.
    pub fn is_inactive(&self) -> bool {
        self.is_terminal() || self.status_label().eq_ignore_ascii_case("cancelled")
    }

    /// Candidate deadline fields in fixed probe order.
    pub fn deadline_candidates(&self) -> [&Option<String>; 3] {
        [&self.delivery_date, &self.end_date, &self.estimated_delivery]
    }

    /// Distinct cities worth a weather check: origin/destination variants
    /// plus the state names along the route.
    pub fn route_cities(&self) -> BTreeSet<String> {
        let mut cities = BTreeSet::new();
        let city_fields = [
            &self.origin_city,
            &self.pickup_city,
            &self.from_city,
            &self.destination_city,
            &self.delivery_city,
            &self.to_city,
        ];

        for field in city_fields {
            if let Some(city) = field {
                let trimmed = city.trim();
                if !trimmed.is_empty() {
                    cities.insert(trimmed.to_string());
                }
            }
        }

        for route in &self.routes {
            if let Some(state_name) = &route.state_name {
                if !state_name.is_empty() {
                    cities.insert(state_name.clone());
                }
            }
        }

        cities
    }

    /// Routes with deleted permits removed; responses never mention them.
    pub fn active_routes(&self) -> Vec<&Route> {
        self.routes.iter().filter(|route| !route.is_deleted()).collect()
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%B %d, %Y"];

/// Try a fixed list of date formats in sequence. Returns None rather than an
/// error: an unparseable date skips that entity, never the batch.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{parse_flexible_date, Order, OrderDocument};

    fn document_from_api_shape() -> OrderDocument {
        serde_json::from_value(serde_json::json!({
            "id": 2892,
            "order": {
                "orderStatus": "Open",
                "pickupFormattedAddress": "12 Dock Rd, Houston, TX",
                "origin_city": "Houston",
                "destination_city": "Tulsa ",
                "delivery_date": "2026-08-20 14:00:00",
                "estimatedTotalCostValue": "1250.50",
                "routeData": [
                    {
                        "product_name": "Texas",
                        "permit_status": "Approved",
                        "attached_at": "2026-08-01T09:30:00Z",
                        "state_fee": "75.00"
                    },
                    {
                        "product_name": "Oklahoma",
                        "permit_status": "Delete"
                    }
                ]
            }
        }))
        .expect("api-shaped document should deserialize")
    }

    #[test]
    fn adapter_normalizes_renamed_fields() {
        let document = document_from_api_shape();
        assert_eq!(document.id, 2892);
        assert_eq!(document.order.status_label(), "Open");
        assert_eq!(document.order.pickup_address.as_deref(), Some("12 Dock Rd, Houston, TX"));
        assert_eq!(document.order.routes[0].state_label(), "Texas");
    }

    #[test]
    fn status_label_probes_fields_in_order() {
        let order = Order { state: Some("In Transit".to_string()), ..Order::default() };
        assert_eq!(order.status_label(), "In Transit");

        let order = Order {
            status: Some("Open".to_string()),
            order_status: Some("Closed".to_string()),
            ..Order::default()
        };
        assert_eq!(order.status_label(), "Open");

        assert_eq!(Order::default().status_label(), "unknown");
    }

    #[test]
    fn terminal_statuses_are_case_insensitive() {
        let order = Order { status: Some("Delivered".to_string()), ..Order::default() };
        assert!(order.is_terminal());
        assert!(order.is_inactive());

        let order = Order { status: Some("Cancelled".to_string()), ..Order::default() };
        assert!(!order.is_terminal());
        assert!(order.is_inactive());

        let order = Order { status: Some("Open".to_string()), ..Order::default() };
        assert!(!order.is_inactive());
    }

    #[test]
    fn route_cities_merge_fields_and_states() {
        let document = document_from_api_shape();
        let cities = document.order.route_cities();

        assert!(cities.contains("Houston"));
        assert!(cities.contains("Tulsa"));
        assert!(cities.contains("Texas"));
        assert!(cities.contains("Oklahoma"));
    }

    #[test]
    fn deleted_permits_are_filtered_from_active_routes() {
        let document = document_from_api_shape();
        let active = document.order.active_routes();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].state_label(), "Texas");
    }

    #[test]
    fn flexible_date_parser_walks_format_list() {
        assert!(parse_flexible_date("2026-08-01T09:30:00.120Z").is_some());
        assert!(parse_flexible_date("2026-08-01T09:30:00Z").is_some());
        assert!(parse_flexible_date("2026-08-01 09:30:00").is_some());
        assert!(parse_flexible_date("2026-08-01").is_some());
        assert!(parse_flexible_date("08/20/2026").is_some());
        assert!(parse_flexible_date("August 20, 2026").is_some());
        assert!(parse_flexible_date("not a date").is_none());
        assert!(parse_flexible_date("").is_none());
    }
}
