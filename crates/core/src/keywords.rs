//! Keyword tables driving intent detection and severe-weather matching.
//! Membership is case-insensitive substring containment over the lowered
//! query; routing priority between the sets is fixed by the intent router.

pub const PROVISION_KEYWORDS: &[&str] = &[
    "provision",
    "state provision",
    "provision file",
    "provisional",
    "state provisional file",
    "provisional file",
    "provisions",
    "state info",
    "state information",
    "state data",
    "state details",
    "provision info",
    "provision information",
    "switch to states",
];

pub const PERMIT_SWITCH_KEYWORDS: &[&str] = &[
    "switch to permit",
    "switch to permits",
    "go to permit",
    "go to permits",
    "go back to permit",
    "go back to permits",
    "go back permit",
    "go back permits",
    "open permit",
    "open permits",
    "see permit",
    "see permits",
    "show permit",
    "show permits",
    "view permit",
    "view permits",
    "check permit",
    "check permits",
    "talk about permit",
    "talk about permits",
    "discuss permit",
    "discuss permits",
    "discuss about permit",
    "discuss about permits",
    "permit system",
    "permits system",
    "permit management",
    "permits management",
    "permit updates",
    "permits updates",
    "permit list",
    "permits list",
    "permit overview",
    "permits overview",
    "permit report",
    "permits report",
    "permit data",
    "permits data",
    "permit query",
    "permits query",
    "permit search",
    "permits search",
    "permit inquiry",
    "permits inquiry",
    "permit menu",
    "permits menu",
    "permit section",
    "permits section",
    "permit dashboard",
    "permits dashboard",
    "permit portal",
    "permits portal",
    "permit screen",
    "permits screen",
    "permit page",
    "permits page",
    "permit tab",
    "permits tab",
    "permit module",
    "permits module",
    "permit interface",
    "permits interface",
    "permit platform",
    "permits platform",
];

pub const ORDER_SWITCH_KEYWORDS: &[&str] = &[
    "switch to orders",
    "go to orders",
    "go back to orders",
    "go back orders",
    "go back order",
    "check orders",
    "talk about orders",
    "discuss orders",
    "discuss about orders",
    "order system",
    "order management",
    "orders management",
    "orders updates",
    "order list",
    "orders list",
    "orders overview",
    "orders report",
    "orders data",
    "orders query",
    "orders search",
    "order inquiry",
    "orders inquiry",
    "order menu",
    "orders menu",
    "order section",
    "orders section",
    "order dashboard",
    "orders dashboard",
    "order portal",
    "orders portal",
    "order screen",
    "orders screen",
    "order page",
    "orders page",
    "order tab",
    "orders tab",
    "order module",
    "orders module",
    "order interface",
    "orders interface",
    "order platform",
    "orders platform",
    "show orders",
    "view orders",
    "return to orders",
];

pub const PROACTIVE_STATUS_KEYWORDS: &[&str] = &[
    "any updates",
    "any alerts",
    "any notifications",
    "what's new",
    "whats new",
    "anything new",
    "any changes",
    "status update",
    "status updates",
    "proactive update",
    "proactive updates",
    "check for updates",
    "check updates",
    "pending alerts",
    "any pending",
    "what did i miss",
    "anything i should know",
    "catch me up",
    "brief me",
];

pub const SEVERE_WEATHER_KEYWORDS: &[&str] = &[
    "storm",
    "thunderstorm",
    "tornado",
    "hurricane",
    "blizzard",
    "heavy rain",
    "heavy snow",
    "ice",
    "freezing rain",
    "hail",
    "flood",
    "warning",
    "extreme",
    "severe",
    "dangerous",
    "advisory",
    "high wind",
    "gale",
    "fog",
];

pub const STATES: &[&str] = &[
    "Alabama",
    "Alaska",
    "Alberta",
    "Arizona",
    "Arkansas",
    "British Columbia",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Manitoba",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Brunswick",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "Newfoundland and Labrador",
    "North Carolina",
    "North Dakota",
    "Nova Scotia",
    "Ohio",
    "Oklahoma",
    "Ontario",
    "Oregon",
    "Pennsylvania",
    "Prince Edward Island",
    "Quebec",
    "Rhode Island",
    "Saskatchewan",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

/// True when any keyword appears as a substring of the lowered query.
pub fn contains_any(query: &str, keywords: &[&str]) -> bool {
    let query_lower = query.to_ascii_lowercase();
    keywords.iter().any(|keyword| query_lower.contains(keyword))
}

/// Detect a state or province name in a query. Exact containment first,
/// then a space-collapsed pass so "newmexico" still matches.
pub fn find_state_name(query: &str) -> Option<&'static str> {
    let query_lower = query.to_ascii_lowercase();
    if let Some(state) =
        STATES.iter().find(|state| query_lower.contains(&state.to_ascii_lowercase())).copied()
    {
        return Some(state);
    }

    let query_compact = query_lower.replace(' ', "");
    STATES
        .iter()
        .find(|state| query_compact.contains(&state.to_ascii_lowercase().replace(' ', "")))
        .copied()
}

/// True when a weather description mentions severe conditions.
pub fn is_severe_weather(description: &str) -> bool {
    contains_any(description, SEVERE_WEATHER_KEYWORDS)
}
