use serde::{Deserialize, Serialize};

use crate::domain::user::Role;

/// Phrase table for relative order references, matched in listed order.
/// Multi-word phrases come first so "second last" wins over the bare
/// "second" and "last" entries.
pub const POSITION_MAPPINGS: &[(&str, usize)] = &[
    ("third last", 2),
    ("third latest", 2),
    ("second last", 1),
    ("second latest", 1),
    ("fourth last", 3),
    ("fourth latest", 3),
    ("fifth last", 4),
    ("fifth latest", 4),
    ("sixth last", 5),
    ("sixth latest", 5),
    ("seventh last", 6),
    ("seventh latest", 6),
    ("eighth last", 7),
    ("eighth latest", 7),
    ("ninth last", 8),
    ("ninth latest", 8),
    ("tenth last", 9),
    ("tenth latest", 9),
    ("latest", 0),
    ("last", 0),
    ("newest", 0),
    ("second", 1),
    ("third", 2),
    ("fourth", 3),
    ("fifth", 4),
    ("sixth", 5),
    ("seventh", 6),
    ("eighth", 7),
    ("ninth", 8),
    ("tenth", 9),
];

const POSITION_DESCRIPTIONS: &[&str] = &[
    "latest",
    "second latest",
    "third latest",
    "fourth latest",
    "fifth latest",
    "sixth latest",
    "seventh latest",
    "eighth latest",
    "ninth latest",
    "tenth latest",
];

/// First phrase from the table contained in the query, with its 0-based
/// position index.
pub fn match_position_phrase(query: &str) -> Option<(&'static str, usize)> {
    let query_lower = query.to_ascii_lowercase();
    POSITION_MAPPINGS
        .iter()
        .find(|(phrase, _)| query_lower.contains(phrase))
        .map(|(phrase, index)| (*phrase, *index))
}

/// Spoken description for a 0-based position index.
pub fn position_description(index: usize) -> String {
    POSITION_DESCRIPTIONS
        .get(index)
        .map(|description| description.to_string())
        .unwrap_or_else(|| format!("{}th latest", index + 1))
}

/// Whitespace-delimited integer tokens in the query, in order of
/// appearance.
pub fn bare_numbers(query: &str) -> Vec<i64> {
    query
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}

/// Session-scoped active-order state. `current_details` is present iff
/// `current_order_id` is present and the fetch succeeded; the two are only
/// ever set together through `set_current`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderContext {
    pub role: Role,
    current_order_id: Option<i64>,
    current_details: Option<serde_json::Value>,
    explanation: String,
}

impl OrderContext {
    pub fn new(role: Role) -> Self {
        Self { role, current_order_id: None, current_details: None, explanation: String::new() }
    }

    pub fn current_order_id(&self) -> Option<i64> {
        self.current_order_id
    }

    pub fn current_details(&self) -> Option<&serde_json::Value> {
        self.current_details.as_ref()
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn set_current(
        &mut self,
        order_id: i64,
        details: serde_json::Value,
        explanation: impl Into<String>,
    ) {
        self.current_order_id = Some(order_id);
        self.current_details = Some(details);
        self.explanation = explanation.into();
    }

    pub fn clear(&mut self) {
        self.current_order_id = None;
        self.current_details = None;
        self.explanation.clear();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::user::Role;

    use super::{bare_numbers, match_position_phrase, position_description, OrderContext};

    #[test]
    fn compound_phrases_win_over_bare_words() {
        assert_eq!(match_position_phrase("show me the third last order"), Some(("third last", 2)));
        assert_eq!(match_position_phrase("the second latest one"), Some(("second latest", 1)));
        assert_eq!(match_position_phrase("my latest order"), Some(("latest", 0)));
        assert_eq!(match_position_phrase("what about order 4100"), None);
    }

    #[test]
    fn descriptions_cover_the_table_and_beyond() {
        assert_eq!(position_description(0), "latest");
        assert_eq!(position_description(2), "third latest");
        assert_eq!(position_description(11), "12th latest");
    }

    #[test]
    fn bare_numbers_extracts_integer_tokens() {
        assert_eq!(bare_numbers("tell me about order 2892"), vec![2892]);
        assert_eq!(bare_numbers("compare 4100 and 4101"), vec![4100, 4101]);
        assert!(bare_numbers("no digits here").is_empty());
    }

    #[test]
    fn context_sets_id_and_details_together() {
        let mut context = OrderContext::new(Role::Driver);
        assert!(context.current_order_id().is_none());
        assert!(context.current_details().is_none());

        context.set_current(4100, json!({"Order ID": 4100}), "Using latest order");
        assert_eq!(context.current_order_id(), Some(4100));
        assert!(context.current_details().is_some());
        assert_eq!(context.explanation(), "Using latest order");

        context.clear();
        assert!(context.current_order_id().is_none());
        assert!(context.current_details().is_none());
    }
}
