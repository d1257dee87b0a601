use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use haulvoice_core::context::OrderContext;
use haulvoice_core::domain::order::OrderDocument;
use haulvoice_core::domain::user::{Role, UserProfile};
use haulvoice_core::text::{ends_at_sentence_boundary, normalize_whitespace};
use haulvoice_db::OrderStore;

use crate::context::{OrderContextResolver, Resolution};
use crate::llm::{ChatMessage, ChatParams, LlmClient};
use crate::speech::VoiceChannel;

const FETCH_FAILED: &str = "Sorry, couldn't fetch order details from the database.";
const NO_DETAILS: &str = "Sorry, no order details are currently available.";
const PROCESSING_FAILED: &str = "Sorry, I encountered an error while processing your request.";

fn role_system_prompt(role: Role) -> &'static str {
    match role {
        Role::Driver => {
            "You are an AI voice assistant for Truck Drivers. \
             Provide direct and short answers about order details and driving instructions. \
             Answer from the details provided wisely and response should be relevant to the query."
        }
        Role::Client => {
            "You are an AI assistant for Clients. \
             Provide direct and short answers about order status and details. \
             Answer from the details provided wisely and response should be relevant to the query."
        }
        Role::Admin => {
            "You are an AI assistant for Administrators. \
             Provide comprehensive information about orders and system details. \
             Answer from the details provided wisely and response should be relevant to the query."
        }
    }
}

/// In-memory record of the session's exchanges.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

#[derive(Clone, Debug)]
pub struct ConversationEntry {
    pub query: String,
    pub response: String,
    pub at: DateTime<Utc>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, query: impl Into<String>, response: impl Into<String>) {
        self.entries.push(ConversationEntry {
            query: query.into(),
            response: response.into(),
            at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }
}

/// Generates spoken answers for order queries: resolves which order the
/// user means, loads its details into the session context, and streams an
/// LLM answer to the voice channel sentence by sentence.
pub struct ResponseGenerator {
    store: Arc<dyn OrderStore>,
    llm: Arc<dyn LlmClient>,
    resolver: OrderContextResolver,
}

impl ResponseGenerator {
    pub fn new(store: Arc<dyn OrderStore>, llm: Arc<dyn LlmClient>) -> Self {
        let resolver = OrderContextResolver::new(store.clone());
        Self { store, llm, resolver }
    }

    /// Answer an order query. Returns the empty string once the response
    /// has been spoken; a non-empty return is a message the caller should
    /// deliver (apologies and guidance included).
    pub async fn respond(
        &self,
        query: &str,
        profile: &UserProfile,
        context: &mut OrderContext,
        voice: &dyn VoiceChannel,
    ) -> String {
        let resolution =
            self.resolver.resolve(query, context.current_order_id(), profile).await;

        if let Some(message) = self.refresh_context(&resolution, context).await {
            return message;
        }

        let Some(details) = context.current_details() else {
            return if resolution.order_ids.is_empty() && !resolution.explanation.is_empty() {
                resolution.explanation
            } else {
                NO_DETAILS.to_string()
            };
        };

        let (open_count, closed_count) = self.order_counts(profile).await;
        let details_json = serde_json::to_string_pretty(details).unwrap_or_default();
        let user_message = normalize_whitespace(&format!(
            "Query: {query}, Order Selection: {explanation}, OpenOrdersCount: {open_count}, \
             Closed/Completed OrdersCount: {closed_count}, Available Order Details: {details_json}, \
             Provide a direct and short answer using only the information from the specified \
             order. Put '.' at last if a sentence.",
            explanation = context.explanation(),
        ));

        let messages = [
            ChatMessage::system(role_system_prompt(profile.role)),
            ChatMessage::user(user_message),
        ];

        self.stream_spoken_answer(&messages, voice).await
    }

    /// Load the resolved order into the session context when a switch is
    /// needed. Returns a user-facing message on failure.
    async fn refresh_context(
        &self,
        resolution: &Resolution,
        context: &mut OrderContext,
    ) -> Option<String> {
        if !resolution.should_switch && context.current_order_id().is_some() {
            return None;
        }

        let &new_order_id = resolution.order_ids.first()?;
        if context.current_order_id() == Some(new_order_id) && context.current_details().is_some()
        {
            return None;
        }

        let documents = match self.store.find_orders_by_ids(&resolution.order_ids).await {
            Ok(documents) => documents,
            Err(db_error) => {
                error!(error = %db_error, "order detail fetch failed");
                return Some(FETCH_FAILED.to_string());
            }
        };
        if documents.is_empty() {
            return Some(FETCH_FAILED.to_string());
        }

        let details = build_details(&documents);
        context.set_current(new_order_id, details, resolution.explanation.clone());
        None
    }

    async fn order_counts(&self, profile: &UserProfile) -> (usize, usize) {
        let documents = match self.store.find_orders_by_ids(&profile.order_ids).await {
            Ok(documents) => documents,
            Err(db_error) => {
                warn!(error = %db_error, "order count fetch failed");
                return (0, 0);
            }
        };

        let open = documents
            .iter()
            .filter(|doc| doc.order.status_label().eq_ignore_ascii_case("open"))
            .count();
        let closed = documents
            .iter()
            .filter(|doc| {
                matches!(
                    doc.order.status_label().to_ascii_lowercase().as_str(),
                    "closed" | "completed"
                )
            })
            .count();
        (open, closed)
    }

    async fn stream_spoken_answer(
        &self,
        messages: &[ChatMessage],
        voice: &dyn VoiceChannel,
    ) -> String {
        let mut stream = match self.llm.stream_complete(messages, &ChatParams::default()).await {
            Ok(stream) => stream,
            Err(llm_error) => {
                error!(error = %llm_error, "llm stream failed");
                return PROCESSING_FAILED.to_string();
            }
        };

        let mut buffer = String::new();
        while let Some(delta) = stream.recv().await {
            buffer.push_str(&delta);
            if ends_at_sentence_boundary(&buffer) {
                let sentence = buffer.trim();
                if !sentence.is_empty() && voice.speak(sentence).await.is_err() {
                    warn!("voice playback failed mid-stream");
                }
                buffer.clear();
            }
        }

        let remainder = buffer.trim();
        if !remainder.is_empty() && voice.speak(remainder).await.is_err() {
            warn!("voice playback failed on final fragment");
        }

        String::new()
    }
}

/// Shape order documents for the prompt: one entry per order, deleted
/// permit routes dropped, null fields scrubbed.
fn build_details(documents: &[OrderDocument]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = documents
        .iter()
        .map(|document| {
            let mut order = document.order.clone();
            order.routes.retain(|route| !route.is_deleted());
            let order_json =
                serde_json::to_value(&order).unwrap_or(serde_json::Value::Null);
            serde_json::json!({
                "Order ID": document.id,
                "Order Details": scrub_nulls(order_json),
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

/// Recursively drop null values so the prompt only carries populated
/// fields.
fn scrub_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, scrub_nulls(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.into_iter().filter(|v| !v.is_null()).map(scrub_nulls).collect(),
        ),
        other => other,
    }
}
