use std::sync::Arc;

use tracing::error;

use haulvoice_core::keywords::{
    contains_any, find_state_name, ORDER_SWITCH_KEYWORDS, PROVISION_KEYWORDS,
};
use haulvoice_core::text::split_sentences;
use haulvoice_db::OrderStore;

use crate::llm::{ChatMessage, ChatParams, LlmClient};
use crate::router::TargetSystem;
use crate::speech::{Utterance, VoiceChannel};

const PERMIT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions about permit information. \
     Response should be short and to the point. \
     When listing information in bullet points, end each point with a period.";

// A dead microphone returns silence immediately; bail out instead of
// spinning on the listen loop forever.
const MAX_CONSECUTIVE_SILENCE: u32 = 5;

/// Per-state permit Q&A over the active order's route data.
pub struct PermitAssistant {
    store: Arc<dyn OrderStore>,
    llm: Arc<dyn LlmClient>,
    fast_model: Option<String>,
}

impl PermitAssistant {
    pub fn new(
        store: Arc<dyn OrderStore>,
        llm: Arc<dyn LlmClient>,
        fast_model: Option<String>,
    ) -> Self {
        Self { store, llm, fast_model }
    }

    /// Interactive permit loop for one order. Returns the system to switch
    /// to when the user leaves.
    pub async fn run_session(&self, order_id: i64, voice: &dyn VoiceChannel) -> TargetSystem {
        let _ = voice.speak("What would you like to know about permits?").await;

        let mut current_state: Option<String> = None;
        let mut current_permit_info: Option<serde_json::Value> = None;
        let mut silent_turns = 0u32;

        loop {
            let query = match voice.listen().await {
                Utterance::Recognized(text) => {
                    silent_turns = 0;
                    text
                }
                Utterance::Silence => {
                    silent_turns += 1;
                    if silent_turns >= MAX_CONSECUTIVE_SILENCE {
                        return TargetSystem::Orders;
                    }
                    continue;
                }
            };

            if contains_any(&query, ORDER_SWITCH_KEYWORDS) {
                let _ = voice.speak("Switching back to order system").await;
                return TargetSystem::Orders;
            }
            if contains_any(&query, PROVISION_KEYWORDS) {
                return TargetSystem::StateInfo;
            }
            if query.eq_ignore_ascii_case("exit") {
                return TargetSystem::Exit;
            }

            if let Some(state_name) = find_state_name(&query) {
                if current_state.as_deref() != Some(state_name) {
                    match self.lookup_permit_info(order_id, state_name).await {
                        Some(permit_info) => {
                            let _ = voice
                                .speak(&format!(
                                    "Switching to {state_name} permit information."
                                ))
                                .await;
                            current_state = Some(state_name.to_string());
                            current_permit_info = Some(permit_info);
                        }
                        None => {
                            let _ = voice
                                .speak(&format!(
                                    "No permit information found for {state_name}."
                                ))
                                .await;
                            current_state = None;
                            current_permit_info = None;
                            continue;
                        }
                    }
                }
            }

            let (Some(state_name), Some(permit_info)) = (&current_state, &current_permit_info)
            else {
                let _ = voice.speak("Please specify a state first.").await;
                continue;
            };

            let system_message = format!(
                "{PERMIT_SYSTEM_PROMPT} Here is the permit information for {state_name}: \
                 {permit_info}"
            );
            let messages =
                [ChatMessage::system(system_message), ChatMessage::user(query.clone())];
            let params = ChatParams { model: self.fast_model.clone(), ..ChatParams::default() };

            match self.llm.complete(&messages, &params).await {
                Ok(answer) => {
                    for sentence in split_sentences(&answer) {
                        let _ = voice.speak(&sentence).await;
                    }
                }
                Err(llm_error) => {
                    error!(error = %llm_error, "permit answer generation failed");
                    let _ = voice
                        .speak("Sorry, I encountered an error while processing your request.")
                        .await;
                }
            }
        }
    }

    async fn lookup_permit_info(
        &self,
        order_id: i64,
        state_name: &str,
    ) -> Option<serde_json::Value> {
        let document = match self.store.find_order_by_id(order_id).await {
            Ok(document) => document?,
            Err(db_error) => {
                error!(error = %db_error, order_id, "permit info lookup failed");
                return None;
            }
        };

        document
            .order
            .active_routes()
            .into_iter()
            .find(|route| route.state_label().eq_ignore_ascii_case(state_name))
            .and_then(|route| route.permit_info.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haulvoice_core::domain::order::{Order, OrderDocument, Route};
    use haulvoice_db::InMemoryOrderStore;

    use crate::llm::ScriptedLlm;
    use crate::router::TargetSystem;
    use crate::speech::{ScriptedChannel, Utterance};

    use super::PermitAssistant;

    fn store_with_permit_order() -> Arc<InMemoryOrderStore> {
        Arc::new(InMemoryOrderStore::with_orders(vec![OrderDocument {
            id: 4100,
            order: Order {
                order_status: Some("Open".to_string()),
                routes: vec![Route {
                    state_name: Some("Texas".to_string()),
                    permit_status: Some("Approved".to_string()),
                    permit_info: Some(serde_json::json!({"number": "TX-7741"})),
                    ..Route::default()
                }],
                ..Order::default()
            },
        }]))
    }

    #[tokio::test]
    async fn answers_state_questions_from_route_permit_info() {
        let llm = Arc::new(ScriptedLlm::with_responses(vec![Ok(
            "The Texas permit number is TX-7741.".to_string(),
        )]));
        let assistant = PermitAssistant::new(store_with_permit_order(), llm.clone(), None);
        let voice = ScriptedChannel::with_utterances(vec![
            Utterance::Recognized("what is the permit number for Texas".to_string()),
            Utterance::Recognized("go back to orders".to_string()),
        ]);

        let outcome = assistant.run_session(4100, &voice).await;
        assert_eq!(outcome, TargetSystem::Orders);

        let spoken = voice.spoken().await;
        assert!(spoken.iter().any(|s| s == "Switching to Texas permit information."));
        assert!(spoken.iter().any(|s| s == "The Texas permit number is TX-7741."));

        let requests = llm.requests().await;
        assert!(requests[0][0].content.contains("TX-7741"));
    }

    #[tokio::test]
    async fn unknown_state_prompts_for_another() {
        let assistant = PermitAssistant::new(
            store_with_permit_order(),
            Arc::new(ScriptedLlm::default()),
            None,
        );
        let voice = ScriptedChannel::with_utterances(vec![
            Utterance::Recognized("permits for Ohio".to_string()),
            Utterance::Recognized("exit".to_string()),
        ]);

        let outcome = assistant.run_session(4100, &voice).await;
        assert_eq!(outcome, TargetSystem::Exit);

        let spoken = voice.spoken().await;
        assert!(spoken.iter().any(|s| s == "No permit information found for Ohio."));
    }

    #[tokio::test]
    async fn questions_without_a_state_ask_for_one() {
        let assistant = PermitAssistant::new(
            store_with_permit_order(),
            Arc::new(ScriptedLlm::default()),
            None,
        );
        let voice = ScriptedChannel::with_utterances(vec![Utterance::Recognized(
            "how much is the fee".to_string(),
        )]);

        let outcome = assistant.run_session(4100, &voice).await;
        // Script runs dry afterward; the silence guard ends the session.
        assert_eq!(outcome, TargetSystem::Orders);

        let spoken = voice.spoken().await;
        assert!(spoken.iter().any(|s| s == "Please specify a state first."));
    }
}
