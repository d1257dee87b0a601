use std::sync::Arc;

use tracing::error;

use haulvoice_core::keywords::{
    contains_any, find_state_name, ORDER_SWITCH_KEYWORDS, PERMIT_SWITCH_KEYWORDS,
};
use haulvoice_core::text::split_sentences;
use haulvoice_db::StateStore;

use crate::llm::{ChatMessage, ChatParams, LlmClient};
use crate::router::TargetSystem;
use crate::speech::{Utterance, VoiceChannel};

const MAX_CONSECUTIVE_SILENCE: u32 = 5;

/// Q&A over state/province transportation regulations.
pub struct StateInfoAssistant {
    states: Arc<dyn StateStore>,
    llm: Arc<dyn LlmClient>,
    fast_model: Option<String>,
}

impl StateInfoAssistant {
    pub fn new(
        states: Arc<dyn StateStore>,
        llm: Arc<dyn LlmClient>,
        fast_model: Option<String>,
    ) -> Self {
        Self { states, llm, fast_model }
    }

    /// Interactive state-regulation loop. `initial_query` carries the
    /// utterance that routed the user here so it is answered without a
    /// second prompt.
    pub async fn run_session(
        &self,
        initial_query: Option<String>,
        voice: &dyn VoiceChannel,
    ) -> TargetSystem {
        let mut pending_query = initial_query;
        let mut current_state: Option<String> = None;
        let mut silent_turns = 0u32;

        loop {
            let query = match pending_query.take() {
                Some(query) => query,
                None => match voice.listen().await {
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
                },
            };

            if matches!(query.to_ascii_lowercase().as_str(), "quit" | "exit") {
                return TargetSystem::Exit;
            }
            if contains_any(&query, ORDER_SWITCH_KEYWORDS) {
                let _ = voice.speak("Switching back to order system...").await;
                return TargetSystem::Orders;
            }
            if contains_any(&query, PERMIT_SWITCH_KEYWORDS) {
                return TargetSystem::PermitInfo;
            }

            if let Some(state_name) = find_state_name(&query) {
                current_state = Some(state_name.to_string());
            }

            let Some(state_name) = current_state.clone() else {
                let _ = voice.speak("Please mention a valid state name in your question.").await;
                continue;
            };

            let state_info = match self.states.find_state_info(&state_name).await {
                Ok(Some(info)) => info,
                Ok(None) => {
                    let _ = voice
                        .speak("State not found in database. Please try another state.")
                        .await;
                    current_state = None;
                    continue;
                }
                Err(db_error) => {
                    error!(error = %db_error, state = %state_name, "state info lookup failed");
                    let _ = voice
                        .speak("Sorry, I'm having trouble reaching the order system. Please try again shortly.")
                        .await;
                    continue;
                }
            };

            let _ = voice.speak("Let me check that information for you.").await;

            let prompt = format!(
                "Based on this information about {state_name}: State Information: {state_info}\n\n\
                 Question: {query}\n(Response should be short, relevant to the question)."
            );
            let params = ChatParams {
                model: self.fast_model.clone(),
                temperature: Some(0.2),
                ..ChatParams::default()
            };

            match self.llm.complete(&[ChatMessage::user(prompt)], &params).await {
                Ok(answer) => {
                    for sentence in split_sentences(&answer) {
                        let _ = voice.speak(&sentence).await;
                    }
                }
                Err(llm_error) => {
                    error!(error = %llm_error, "state info answer generation failed");
                    let _ = voice
                        .speak("Sorry, I encountered an error while processing your request.")
                        .await;
                }
            }
        }
    }
}
