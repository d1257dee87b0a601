//! Assistant brain - intent routing, order context resolution, and spoken
//! response generation
//!
//! This crate is the conversational core of haulvoice:
//! - **Intent routing** (`router`) - keyword classification into the state,
//!   permit, and order subsystems with a fixed priority order
//! - **Context resolution** (`context`) - mapping ambiguous references
//!   ("third last order", "#2892") onto concrete order IDs per role
//! - **Response generation** (`conversation`) - LLM-backed answers streamed
//!   to the voice channel at sentence boundaries
//! - **Subsystem Q&A** (`permits`, `states`) - focused question loops over
//!   permit and state-regulation data
//!
//! # Capability seams
//!
//! `LlmClient` and `VoiceChannel` are trait seams with HTTP/console
//! implementations; tests drive them with scripted doubles. The LLM is
//! strictly a phrasing engine - which order is active and which subsystem
//! handles a query are deterministic decisions made here.

pub mod context;
pub mod conversation;
pub mod llm;
pub mod permits;
pub mod router;
pub mod speech;
pub mod states;

pub use context::{OrderContextResolver, Resolution};
pub use conversation::{ConversationLog, ResponseGenerator};
pub use llm::{ChatMessage, ChatParams, HttpLlmClient, LlmClient};
pub use permits::PermitAssistant;
pub use router::{IntentRouter, RoutedIntent, TargetSystem};
pub use speech::{ConsoleChannel, ScriptedChannel, Utterance, VoiceChannel};
pub use states::StateInfoAssistant;
