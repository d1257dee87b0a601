use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Utterance {
    Recognized(String),
    Silence,
}

impl Utterance {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Recognized(text) => Some(text),
            Self::Silence => None,
        }
    }
}

/// Spoken I/O seam. `speak` suspends until playback (or its fallback)
/// completes; `listen` never errors upward - recognition problems surface
/// as `Silence`.
#[async_trait]
pub trait VoiceChannel: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;
    async fn listen(&self) -> Utterance;
}

/// Text console standing in for the microphone/speaker pair: speaking
/// prints, listening reads a line from stdin.
#[derive(Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VoiceChannel for ConsoleChannel {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        println!("Assistant: {text}");
        Ok(())
    }

    async fn listen(&self) -> Utterance {
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => Utterance::Silence,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    Utterance::Silence
                } else {
                    Utterance::Recognized(trimmed.to_string())
                }
            }
        }
    }
}

/// Scripted channel for tests: replays queued utterances and records
/// everything spoken.
#[derive(Default)]
pub struct ScriptedChannel {
    utterances: Mutex<std::collections::VecDeque<Utterance>>,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    pub fn with_utterances(utterances: Vec<Utterance>) -> Self {
        Self { utterances: Mutex::new(utterances.into()), spoken: Mutex::new(Vec::new()) }
    }

    pub async fn spoken(&self) -> Vec<String> {
        self.spoken.lock().await.clone()
    }
}

#[async_trait]
impl VoiceChannel for ScriptedChannel {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        self.spoken.lock().await.push(text.to_string());
        Ok(())
    }

    async fn listen(&self) -> Utterance {
        self.utterances.lock().await.pop_front().unwrap_or(Utterance::Silence)
    }
}
