use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use haulvoice_core::config::LlmConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChatParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Chat completion seam. Both calls suspend cooperatively; `stream_complete`
/// yields a finite, non-restartable sequence of text deltas.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String>;

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        params: &ChatParams,
    ) -> Result<mpsc::Receiver<String>>;
}

/// Client for OpenAI-compatible chat endpoints (Groq, OpenAI, Ollama).
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    default_model: String,
    default_temperature: f32,
    default_max_tokens: u32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow!("llm.base_url is not configured"))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("building llm http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
        })
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        params: &'a ChatParams,
        stream: bool,
    ) -> CompletionRequest<'a> {
        CompletionRequest {
            model: params.model.as_deref().unwrap_or(&self.default_model),
            messages,
            temperature: params.temperature.unwrap_or(self.default_temperature),
            max_tokens: params.max_tokens.unwrap_or(self.default_max_tokens),
            stream,
        }
    }

    fn completions_request(&self, body: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let mut request =
            self.http.post(format!("{}/chat/completions", self.base_url)).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        request
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
        let body = self.request_body(messages, params, false);
        let response = self
            .completions_request(&body)
            .send()
            .await
            .context("sending chat completion request")?
            .error_for_status()
            .context("chat completion returned an error status")?;

        let parsed: CompletionResponse =
            response.json().await.context("decoding chat completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        params: &ChatParams,
    ) -> Result<mpsc::Receiver<String>> {
        let body = self.request_body(messages, params, true);
        let mut response = self
            .completions_request(&body)
            .send()
            .await
            .context("sending streaming chat completion request")?
            .error_for_status()
            .context("streaming chat completion returned an error status")?;

        let (sender, receiver) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut pending = String::new();
            while let Ok(Some(chunk)) = response.chunk().await {
                pending.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = pending.find('\n') {
                    let line = pending[..newline].trim().to_string();
                    pending.drain(..=newline);

                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        return;
                    }

                    let Ok(parsed) = serde_json::from_str::<StreamChunk>(payload) else {
                        continue;
                    };
                    let Some(delta) =
                        parsed.choices.into_iter().next().and_then(|choice| choice.delta.content)
                    else {
                        continue;
                    };
                    if !delta.is_empty() && sender.send(delta).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(receiver)
    }
}

/// Scripted LLM double: replays canned completions and records the prompts
/// it was asked.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: tokio::sync::Mutex<std::collections::VecDeque<Result<String, String>>>,
    requests: tokio::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn with_responses(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: tokio::sync::Mutex::new(responses.into()),
            requests: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().await.push(messages.to_vec());
        match self.responses.lock().await.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(anyhow!(error)),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage], _params: &ChatParams) -> Result<String> {
        self.next_response(messages).await
    }

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        _params: &ChatParams,
    ) -> Result<mpsc::Receiver<String>> {
        let full = self.next_response(messages).await?;
        let (sender, receiver) = mpsc::channel(32);
        tokio::spawn(async move {
            // Replay word-by-word so sentence-boundary buffering is exercised.
            for word in full.split_inclusive(' ') {
                if sender.send(word.to_string()).await.is_err() {
                    return;
                }
            }
        });
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, ChatParams, LlmClient, ScriptedLlm};

    #[tokio::test]
    async fn scripted_llm_replays_responses_in_order() {
        let llm = ScriptedLlm::with_responses(vec![
            Ok("first".to_string()),
            Err("boom".to_string()),
        ]);

        let params = ChatParams::default();
        let first = llm.complete(&[ChatMessage::user("one")], &params).await.expect("first");
        assert_eq!(first, "first");

        let second = llm.complete(&[ChatMessage::user("two")], &params).await;
        assert!(second.is_err());

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0][0].content, "one");
    }

    #[tokio::test]
    async fn scripted_stream_reassembles_to_full_text() {
        let llm = ScriptedLlm::with_responses(vec![Ok("The permit is approved.".to_string())]);
        let mut stream = llm
            .stream_complete(&[ChatMessage::user("status?")], &ChatParams::default())
            .await
            .expect("stream");

        let mut assembled = String::new();
        while let Some(delta) = stream.recv().await {
            assembled.push_str(&delta);
        }
        assert_eq!(assembled, "The permit is approved.");
    }
}
