// OpenAI-compatible chat completions adapter
//
// OpenAI, OpenRouter, Groq and GLM all expose the same
// `POST {base}/chat/completions` contract; only the base URL differs.
// Transient rate limits are retried by the client with backoff; an
// exhausted quota surfaces at once.

use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppResult, GenerationError, LLMProvider, LLMRequest, LLMResponse, TokenUsage,
};
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const GLM_API_BASE: &str = "https://api.z.ai/api/paas/v4";

pub fn default_api_base(provider: &LLMProvider) -> &'static str {
    match provider {
        LLMProvider::OpenRouter => OPENROUTER_API_BASE,
        LLMProvider::Groq => GROQ_API_BASE,
        LLMProvider::GLM => GLM_API_BASE,
        LLMProvider::OpenAI | LLMProvider::Google => OPENAI_API_BASE,
    }
}

pub struct OpenAIAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAIAdapter {
    pub fn new_with_api_base(api_key: &str, api_base: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, api_base)
    }

    pub fn with_client(http_client: reqwest::Client, api_key: &str, api_base: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));
        Self {
            client: Client::with_config(config).with_http_client(http_client),
        }
    }
}

#[allow(deprecated)]
fn build_request(request: &LLMRequest) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system_instruction {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.as_str())
                .build()?
                .into(),
        );
    }
    for m in &request.messages {
        let message: ChatCompletionRequestMessage = if m.role == "assistant" {
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(m.content.as_str())
                .build()?
                .into()
        } else {
            ChatCompletionRequestUserMessageArgs::default()
                .content(m.content.as_str())
                .build()?
                .into()
        };
        messages.push(message);
    }

    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(request.model.as_str()).messages(messages);
    // `max_tokens` rather than `max_completion_tokens`: Groq and GLM only accept the former.
    if let Some(max_tokens) = request.max_tokens {
        args.max_tokens(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        args.temperature(temperature);
    }
    args.build()
}

/// Sort client failures into quota, network and request problems.
fn classify(err: OpenAIError) -> GenerationError {
    match err {
        OpenAIError::ApiError(api) => {
            let detail = api.to_string().to_lowercase();
            let message = format!("chat completion failed: {}", api.message);
            if detail.contains("quota") || detail.contains("rate limit") || detail.contains("rate_limit") {
                GenerationError::quota(message)
            } else if detail.contains("server_error") || detail.contains("overloaded") {
                GenerationError::network(message)
            } else {
                GenerationError::invalid_request(message)
            }
        }
        OpenAIError::Reqwest(e) => GenerationError::from(e),
        OpenAIError::InvalidArgument(message) => GenerationError::invalid_request(message),
        other => GenerationError::network(format!("undecodable chat completion response: {}", other)),
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let body = build_request(request).map_err(classify)?;
        let response = self.client.chat().create(body).await.map_err(classify)?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::network("chat completion returned no choices"))?;

        let finish_reason = choice
            .finish_reason
            .and_then(|reason| serde_json::to_value(reason).ok())
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| "stop".to_string());

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage,
        })
    }
}
