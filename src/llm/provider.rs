use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse};

/// The remote text-generation capability: prompt in, text out.
///
/// Adapters report remote faults as `AppError::Generation` so callers can
/// tell quota, network and request problems apart.
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Per-call generation knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_instruction: Option<String>,
}

impl GenerationOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// Configuration for an LLM provider connection.
pub struct LLMProviderConfig {
    pub provider: LLMProvider,
    pub api_key: String,
    pub api_base: Option<String>,
    pub timeout: Duration,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
    model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig, model: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(provider.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let adapter: Box<dyn LLMAdapter> = match provider.provider {
            LLMProvider::Google => Box::new(crate::llm::google::GoogleAdapter::with_client(
                client,
                &provider.api_key,
                provider.api_base.as_deref(),
            )),
            LLMProvider::OpenAI
            | LLMProvider::OpenRouter
            | LLMProvider::Groq
            | LLMProvider::GLM => Box::new(crate::llm::openai::OpenAIAdapter::with_client(
                client,
                &provider.api_key,
                provider
                    .api_base
                    .as_deref()
                    .unwrap_or_else(|| crate::llm::openai::default_api_base(&provider.provider)),
            )),
        };

        Ok(Self {
            adapter,
            provider_name: provider.provider.to_string(),
            model: model.into(),
            default_temperature: None,
            default_max_tokens: None,
        })
    }

    /// Build the facade from application configuration.
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let provider: LLMProvider = config.provider.parse()?;
        let api_key = config.active_api_key().ok_or_else(|| {
            AppError::Config(format!("No API key configured for provider '{}'", provider))
        })?;

        let mut llm = Self::new(
            LLMProviderConfig {
                provider,
                api_key,
                api_base: config.api_base.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
            },
            config.model.clone(),
        )?;
        llm.default_temperature = config.temperature;
        llm.default_max_tokens = Some(config.max_tokens);
        Ok(llm)
    }

    /// Wrap an arbitrary adapter, e.g. a local model or a test double.
    pub fn from_adapter(
        adapter: Box<dyn LLMAdapter>,
        provider_name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            provider_name: provider_name.into(),
            model: model.into(),
            default_temperature: None,
            default_max_tokens: None,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Send a single prompt and return the reply text.
    ///
    /// A configured temperature overrides the per-call one so operators can
    /// pin sampling for every agent at once.
    pub async fn generate(&self, prompt: &str, options: &GenerationOptions) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: options.max_tokens.or(self.default_max_tokens),
            temperature: self.default_temperature.or(options.temperature),
            system_instruction: options.system_instruction.clone(),
        };

        debug!(
            provider = %self.provider_name,
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending generation request"
        );

        match self.create_chat_completion(&request).await {
            Ok(response) => {
                debug!(
                    response_len = response.content.len(),
                    finish_reason = %response.finish_reason,
                    total_tokens = response.usage.total_tokens,
                    "Generation completed"
                );
                Ok(response.content)
            }
            Err(e) => {
                error!(provider = %self.provider_name, error = %e, "Generation failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationError, TokenUsage};
    use std::sync::Mutex;

    struct RecordingAdapter {
        seen: Mutex<Vec<LLMRequest>>,
    }

    #[async_trait]
    impl LLMAdapter for RecordingAdapter {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.seen.lock().unwrap().push(request.clone());
            if request.messages[0].content == "fail" {
                return Err(GenerationError::network("connection reset").into());
            }
            Ok(LLMResponse {
                content: format!("echo: {}", request.messages[0].content),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn test_generate_builds_single_user_message() {
        let llm = LLM::from_adapter(
            Box::new(RecordingAdapter { seen: Mutex::new(Vec::new()) }),
            "test",
            "test-model",
        );
        let options = GenerationOptions::default()
            .with_temperature(0.3)
            .with_system_instruction("be brief");

        let text = llm.generate("hello", &options).await.unwrap();
        assert_eq!(text, "echo: hello");
        assert_eq!(llm.model(), "test-model");
    }

    #[tokio::test]
    async fn test_generate_propagates_generation_error() {
        let llm = LLM::from_adapter(
            Box::new(RecordingAdapter { seen: Mutex::new(Vec::new()) }),
            "test",
            "test-model",
        );
        let err = llm.generate("fail", &GenerationOptions::default()).await.unwrap_err();
        match err {
            AppError::Generation(e) => assert_eq!(e.reason, crate::types::GenerationFailure::Network),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LLMConfig {
            provider: "google".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            api_base: None,
            temperature: None,
            max_tokens: 1024,
            timeout_secs: 30,
        };
        assert!(matches!(LLM::from_config(&config), Err(AppError::Config(_))));
    }
}
