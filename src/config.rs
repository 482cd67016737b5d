use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::types::LLMProvider;

const WORKSPACE_DIR_NAME: &str = "research-collaborator";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    pub dir: PathBuf,
}

impl LLMConfig {
    /// The credential to use for the configured provider, if one is set.
    pub fn active_api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "google".to_string());
        let provider_kind: LLMProvider = provider.parse()?;

        Ok(Self {
            llm: LLMConfig {
                api_key: env::var("LLM_API_KEY")
                    .ok()
                    .or_else(|| env::var(provider_key_var(&provider_kind)).ok()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| default_model(&provider_kind).to_string()),
                provider,
                api_base: env::var("LLM_API_BASE").ok(),
                temperature: env::var("LLM_TEMPERATURE").ok().map(|t| t.parse::<f32>()).transpose()?,
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .unwrap_or_else(|_| "4096".to_string())
                    .parse()?,
                timeout_secs: env::var("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            workspace: WorkspaceConfig {
                dir: env::var("RESEARCH_WORKSPACE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_workspace_dir()),
            },
        })
    }
}

fn provider_key_var(provider: &LLMProvider) -> &'static str {
    match provider {
        LLMProvider::Google => "GOOGLE_API_KEY",
        LLMProvider::OpenAI => "OPENAI_API_KEY",
        LLMProvider::OpenRouter => "OPENROUTER_API_KEY",
        LLMProvider::Groq => "GROQ_API_KEY",
        LLMProvider::GLM => "GLM_API_KEY",
    }
}

fn default_model(provider: &LLMProvider) -> &'static str {
    match provider {
        LLMProvider::Google => "gemini-2.0-flash",
        LLMProvider::OpenAI => "gpt-4o-mini",
        LLMProvider::OpenRouter => "google/gemini-2.0-flash-001",
        LLMProvider::Groq => "llama-3.3-70b-versatile",
        LLMProvider::GLM => "glm-4.7-flash",
    }
}

fn default_workspace_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(WORKSPACE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./workspace"))
}
