// Research Collaborator - model-assisted literature review, hypothesis validation and draft polishing

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod store;
pub mod progress;
pub mod assistant;
pub mod utils;

// Re-exports for convenience
pub use assistant::ResearchAssistant;
pub use config::Config;
pub use store::{ResearchStore, StateChange};
pub use types::{AppError, AppResult, GenerationError, GenerationFailure};
