//! Agent System
//!
//! Each agent turns one research task into a typed record:
//!
//! ```text
//! TaskInputs
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Prompt    │  → validates inputs, renders format instructions
//! │   Builder   │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │     LLM     │  → one generation call, outside any store lock
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Response   │  → never fails, defaults carry ParseWarnings
//! │   Parser    │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Research   │  → single atomic commit
//! │   Store     │
//! └─────────────┘
//! ```
//!
//! Agents hold no workspace state of their own; the store is passed to
//! every call. A generation failure returns before the store is touched.

pub mod prompts;
pub mod parser;
pub mod literature;
pub mod hypothesis;
pub mod draft;

pub use prompts::{PromptBuilder, TaskInputs, TaskKind};
pub use parser::{ParsedResult, ResponseParser};
pub use literature::{LiteratureReviewAgent, LiteratureReviewRequest};
pub use hypothesis::{AlternativesRequest, HypothesisRequest, HypothesisValidatorAgent};
pub use draft::{ComparisonRequest, DraftPolisherAgent, PolishRequest};

use crate::models::ParseWarning;
use tracing::warn;

/// Log a degraded parse. Warnings never fail the operation.
pub(crate) fn report_parse_warnings(task: TaskKind, warnings: &[ParseWarning]) {
    if warnings.is_empty() {
        return;
    }
    let details: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    warn!(
        task = %task,
        warning_count = warnings.len(),
        warnings = ?details,
        "Model reply parsed with defaults"
    );
}
