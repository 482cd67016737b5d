//! Draft Polisher Agent
//!
//! Revises draft text in one of five polish modes and compares two
//! versions of a text. Polishing reads the question, the latest review and
//! the latest hypothesis from the workspace as context.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::parser::ResponseParser;
use crate::agents::prompts::{PromptBuilder, TaskInputs, TaskKind};
use crate::agents::report_parse_warnings;
use crate::llm::{GenerationOptions, LLM};
use crate::models::{word_count, DraftComparison, DraftVersion, PolishType, ResearchRecord};
use crate::store::ResearchStore;
use crate::types::{AppError, AppResult};

const SYSTEM_INSTRUCTION: &str = "You are an expert academic editor. Preserve the author's \
meaning and return the complete revised text under the requested header.";
const DEFAULT_AUDIENCE: &str = "academic";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolishRequest {
    pub text: String,
    #[serde(default)]
    pub polish_type: PolishType,
    #[serde(default)]
    pub target_audience: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub revised_text: String,
    /// Falls back to the polished text of the latest stored draft.
    #[serde(default)]
    pub original_text: Option<String>,
}

pub struct DraftPolisherAgent {
    llm: Arc<LLM>,
    options: GenerationOptions,
}

impl DraftPolisherAgent {
    pub fn new(llm: Arc<LLM>) -> Self {
        Self {
            llm,
            options: GenerationOptions::default()
                .with_temperature(0.3)
                .with_system_instruction(SYSTEM_INSTRUCTION),
        }
    }

    pub async fn polish_draft(&self, store: &ResearchStore, request: PolishRequest) -> AppResult<DraftVersion> {
        let snapshot = store.get().await;
        let target_audience = request
            .target_audience
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AUDIENCE)
            .to_string();

        let inputs = TaskInputs {
            question: snapshot.active_question().map(str::to_string),
            literature_context: snapshot.latest_review().map(|r| r.raw_response.clone()),
            hypothesis_context: snapshot.latest_hypothesis().map(|h| h.hypothesis_text.clone()),
            draft_text: Some(request.text.clone()),
            polish_type: request.polish_type,
            target_audience: Some(target_audience.clone()),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::DraftPolish, &inputs)?;

        info!(
            polish_type = %request.polish_type,
            words = word_count(&request.text),
            "Polishing draft"
        );
        let raw = self.llm.generate(&prompt, &self.options).await?;

        let parsed = ResponseParser::parse_draft(&raw);
        report_parse_warnings(TaskKind::DraftPolish, &parsed.warnings);

        let polished_text = parsed.polished_text.unwrap_or_else(|| request.text.clone());
        let draft = DraftVersion {
            timestamp: Utc::now(),
            polish_type: request.polish_type,
            target_audience,
            word_count_original: word_count(&request.text),
            word_count_polished: word_count(&polished_text),
            original_text: request.text,
            polished_text,
            quality_score: parsed.quality_score,
            changes_summary: parsed.changes,
            suggestions: parsed.suggestions,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
            extra: Default::default(),
        };
        store.append(ResearchRecord::Draft(draft.clone())).await?;

        info!(
            quality_score = draft.quality_score,
            changes = draft.changes_summary.len(),
            parse_warnings = draft.parse_warnings.len(),
            "Draft polished"
        );
        Ok(draft)
    }

    /// Compare two versions of a text. Nothing is persisted.
    pub async fn compare_drafts(
        &self,
        store: &ResearchStore,
        request: ComparisonRequest,
    ) -> AppResult<DraftComparison> {
        let original = match request.original_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => store
                .get()
                .await
                .latest_draft()
                .map(|d| d.polished_text.clone())
                .ok_or_else(|| {
                    AppError::invalid_input("comparison needs a first version or a stored draft")
                })?,
        };

        let inputs = TaskInputs {
            baseline_text: Some(original.clone()),
            draft_text: Some(request.revised_text.clone()),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::DraftComparison, &inputs)?;

        info!("Comparing draft versions");
        let raw = self
            .llm
            .generate(&prompt, &self.options.clone().with_temperature(0.2))
            .await?;

        let parsed = ResponseParser::parse_comparison(&raw);
        report_parse_warnings(TaskKind::DraftComparison, &parsed.warnings);

        Ok(DraftComparison {
            timestamp: Utc::now(),
            version_a_words: word_count(&original),
            version_b_words: word_count(&request.revised_text),
            version_a_score: parsed.version_a_score,
            version_b_score: parsed.version_b_score,
            differences: parsed.differences,
            recommendation: parsed.recommendation,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedAdapter;
    use tempfile::TempDir;

    const POLISH_REPLY: &str = "POLISHED TEXT:\n\
Remote learning reshapes how students engage with coursework.\n\n\
IMPROVEMENTS MADE:\n- Tightened the opening claim\n- Removed informal wording\n\n\
SUGGESTIONS:\n- Cite attendance data\n\n\
QUALITY SCORE: 7/10\n\
Structure: 8/10\n\
Clarity: 8/10\n\
Academic Style: 7/10\n\
Argument Strength: 6/10\n";

    #[tokio::test]
    async fn test_polish_stores_draft_with_metadata() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Impact of remote learning on engagement?").await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok(POLISH_REPLY.to_string())]);
        let agent = DraftPolisherAgent::new(script.llm());

        let draft = agent
            .polish_draft(
                &store,
                PolishRequest {
                    text: "remote learning is changing stuff for students a lot".into(),
                    polish_type: PolishType::Comprehensive,
                    target_audience: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            draft.polished_text,
            "Remote learning reshapes how students engage with coursework."
        );
        assert_eq!(draft.changes_summary.len(), 2);
        assert_eq!(draft.suggestions, vec!["Cite attendance data"]);
        // Mean of 8, 8, 7, 6 is 7.25.
        assert_eq!(draft.quality_score, 7);
        assert_eq!(draft.target_audience, "academic");
        assert_eq!(draft.word_count_original, 9);
        assert!(script.last_prompt().contains("Research Question: Impact of remote learning"));

        let state = store.get().await;
        assert_eq!(state.drafts.len(), 1);
        assert!(state.progress.draft_polished);
    }

    #[tokio::test]
    async fn test_unstructured_reply_keeps_original_text() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok("Looks fine to me.".to_string())]);
        let agent = DraftPolisherAgent::new(script.llm());

        let draft = agent
            .polish_draft(
                &store,
                PolishRequest {
                    text: "Original sentence.".into(),
                    polish_type: PolishType::Grammar,
                    target_audience: Some("general".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(draft.polished_text, "Original sentence.");
        assert_eq!(draft.quality_score, 5);
        assert!(draft.parse_warning());
        assert_eq!(store.get().await.drafts.len(), 1);
    }

    #[tokio::test]
    async fn test_compare_defaults_to_latest_draft() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(vec![
            Ok(POLISH_REPLY.to_string()),
            Ok("## Key Differences\n- Version 2 adds data\n\n## Quality Comparison\n\
Version 1: 6/10\nVersion 2: 8/10\n\n## Overall Recommendation\nKeep version 2.\n"
                .to_string()),
        ]);
        let agent = DraftPolisherAgent::new(script.llm());
        agent
            .polish_draft(
                &store,
                PolishRequest {
                    text: "draft".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let comparison = agent
            .compare_drafts(
                &store,
                ComparisonRequest {
                    revised_text: "A newer version with attendance data.".into(),
                    original_text: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(comparison.version_a_score, 6);
        assert_eq!(comparison.version_b_score, 8);
        assert_eq!(comparison.differences, vec!["Version 2 adds data"]);
        assert_eq!(comparison.recommendation, "Keep version 2.");
        assert!(script
            .last_prompt()
            .contains("Remote learning reshapes how students engage with coursework."));
        assert_eq!(store.get().await.drafts.len(), 1);
    }

    #[tokio::test]
    async fn test_compare_without_any_baseline_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(Vec::new());
        let agent = DraftPolisherAgent::new(script.llm());

        let result = agent
            .compare_drafts(
                &store,
                ComparisonRequest {
                    revised_text: "v2".into(),
                    original_text: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(script.prompt_count(), 0);
    }
}
