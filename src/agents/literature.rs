//! Literature Review Agent
//!
//! Synthesizes the workspace's citations and notes into themes, gaps and
//! recommendations, and separately grades the quality of a citation list.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::parser::ResponseParser;
use crate::agents::prompts::{PromptBuilder, TaskInputs, TaskKind};
use crate::agents::report_parse_warnings;
use crate::llm::{GenerationOptions, LLM};
use crate::models::{LiteratureReview, ResearchRecord, SourceInputs, SourceQualityReport};
use crate::store::{ResearchStore, StateChange};
use crate::types::{AppError, AppResult};

const SYSTEM_INSTRUCTION: &str = "You are an expert academic researcher who writes rigorous, \
well-organized literature reviews. Follow the requested output format exactly.";

/// Inputs for a literature review. New citations and notes are added to
/// the workspace together with the review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiteratureReviewRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

pub struct LiteratureReviewAgent {
    llm: Arc<LLM>,
    options: GenerationOptions,
}

impl LiteratureReviewAgent {
    pub fn new(llm: Arc<LLM>) -> Self {
        Self {
            llm,
            options: GenerationOptions::default()
                .with_temperature(0.3)
                .with_system_instruction(SYSTEM_INSTRUCTION),
        }
    }

    /// Review every stored source plus the ones in `request`, then commit
    /// the question, the new sources and the review in one write.
    pub async fn conduct_literature_review(
        &self,
        store: &ResearchStore,
        request: LiteratureReviewRequest,
    ) -> AppResult<LiteratureReview> {
        let snapshot = store.get().await;

        let explicit_question = request
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let question = explicit_question
            .clone()
            .or_else(|| snapshot.active_question().map(str::to_string));

        let new_citations = non_blank(request.citations);
        let new_notes = non_blank(request.notes);
        let source_inputs = SourceInputs {
            citations: snapshot.citations.iter().cloned().chain(new_citations.iter().cloned()).collect(),
            notes: snapshot.notes.iter().cloned().chain(new_notes.iter().cloned()).collect(),
        };

        let inputs = TaskInputs {
            question: question.clone(),
            citations: source_inputs.citations.clone(),
            notes: source_inputs.notes.clone(),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::LiteratureReview, &inputs)?;

        info!(
            citations = source_inputs.citations.len(),
            notes = source_inputs.notes.len(),
            "Starting literature review"
        );
        let raw = self.llm.generate(&prompt, &self.options).await?;

        let parsed = ResponseParser::parse_literature_review(&raw);
        report_parse_warnings(TaskKind::LiteratureReview, &parsed.warnings);

        let review = LiteratureReview {
            timestamp: Utc::now(),
            question: question.unwrap_or_default(),
            source_inputs,
            themes: parsed.themes,
            gaps: parsed.gaps,
            recommendations: parsed.recommendations,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
            extra: Default::default(),
        };

        let mut changes = Vec::with_capacity(4);
        if let Some(question) = explicit_question {
            changes.push(StateChange::SetQuestion(question));
        }
        if !new_citations.is_empty() {
            changes.push(StateChange::AddCitations(new_citations));
        }
        if !new_notes.is_empty() {
            changes.push(StateChange::AddNotes(new_notes));
        }
        changes.push(StateChange::Append(ResearchRecord::LiteratureReview(review.clone())));
        store.apply(changes).await?;

        info!(
            themes = review.themes.len(),
            gaps = review.gaps.len(),
            recommendations = review.recommendations.len(),
            parse_warnings = review.parse_warnings.len(),
            "Literature review completed"
        );
        Ok(review)
    }

    /// Grade a citation list, defaulting to the stored citations. Nothing is persisted.
    pub async fn analyze_source_quality(
        &self,
        store: &ResearchStore,
        citations: Vec<String>,
    ) -> AppResult<SourceQualityReport> {
        let mut citations = non_blank(citations);
        if citations.is_empty() {
            citations = store.get().await.citations;
        }
        if citations.is_empty() {
            return Err(AppError::invalid_input(
                "source quality analysis requires at least one citation",
            ));
        }

        let inputs = TaskInputs {
            citations: citations.clone(),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::SourceQuality, &inputs)?;

        info!(sources = citations.len(), "Analyzing source quality");
        let raw = self
            .llm
            .generate(&prompt, &self.options.clone().with_temperature(0.2))
            .await?;

        let parsed = ResponseParser::parse_source_quality(&raw);
        report_parse_warnings(TaskKind::SourceQuality, &parsed.warnings);
        info!(quality_score = parsed.quality_score, "Source quality analysis completed");

        Ok(SourceQualityReport {
            timestamp: Utc::now(),
            sources_count: citations.len(),
            quality_score: parsed.quality_score,
            feedback: parsed.feedback,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
        })
    }
}

fn non_blank(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedAdapter;
    use crate::types::{GenerationError, GenerationFailure};
    use tempfile::TempDir;

    const REVIEW_REPLY: &str = "## Themes\n- Reduced peer interaction\n- Screen fatigue\n\n\
## Gaps\n- Few longitudinal studies\n\n## Recommendations\n- Track cohorts over two years\n";

    #[tokio::test]
    async fn test_review_commits_question_sources_and_record() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok(REVIEW_REPLY.to_string())]);
        let agent = LiteratureReviewAgent::new(script.llm());

        let review = agent
            .conduct_literature_review(
                &store,
                LiteratureReviewRequest {
                    question: Some("Impact of remote learning on engagement?".into()),
                    citations: vec!["Smith, J. (2021). Online cohorts.".into()],
                    notes: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(review.themes.len(), 2);
        assert!(review.themes.contains("Screen fatigue"));
        assert_eq!(review.gaps, vec!["Few longitudinal studies"]);
        assert!(!review.parse_warning());
        assert!(script.last_prompt().contains("Smith, J. (2021). Online cohorts."));

        let state = store.get().await;
        assert_eq!(state.active_question(), Some("Impact of remote learning on engagement?"));
        assert_eq!(state.citations.len(), 1);
        assert_eq!(state.literature_reviews.len(), 1);
        assert!(state.progress.literature_review_completed);
    }

    #[tokio::test]
    async fn test_review_uses_stored_question_and_sources() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Stored question?").await.unwrap();
        store.add_notes(vec!["Attendance dropped".into()]).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok(REVIEW_REPLY.to_string())]);
        let agent = LiteratureReviewAgent::new(script.llm());

        let review = agent
            .conduct_literature_review(&store, LiteratureReviewRequest::default())
            .await
            .unwrap();

        assert_eq!(review.question, "Stored question?");
        assert_eq!(review.source_inputs.notes, vec!["Attendance dropped"]);
        assert_eq!(store.get().await.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_inputs_never_reach_the_model() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok(REVIEW_REPLY.to_string())]);
        let agent = LiteratureReviewAgent::new(script.llm());

        let result = agent
            .conduct_literature_review(
                &store,
                LiteratureReviewRequest {
                    question: Some("Q?".into()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(script.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Err(GenerationError::quota("daily limit"))]);
        let agent = LiteratureReviewAgent::new(script.llm());

        let result = agent
            .conduct_literature_review(
                &store,
                LiteratureReviewRequest {
                    question: Some("Q?".into()),
                    citations: vec!["A (2020)".into()],
                    notes: Vec::new(),
                },
            )
            .await;

        match result {
            Err(AppError::Generation(e)) => assert_eq!(e.reason, GenerationFailure::Quota),
            other => panic!("expected quota failure, got {other:?}"),
        }
        assert_eq!(store.get().await, crate::models::ResearchState::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_source_quality_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.add_citations(vec!["A (2020)".into(), "B (2019)".into()]).await.unwrap();
        let script = ScriptedAdapter::replying(vec![Ok(
            "Overall Source Quality: 7/10\n\n## Feedback\n- Mostly recent\n- Add a meta-analysis\n".to_string(),
        )]);
        let agent = LiteratureReviewAgent::new(script.llm());

        let report = agent.analyze_source_quality(&store, Vec::new()).await.unwrap();
        assert_eq!(report.sources_count, 2);
        assert_eq!(report.quality_score, 7);
        assert_eq!(report.feedback.len(), 2);
        assert!(store.get().await.literature_reviews.is_empty());
    }
}
