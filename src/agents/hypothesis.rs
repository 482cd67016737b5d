//! Hypothesis Validator Agent
//!
//! Scores a hypothesis against the seven-criterion rubric and proposes
//! alternative hypotheses for the research question.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::parser::ResponseParser;
use crate::agents::prompts::{PromptBuilder, TaskInputs, TaskKind, DEFAULT_ALTERNATIVE_COUNT};
use crate::agents::report_parse_warnings;
use crate::llm::{GenerationOptions, LLM};
use crate::models::{AlternativeHypotheses, AssessmentLevel, HypothesisValidation, ResearchRecord};
use crate::store::ResearchStore;
use crate::types::AppResult;

const SYSTEM_INSTRUCTION: &str = "You are an expert research methodologist. Score hypotheses \
strictly and report every score on its own labeled line.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypothesisRequest {
    pub hypothesis: String,
    /// Falls back to the stored research question.
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlternativesRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

pub struct HypothesisValidatorAgent {
    llm: Arc<LLM>,
    options: GenerationOptions,
}

impl HypothesisValidatorAgent {
    pub fn new(llm: Arc<LLM>) -> Self {
        Self {
            llm,
            options: GenerationOptions::default()
                .with_temperature(0.4)
                .with_system_instruction(SYSTEM_INSTRUCTION),
        }
    }

    pub async fn validate_hypothesis(
        &self,
        store: &ResearchStore,
        request: HypothesisRequest,
    ) -> AppResult<HypothesisValidation> {
        let snapshot = store.get().await;
        let question = pick_question(request.question, snapshot.active_question());

        let inputs = TaskInputs {
            question: question.clone(),
            hypothesis: Some(request.hypothesis.clone()),
            literature_context: snapshot.latest_review().map(|r| r.raw_response.clone()),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::HypothesisValidation, &inputs)?;

        info!(hypothesis_len = request.hypothesis.len(), "Validating hypothesis");
        let raw = self.llm.generate(&prompt, &self.options).await?;

        let parsed = ResponseParser::parse_hypothesis_validation(&raw);
        report_parse_warnings(TaskKind::HypothesisValidation, &parsed.warnings);

        let validation = HypothesisValidation {
            timestamp: Utc::now(),
            hypothesis_text: request.hypothesis.trim().to_string(),
            question: question.unwrap_or_default(),
            criteria_scores: parsed.criteria_scores,
            overall_score: parsed.overall_score,
            assessment: AssessmentLevel::from_score(parsed.overall_score),
            recommendations: parsed.recommendations,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
            extra: Default::default(),
        };
        store.append(ResearchRecord::Hypothesis(validation.clone())).await?;

        info!(
            overall_score = validation.overall_score,
            assessment = %validation.assessment,
            parse_warnings = validation.parse_warnings.len(),
            "Hypothesis validation completed"
        );
        Ok(validation)
    }

    /// Propose alternatives to the latest stored hypothesis. Nothing is persisted.
    pub async fn generate_alternatives(
        &self,
        store: &ResearchStore,
        request: AlternativesRequest,
    ) -> AppResult<AlternativeHypotheses> {
        let snapshot = store.get().await;
        let question = pick_question(request.question, snapshot.active_question());
        let count = request.count.unwrap_or(DEFAULT_ALTERNATIVE_COUNT).max(1);

        let inputs = TaskInputs {
            question: question.clone(),
            context: request.context,
            literature_context: snapshot.latest_review().map(|r| r.raw_response.clone()),
            hypothesis_context: snapshot.latest_hypothesis().map(|h| h.hypothesis_text.clone()),
            alternative_count: Some(count),
            ..Default::default()
        };
        let prompt = PromptBuilder::build(TaskKind::AlternativeHypotheses, &inputs)?;

        info!(count, "Generating alternative hypotheses");
        let raw = self
            .llm
            .generate(&prompt, &self.options.clone().with_temperature(0.7))
            .await?;

        let parsed = ResponseParser::parse_alternatives(&raw, count);
        report_parse_warnings(TaskKind::AlternativeHypotheses, &parsed.warnings);
        info!(generated = parsed.alternatives.len(), "Alternative hypotheses generated");

        Ok(AlternativeHypotheses {
            timestamp: Utc::now(),
            question: question.unwrap_or_default(),
            alternatives: parsed.alternatives,
            raw_response: parsed.raw_text,
            parse_warnings: parsed.warnings,
        })
    }
}

fn pick_question(explicit: Option<String>, stored: Option<&str>) -> Option<String> {
    explicit
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .or_else(|| stored.map(str::to_string))
}
