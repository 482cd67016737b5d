//! Prompt Builder
//!
//! Renders the instruction sent to the model for each task. Every template
//! spells out the exact section headers and `Label: N/10` score lines the
//! response parser looks for, since the generation API enforces no schema.

use crate::models::{Criterion, PolishType};
use crate::types::{AppError, AppResult};

/// Characters of the latest literature review carried into hypothesis prompts.
pub const HYPOTHESIS_REVIEW_CONTEXT_CHARS: usize = 500;
/// Characters of the latest literature review carried into draft prompts.
pub const DRAFT_REVIEW_CONTEXT_CHARS: usize = 300;
pub const DEFAULT_ALTERNATIVE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    LiteratureReview,
    SourceQuality,
    HypothesisValidation,
    AlternativeHypotheses,
    DraftPolish,
    DraftComparison,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskKind::LiteratureReview => "literature_review",
            TaskKind::SourceQuality => "source_quality",
            TaskKind::HypothesisValidation => "hypothesis_validation",
            TaskKind::AlternativeHypotheses => "alternative_hypotheses",
            TaskKind::DraftPolish => "draft_polish",
            TaskKind::DraftComparison => "draft_comparison",
        };
        f.write_str(name)
    }
}

/// Everything a prompt may draw on. Each task reads only its own fields.
#[derive(Debug, Clone, Default)]
pub struct TaskInputs {
    pub question: Option<String>,
    pub citations: Vec<String>,
    pub notes: Vec<String>,
    pub hypothesis: Option<String>,
    /// Free-form extra context supplied by the caller.
    pub context: Option<String>,
    /// Excerpt of the latest stored literature review.
    pub literature_context: Option<String>,
    /// Text of the latest stored hypothesis.
    pub hypothesis_context: Option<String>,
    pub draft_text: Option<String>,
    /// Earlier version for comparisons.
    pub baseline_text: Option<String>,
    pub polish_type: PolishType,
    pub target_audience: Option<String>,
    pub alternative_count: Option<usize>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn require<'a>(value: Option<&'a String>, task: TaskKind, field: &str) -> AppResult<&'a str> {
    non_empty(value).ok_or_else(|| AppError::invalid_input(format!("{} requires a non-empty {}", task, field)))
}

fn bullet_list(items: &[String]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .map(|i| format!("- {}", i))
        .collect();
    if lines.is_empty() {
        "- (none provided)".to_string()
    } else {
        lines.join("\n")
    }
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the prompt for `task`, rejecting inputs the task cannot work without.
    pub fn build(task: TaskKind, inputs: &TaskInputs) -> AppResult<String> {
        match task {
            TaskKind::LiteratureReview => Self::literature_review(inputs),
            TaskKind::SourceQuality => Self::source_quality(inputs),
            TaskKind::HypothesisValidation => Self::hypothesis_validation(inputs),
            TaskKind::AlternativeHypotheses => Self::alternative_hypotheses(inputs),
            TaskKind::DraftPolish => Self::draft_polish(inputs),
            TaskKind::DraftComparison => Self::draft_comparison(inputs),
        }
    }

    fn literature_review(inputs: &TaskInputs) -> AppResult<String> {
        let task = TaskKind::LiteratureReview;
        let question = require(inputs.question.as_ref(), task, "research question")?;
        if inputs.citations.iter().chain(&inputs.notes).all(|s| s.trim().is_empty()) {
            return Err(AppError::invalid_input(format!(
                "{} requires at least one citation or note",
                task
            )));
        }

        Ok(format!(
            r#"As an expert academic researcher, conduct a comprehensive literature review.

Research Question: {question}

Available Citations/Sources:
{citations}

Research Notes:
{notes}

Cover thematic analysis, research gaps, key findings and patterns,
methodological approaches, theoretical frameworks, areas of consensus
and disagreement, and implications for the research question.

OUTPUT FORMAT (use these exact section headers, one item per bullet line):

## Themes
- <theme>

## Gaps
- <gap in the literature>

## Key Findings
- <finding>

## Recommendations
- <recommendation for further research>"#,
            question = question,
            citations = bullet_list(&inputs.citations),
            notes = bullet_list(&inputs.notes),
        ))
    }

    fn source_quality(inputs: &TaskInputs) -> AppResult<String> {
        if inputs.citations.iter().all(|c| c.trim().is_empty()) {
            return Err(AppError::invalid_input(format!(
                "{} requires at least one citation",
                TaskKind::SourceQuality
            )));
        }

        Ok(format!(
            r#"Analyze the following academic sources for quality and relevance:

{citations}

Assess source credibility, relevance to the research area, publication
recency, methodological rigor and citation diversity.

OUTPUT FORMAT:
Overall Source Quality: <1-10>/10

## Feedback
- <specific feedback item>"#,
            citations = bullet_list(&inputs.citations),
        ))
    }

    fn hypothesis_validation(inputs: &TaskInputs) -> AppResult<String> {
        let task = TaskKind::HypothesisValidation;
        let hypothesis = require(inputs.hypothesis.as_ref(), task, "hypothesis")?;
        let question = require(inputs.question.as_ref(), task, "research question")?;

        let criteria = Criterion::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}: {}", i + 1, c.label().to_uppercase(), c.question()))
            .collect::<Vec<_>>()
            .join("\n");
        let score_lines = Criterion::ALL
            .iter()
            .map(|c| format!("{}: <1-10>/10 - <one sentence justification>", c.label()))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            r#"As an expert research methodologist, validate the following hypothesis.

Research Question: {question}
Hypothesis: {hypothesis}
{literature}
Evaluate the hypothesis on each criterion, scoring it from 1 to 10:

{criteria}

OUTPUT FORMAT (one line per criterion, integer scores only):
{score_lines}
Overall Score: <mean of the seven scores>

## Strengths
- <strength>

## Weaknesses
- <weakness>

## Recommendations
- <specific, actionable revision>"#,
            question = question,
            hypothesis = hypothesis,
            literature = literature_line(inputs),
            criteria = criteria,
            score_lines = score_lines,
        ))
    }

    fn alternative_hypotheses(inputs: &TaskInputs) -> AppResult<String> {
        let question = require(inputs.question.as_ref(), TaskKind::AlternativeHypotheses, "research question")?;
        let count = inputs.alternative_count.unwrap_or(DEFAULT_ALTERNATIVE_COUNT).max(1);
        let current = non_empty(inputs.hypothesis_context.as_ref())
            .map(|h| format!("Current Hypothesis (propose different ones): {}\n", h))
            .unwrap_or_default();

        Ok(format!(
            r#"Generate {count} alternative, well-formed hypotheses for this research question.

Research Question: {question}
Additional Context: {context}
{current}{literature}
Each hypothesis must be testable and specific, theoretically grounded,
feasible to investigate, and different from the others in approach.

OUTPUT FORMAT:
Hypothesis 1: <hypothesis>
Rationale: <one sentence>

Hypothesis 2: <hypothesis>
Rationale: <one sentence>"#,
            count = count,
            question = question,
            context = non_empty(inputs.context.as_ref()).unwrap_or("none"),
            current = current,
            literature = literature_line(inputs),
        ))
    }

    fn draft_polish(inputs: &TaskInputs) -> AppResult<String> {
        let draft = require(inputs.draft_text.as_ref(), TaskKind::DraftPolish, "draft text")?;
        let audience = non_empty(inputs.target_audience.as_ref()).unwrap_or("academic");
        let research_context = research_context(inputs);

        let (focus, text_header, changes_header) = match inputs.polish_type {
            PolishType::Comprehensive => (
                "Comprehensively polish this research draft: structure and organization,\n\
                 clarity and readability, academic style, and argument strength.",
                "POLISHED TEXT",
                "IMPROVEMENTS MADE",
            ),
            PolishType::Grammar => (
                "Focus on grammar, punctuation, spelling, sentence fragments or run-ons,\n\
                 subject-verb agreement, tense consistency and word usage.",
                "CORRECTED TEXT",
                "CORRECTIONS MADE",
            ),
            PolishType::Structure => (
                "Improve the structural organization: document structure, paragraph\n\
                 organization, topic sentences, transitions and logical flow.",
                "RESTRUCTURED TEXT",
                "STRUCTURAL IMPROVEMENTS",
            ),
            PolishType::Clarity => (
                "Enhance clarity and readability: simplify complex sentences, clarify\n\
                 ambiguous statements, reduce redundancy and make arguments explicit.",
                "CLARIFIED TEXT",
                "CLARITY IMPROVEMENTS",
            ),
            PolishType::Citations => (
                "Improve citation integration: attribution of ideas, balance of cited\n\
                 and original content, consistency and source variety.",
                "IMPROVED TEXT",
                "CITATION IMPROVEMENTS",
            ),
        };

        Ok(format!(
            r#"As an expert academic editor, revise the draft below for a {audience} audience.
{focus}

RESEARCH CONTEXT:
{research_context}

DRAFT:
{draft}

OUTPUT FORMAT (use these exact section headers):
{text_header}:
<the full revised text>

{changes_header}:
- <change>

SUGGESTIONS:
- <further enhancement>

QUALITY SCORE: <1-10>/10
Structure: <1-10>/10
Clarity: <1-10>/10
Academic Style: <1-10>/10
Argument Strength: <1-10>/10"#,
            audience = audience,
            focus = focus,
            research_context = research_context,
            draft = draft,
            text_header = text_header,
            changes_header = changes_header,
        ))
    }

    fn draft_comparison(inputs: &TaskInputs) -> AppResult<String> {
        let task = TaskKind::DraftComparison;
        let version_a = require(inputs.baseline_text.as_ref(), task, "first version")?;
        let version_b = require(inputs.draft_text.as_ref(), task, "second version")?;

        Ok(format!(
            r#"Compare these two versions of an academic text.

VERSION 1:
{version_a}

VERSION 2:
{version_b}

OUTPUT FORMAT (use these exact section headers):
## Key Differences
- <difference>

## Improvements in Version 2
- <improvement>

## Potential Losses
- <loss>

## Quality Comparison
Version 1: <1-10>/10
Version 2: <1-10>/10

## Overall Recommendation
<which version to keep and why>"#,
            version_a = version_a,
            version_b = version_b,
        ))
    }
}

fn literature_line(inputs: &TaskInputs) -> String {
    non_empty(inputs.literature_context.as_ref())
        .map(|review| {
            format!(
                "\nBased on literature review: {}\n",
                excerpt(review, HYPOTHESIS_REVIEW_CONTEXT_CHARS)
            )
        })
        .unwrap_or_default()
}

fn research_context(inputs: &TaskInputs) -> String {
    let mut parts = Vec::new();
    if let Some(question) = non_empty(inputs.question.as_ref()) {
        parts.push(format!("Research Question: {}", question));
    }
    if let Some(review) = non_empty(inputs.literature_context.as_ref()) {
        parts.push(format!(
            "Literature Context: {}",
            excerpt(review, DRAFT_REVIEW_CONTEXT_CHARS)
        ));
    }
    if let Some(hypothesis) = non_empty(inputs.hypothesis_context.as_ref()) {
        parts.push(format!("Research Hypothesis: {}", hypothesis));
    }
    if parts.is_empty() {
        "(no stored research context)".to_string()
    } else {
        parts.join("\n")
    }
}
