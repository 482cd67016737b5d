// Research workspace data model
//
// Field names are camelCase on disk. Every record keeps unknown fields in a
// flattened `extra` map so documents written by newer versions survive a
// load/commit cycle.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{AppError, AppResult};

/// The persisted state of one research workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchState {
    #[serde(default, alias = "research_question")]
    pub question: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, alias = "literature_reviews")]
    pub literature_reviews: Vec<LiteratureReview>,
    #[serde(default)]
    pub hypotheses: Vec<HypothesisValidation>,
    #[serde(default)]
    pub drafts: Vec<DraftVersion>,
    #[serde(default)]
    pub progress: ProgressFlags,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResearchState {
    /// The stored question, if one has been set and is not blank.
    pub fn active_question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn latest_review(&self) -> Option<&LiteratureReview> {
        self.literature_reviews.last()
    }

    pub fn latest_hypothesis(&self) -> Option<&HypothesisValidation> {
        self.hypotheses.last()
    }

    pub fn latest_draft(&self) -> Option<&DraftVersion> {
        self.drafts.last()
    }
}

/// Derived phase-completion flags. Never set independently of the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressFlags {
    #[serde(default)]
    pub literature_review_completed: bool,
    #[serde(default)]
    pub hypothesis_validated: bool,
    #[serde(default)]
    pub draft_polished: bool,
}

impl ProgressFlags {
    pub fn completed_count(&self) -> usize {
        [
            self.literature_review_completed,
            self.hypothesis_validated,
            self.draft_polished,
        ]
        .iter()
        .filter(|done| **done)
        .count()
    }
}

/// Citations and notes that fed a literature review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInputs {
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteratureReview {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub source_inputs: SourceInputs,
    #[serde(default)]
    pub themes: BTreeSet<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub raw_response: String,
    #[serde(default)]
    pub parse_warnings: Vec<ParseWarning>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LiteratureReview {
    pub fn parse_warning(&self) -> bool {
        !self.parse_warnings.is_empty()
    }
}

/// The seven fixed hypothesis rubric criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Clarity,
    Testability,
    Specificity,
    Falsifiability,
    TheoreticalGrounding,
    Originality,
    Feasibility,
}

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::Clarity,
        Criterion::Testability,
        Criterion::Specificity,
        Criterion::Falsifiability,
        Criterion::TheoreticalGrounding,
        Criterion::Originality,
        Criterion::Feasibility,
    ];

    /// Human-readable label, as requested in prompts and searched for in replies.
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Clarity => "Clarity",
            Criterion::Testability => "Testability",
            Criterion::Specificity => "Specificity",
            Criterion::Falsifiability => "Falsifiability",
            Criterion::TheoreticalGrounding => "Theoretical Grounding",
            Criterion::Originality => "Originality",
            Criterion::Feasibility => "Feasibility",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            Criterion::Clarity => "Is the hypothesis clearly stated and unambiguous?",
            Criterion::Testability => "Can this hypothesis be empirically tested?",
            Criterion::Specificity => "Is it specific enough to guide research design?",
            Criterion::Falsifiability => "Could an observable result prove it wrong?",
            Criterion::TheoreticalGrounding => "Is it based on existing theory or evidence?",
            Criterion::Originality => "Does it contribute new knowledge to the field?",
            Criterion::Feasibility => "Is it realistic to test with available resources and methods?",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentLevel {
    Strong,
    Moderate,
    Weak,
}

impl AssessmentLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            AssessmentLevel::Strong
        } else if score >= 6.0 {
            AssessmentLevel::Moderate
        } else {
            AssessmentLevel::Weak
        }
    }
}

impl std::fmt::Display for AssessmentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssessmentLevel::Strong => write!(f, "Strong"),
            AssessmentLevel::Moderate => write!(f, "Moderate"),
            AssessmentLevel::Weak => write!(f, "Weak"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisValidation {
    pub timestamp: DateTime<Utc>,
    pub hypothesis_text: String,
    #[serde(default)]
    pub question: String,
    pub criteria_scores: BTreeMap<Criterion, u8>,
    pub overall_score: f64,
    pub assessment: AssessmentLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub raw_response: String,
    #[serde(default)]
    pub parse_warnings: Vec<ParseWarning>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HypothesisValidation {
    pub fn parse_warning(&self) -> bool {
        !self.parse_warnings.is_empty()
    }

    pub fn score(&self, criterion: Criterion) -> Option<u8> {
        self.criteria_scores.get(&criterion).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolishType {
    #[default]
    Comprehensive,
    Grammar,
    Structure,
    Clarity,
    Citations,
}

impl PolishType {
    pub const ALL: [PolishType; 5] = [
        PolishType::Comprehensive,
        PolishType::Grammar,
        PolishType::Structure,
        PolishType::Clarity,
        PolishType::Citations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolishType::Comprehensive => "comprehensive",
            PolishType::Grammar => "grammar",
            PolishType::Structure => "structure",
            PolishType::Clarity => "clarity",
            PolishType::Citations => "citations",
        }
    }
}

impl std::fmt::Display for PolishType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PolishType {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let wanted = s.trim().to_lowercase();
        PolishType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "unknown polish type '{}' (expected comprehensive, grammar, structure, clarity or citations)",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftVersion {
    pub timestamp: DateTime<Utc>,
    pub polish_type: PolishType,
    pub target_audience: String,
    pub original_text: String,
    pub polished_text: String,
    pub quality_score: u8,
    #[serde(default)]
    pub changes_summary: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub word_count_original: usize,
    #[serde(default)]
    pub word_count_polished: usize,
    #[serde(default)]
    pub raw_response: String,
    #[serde(default)]
    pub parse_warnings: Vec<ParseWarning>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DraftVersion {
    pub fn parse_warning(&self) -> bool {
        !self.parse_warnings.is_empty()
    }
}

/// A field that fell back to its default while parsing a model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseWarning {
    /// No labeled score was found; `default` was substituted.
    #[serde(rename_all = "camelCase")]
    MissingScore { field: String, default: u8 },
    /// A labeled score was outside 1..=10 and was clamped.
    #[serde(rename_all = "camelCase")]
    ScoreOutOfRange { field: String, found: u32, clamped: u8 },
    /// The model's own aggregate disagreed with the locally computed one.
    #[serde(rename_all = "camelCase")]
    InconsistentAggregate { field: String, reported: f64, computed: f64 },
    /// A list section was absent; the field is empty.
    #[serde(rename_all = "camelCase")]
    MissingSection { section: String },
    /// A text section was absent; the caller's fallback was used.
    #[serde(rename_all = "camelCase")]
    MissingText { section: String },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::MissingScore { field, default } => {
                write!(f, "no score found for {}, defaulted to {}", field, default)
            }
            ParseWarning::ScoreOutOfRange { field, found, clamped } => {
                write!(f, "score {} for {} out of range, clamped to {}", found, field, clamped)
            }
            ParseWarning::InconsistentAggregate { field, reported, computed } => write!(
                f,
                "reported {} {} disagrees with computed {}, using computed",
                field, reported, computed
            ),
            ParseWarning::MissingSection { section } => write!(f, "no '{}' section found", section),
            ParseWarning::MissingText { section } => {
                write!(f, "no '{}' text found, kept the original", section)
            }
        }
    }
}

/// Any record that can be appended to a workspace history.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchRecord {
    LiteratureReview(LiteratureReview),
    Hypothesis(HypothesisValidation),
    Draft(DraftVersion),
}

impl ResearchRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            ResearchRecord::LiteratureReview(_) => "literature_review",
            ResearchRecord::Hypothesis(_) => "hypothesis",
            ResearchRecord::Draft(_) => "draft",
        }
    }
}

// Results below are returned to callers but have no sequence in the workspace.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQualityReport {
    pub timestamp: DateTime<Utc>,
    pub sources_count: usize,
    pub quality_score: u8,
    pub feedback: Vec<String>,
    pub raw_response: String,
    pub parse_warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeHypotheses {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub alternatives: Vec<String>,
    pub raw_response: String,
    pub parse_warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftComparison {
    pub timestamp: DateTime<Utc>,
    pub version_a_words: usize,
    pub version_b_words: usize,
    pub version_a_score: u8,
    pub version_b_score: u8,
    pub differences: Vec<String>,
    pub recommendation: String,
    pub raw_response: String,
    pub parse_warnings: Vec<ParseWarning>,
}

/// Progress summary served alongside the flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: ProgressFlags,
    pub completion_percentage: f64,
    pub question: Option<String>,
    pub total_citations: usize,
    pub total_notes: usize,
    pub total_reviews: usize,
    pub total_hypotheses: usize,
    pub total_drafts: usize,
}

/// Full workspace export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchExport {
    pub exported_at: DateTime<Utc>,
    pub summary: ProgressReport,
    pub state: ResearchState,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
