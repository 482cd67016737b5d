//! The operation surface handed to calling code.
//!
//! `ResearchAssistant` wires one `LLM` and one `ResearchStore` into the
//! three agents. It is cheap to share behind an `Arc`; concurrent calls are
//! safe because the store serializes its own commits.

use std::sync::Arc;

use tracing::info;

use crate::agents::{
    AlternativesRequest, ComparisonRequest, DraftPolisherAgent, HypothesisRequest,
    HypothesisValidatorAgent, LiteratureReviewAgent, LiteratureReviewRequest, PolishRequest,
};
use crate::config::Config;
use crate::llm::LLM;
use crate::models::{
    AlternativeHypotheses, DraftComparison, DraftVersion, HypothesisValidation, LiteratureReview,
    ProgressReport, ResearchExport, ResearchState, SourceQualityReport,
};
use crate::progress::ProgressTracker;
use crate::store::ResearchStore;
use crate::types::AppResult;

pub struct ResearchAssistant {
    store: ResearchStore,
    literature: LiteratureReviewAgent,
    hypothesis: HypothesisValidatorAgent,
    draft: DraftPolisherAgent,
}

impl ResearchAssistant {
    pub fn new(llm: Arc<LLM>, store: ResearchStore) -> Self {
        Self {
            literature: LiteratureReviewAgent::new(llm.clone()),
            hypothesis: HypothesisValidatorAgent::new(llm.clone()),
            draft: DraftPolisherAgent::new(llm),
            store,
        }
    }

    /// Build the generation client and open the configured workspace.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let llm = Arc::new(LLM::from_config(&config.llm)?);
        let store = ResearchStore::open(&config.workspace.dir).await?;
        info!(
            provider = %llm.provider_name(),
            model = %llm.model(),
            workspace = %config.workspace.dir.display(),
            "Research assistant ready"
        );
        Ok(Self::new(llm, store))
    }

    pub fn store(&self) -> &ResearchStore {
        &self.store
    }

    pub async fn conduct_literature_review(
        &self,
        request: LiteratureReviewRequest,
    ) -> AppResult<LiteratureReview> {
        self.literature.conduct_literature_review(&self.store, request).await
    }

    pub async fn analyze_source_quality(&self, citations: Vec<String>) -> AppResult<SourceQualityReport> {
        self.literature.analyze_source_quality(&self.store, citations).await
    }

    pub async fn validate_hypothesis(&self, request: HypothesisRequest) -> AppResult<HypothesisValidation> {
        self.hypothesis.validate_hypothesis(&self.store, request).await
    }

    pub async fn generate_alternatives(
        &self,
        request: AlternativesRequest,
    ) -> AppResult<AlternativeHypotheses> {
        self.hypothesis.generate_alternatives(&self.store, request).await
    }

    pub async fn polish_draft(&self, request: PolishRequest) -> AppResult<DraftVersion> {
        self.draft.polish_draft(&self.store, request).await
    }

    pub async fn compare_drafts(&self, request: ComparisonRequest) -> AppResult<DraftComparison> {
        self.draft.compare_drafts(&self.store, request).await
    }

    pub async fn set_question(&self, question: &str) -> AppResult<ResearchState> {
        self.store.set_question(question).await
    }

    pub async fn add_citations(&self, citations: Vec<String>) -> AppResult<ResearchState> {
        self.store.add_citations(citations).await
    }

    pub async fn add_notes(&self, notes: Vec<String>) -> AppResult<ResearchState> {
        self.store.add_notes(notes).await
    }

    pub async fn get_state(&self) -> ResearchState {
        self.store.get().await
    }

    pub async fn reset_state(&self) -> AppResult<ResearchState> {
        self.store.reset().await
    }

    pub async fn export_state(&self) -> ResearchExport {
        self.store.export().await
    }

    pub async fn get_progress(&self) -> ProgressReport {
        ProgressTracker::report(&self.store.get().await)
    }
}
