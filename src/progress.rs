//! Progress Tracker
//!
//! Completion flags are a pure function of the stored history and are
//! recomputed on every read, so a hand-edited document can never carry a
//! stale flag forward.

use crate::models::{ProgressFlags, ProgressReport, ResearchState};

const PHASE_COUNT: f64 = 3.0;

pub struct ProgressTracker;

impl ProgressTracker {
    pub fn derive(state: &ResearchState) -> ProgressFlags {
        ProgressFlags {
            literature_review_completed: !state.literature_reviews.is_empty(),
            hypothesis_validated: !state.hypotheses.is_empty(),
            draft_polished: !state.drafts.is_empty(),
        }
    }

    /// Flags plus completion percentage (two decimals) and per-sequence counts.
    pub fn report(state: &ResearchState) -> ProgressReport {
        let progress = Self::derive(state);
        let completion = progress.completed_count() as f64 / PHASE_COUNT * 100.0;

        ProgressReport {
            progress,
            completion_percentage: (completion * 100.0).round() / 100.0,
            question: state.active_question().map(str::to_string),
            total_citations: state.citations.len(),
            total_notes: state.notes.len(),
            total_reviews: state.literature_reviews.len(),
            total_hypotheses: state.hypotheses.len(),
            total_drafts: state.drafts.len(),
        }
    }
}
