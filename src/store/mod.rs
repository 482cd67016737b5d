//! Research Store
//!
//! The durable container for one workspace. The document on disk is the
//! source of truth: reads and mutations start from it, so edits made by
//! another process or by hand are never overwritten. The last committed
//! state is cached behind a `tokio::sync::RwLock` and stands in only while
//! the document is missing or unreadable. Every mutation runs as one
//! critical section under the write guard:
//!
//! ```text
//! write lock ─► load document ─► apply changes ─► derive flags ─► atomic commit ─► swap in ─► unlock
//! ```
//!
//! If the commit fails the cached state is untouched and the document on
//! disk is still the previous one. Model generation never happens while the
//! lock is held; agents generate first and hand finished records to
//! [`ResearchStore::apply`].

pub mod persistence;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::models::{ResearchExport, ResearchRecord, ResearchState};
use crate::progress::ProgressTracker;
use crate::types::{AppError, AppResult};

pub const STATE_FILE_NAME: &str = "research_state.json";

/// One mutation of the workspace. Sequences only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    SetQuestion(String),
    AddCitations(Vec<String>),
    AddNotes(Vec<String>),
    Append(ResearchRecord),
}

impl StateChange {
    fn apply_to(self, state: &mut ResearchState) {
        match self {
            StateChange::SetQuestion(question) => state.question = Some(question.trim().to_string()),
            StateChange::AddCitations(citations) => state.citations.extend(clean_entries(citations)),
            StateChange::AddNotes(notes) => state.notes.extend(clean_entries(notes)),
            StateChange::Append(ResearchRecord::LiteratureReview(review)) => {
                state.literature_reviews.push(review)
            }
            StateChange::Append(ResearchRecord::Hypothesis(validation)) => state.hypotheses.push(validation),
            StateChange::Append(ResearchRecord::Draft(draft)) => state.drafts.push(draft),
        }
    }
}

fn clean_entries(entries: Vec<String>) -> impl Iterator<Item = String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

struct StoreInner {
    path: PathBuf,
    state: RwLock<ResearchState>,
}

#[derive(Clone)]
pub struct ResearchStore {
    inner: Arc<StoreInner>,
}

impl ResearchStore {
    /// Open the workspace in `dir`, loading `research_state.json` if present.
    pub async fn open(dir: impl AsRef<Path>) -> AppResult<Self> {
        Self::open_file(dir.as_ref().join(STATE_FILE_NAME)).await
    }

    /// Open a workspace backed by an explicit document path.
    pub async fn open_file(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let state = Self::load(&path).await?;
        info!(
            path = %path.display(),
            reviews = state.literature_reviews.len(),
            hypotheses = state.hypotheses.len(),
            drafts = state.drafts.len(),
            "Opened research workspace"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                state: RwLock::new(state),
            }),
        })
    }

    async fn load(path: &Path) -> AppResult<ResearchState> {
        let mut state: ResearchState = persistence::load_json(path).await?.unwrap_or_default();
        state.progress = ProgressTracker::derive(&state);
        Ok(state)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Snapshot of the document on disk, or of the last commit if it can't be read.
    pub async fn get(&self) -> ResearchState {
        let guard = self.inner.state.read().await;
        match self.current(&guard).await {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.inner.path.display(), error = %e, "Serving cached research state");
                let mut snapshot = guard.clone();
                snapshot.progress = ProgressTracker::derive(&snapshot);
                snapshot
            }
        }
    }

    /// The document as it is on disk now, falling back to `cached` when it is missing.
    async fn current(&self, cached: &ResearchState) -> AppResult<ResearchState> {
        let mut state = persistence::load_json::<ResearchState>(&self.inner.path)
            .await?
            .unwrap_or_else(|| cached.clone());
        state.progress = ProgressTracker::derive(&state);
        Ok(state)
    }

    /// Apply `changes` as a single commit and return the new snapshot.
    pub async fn apply(&self, changes: Vec<StateChange>) -> AppResult<ResearchState> {
        let mut guard = self.inner.state.write().await;

        let mut next = self.current(&guard).await?;
        let change_count = changes.len();
        for change in changes {
            change.apply_to(&mut next);
        }
        next.progress = ProgressTracker::derive(&next);

        self.commit(&next).await?;
        *guard = next.clone();
        debug!(changes = change_count, "Applied workspace changes");
        Ok(next)
    }

    pub async fn append(&self, record: ResearchRecord) -> AppResult<ResearchState> {
        let kind = record.kind();
        let state = self.apply(vec![StateChange::Append(record)]).await?;
        info!(kind, "Appended research record");
        Ok(state)
    }

    pub async fn set_question(&self, question: &str) -> AppResult<ResearchState> {
        if question.trim().is_empty() {
            return Err(AppError::invalid_input("research question must not be empty"));
        }
        self.apply(vec![StateChange::SetQuestion(question.to_string())]).await
    }

    pub async fn add_citations(&self, citations: Vec<String>) -> AppResult<ResearchState> {
        self.apply(vec![StateChange::AddCitations(citations)]).await
    }

    pub async fn add_notes(&self, notes: Vec<String>) -> AppResult<ResearchState> {
        self.apply(vec![StateChange::AddNotes(notes)]).await
    }

    /// Clear every field, including unknown ones, in one commit.
    pub async fn reset(&self) -> AppResult<ResearchState> {
        let mut guard = self.inner.state.write().await;
        let empty = ResearchState::default();
        self.commit(&empty).await?;
        *guard = empty.clone();
        info!(path = %self.inner.path.display(), "Research workspace reset");
        Ok(empty)
    }

    /// The full state wrapped with a timestamp and progress summary.
    pub async fn export(&self) -> ResearchExport {
        let state = self.get().await;
        ResearchExport {
            exported_at: Utc::now(),
            summary: ProgressTracker::report(&state),
            state,
        }
    }

    /// Replace the cached state with the document currently on disk.
    pub async fn reload(&self) -> AppResult<ResearchState> {
        let mut guard = self.inner.state.write().await;
        let state = Self::load(&self.inner.path).await?;
        *guard = state.clone();
        Ok(state)
    }

    async fn commit(&self, state: &ResearchState) -> AppResult<()> {
        persistence::atomic_write_json(&self.inner.path, state)
            .await
            .inspect_err(|e| {
                error!(path = %self.inner.path.display(), error = %e, "Failed to commit research state")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LiteratureReview, SourceInputs};
    use tempfile::TempDir;

    fn review(n: usize) -> ResearchRecord {
        ResearchRecord::LiteratureReview(LiteratureReview {
            timestamp: Utc::now(),
            question: "Q?".to_string(),
            source_inputs: SourceInputs::default(),
            themes: [format!("theme {}", n)].into_iter().collect(),
            gaps: Vec::new(),
            recommendations: Vec::new(),
            raw_response: format!("reply {}", n),
            parse_warnings: Vec::new(),
            extra: Default::default(),
        })
    }

    #[tokio::test]
    async fn test_mutations_are_durable() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Impact of remote learning on engagement?").await.unwrap();
        store
            .add_citations(vec!["Smith (2021)".into(), "  ".into(), "Smith (2021)".into()])
            .await
            .unwrap();
        store.append(review(1)).await.unwrap();

        let reopened = ResearchStore::open(dir.path()).await.unwrap();
        let state = reopened.get().await;
        assert_eq!(state.question.as_deref(), Some("Impact of remote learning on engagement?"));
        // Duplicates are permitted, blanks are not.
        assert_eq!(state.citations, vec!["Smith (2021)", "Smith (2021)"]);
        assert!(state.progress.literature_review_completed);
        assert!(!state.progress.hypothesis_validated);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        assert!(matches!(store.set_question("   ").await, Err(AppError::InvalidInput(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();

        let handles: Vec<_> = (0..24)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.append(review(n)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = ResearchStore::open(dir.path()).await.unwrap().get().await;
        assert_eq!(state.literature_reviews.len(), 24);
        let mut replies: Vec<_> = state.literature_reviews.iter().map(|r| r.raw_response.clone()).collect();
        replies.sort();
        replies.dedup();
        assert_eq!(replies.len(), 24);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Q?").await.unwrap();
        store.add_notes(vec!["note".into()]).await.unwrap();
        store.append(review(1)).await.unwrap();

        store.reset().await.unwrap();
        let state = store.get().await;
        assert_eq!(state, ResearchState::default());
        assert_eq!(state.progress.completed_count(), 0);

        let on_disk = ResearchStore::open(dir.path()).await.unwrap().get().await;
        assert_eq!(on_disk, ResearchState::default());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Q?").await.unwrap();
        let before = store.get().await;

        // Swap the document for a non-empty directory so the rename fails.
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("occupied"), "x").unwrap();

        let result = store.append(review(1)).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(store.get().await, before);
    }

    #[tokio::test]
    async fn test_external_edits_are_read_and_kept() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Q?").await.unwrap();

        // Another process rewrites the document behind the open handle.
        std::fs::write(
            store.path(),
            r#"{"question":"Q?","citations":["Manual (2020)"],"notes":[]}"#,
        )
        .unwrap();
        assert_eq!(store.get().await.citations, vec!["Manual (2020)"]);

        store.add_notes(vec!["n".into()]).await.unwrap();
        let on_disk: ResearchState =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.citations, vec!["Manual (2020)"]);
        assert_eq!(on_disk.notes, vec!["n"]);
        assert_eq!(on_disk.question.as_deref(), Some("Q?"));
    }

    #[tokio::test]
    async fn test_export_reloads_identically() {
        let dir = TempDir::new().unwrap();
        let store = ResearchStore::open(dir.path()).await.unwrap();
        store.set_question("Q?").await.unwrap();
        store.add_citations(vec!["A (2020)".into()]).await.unwrap();
        store.append(review(7)).await.unwrap();

        let export = store.export().await;
        assert_eq!(export.summary.total_reviews, 1);

        let json = serde_json::to_string(&export).unwrap();
        let restored: ResearchExport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.state, export.state);
        assert_eq!(store.reload().await.unwrap(), export.state);
    }

    #[tokio::test]
    async fn test_unknown_fields_survive_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        std::fs::write(
            &path,
            r#"{"question":"Q?","citations":[],"reviewerTeam":["ana","li"],"progress":{"draftPolished":true}}"#,
        )
        .unwrap();

        let store = ResearchStore::open(dir.path()).await.unwrap();
        assert!(!store.get().await.progress.draft_polished);
        store.add_notes(vec!["new note".into()]).await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["reviewerTeam"], serde_json::json!(["ana", "li"]));
        assert_eq!(raw["notes"], serde_json::json!(["new note"]));
    }
}
