use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{percent_complete, DocumentId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Running,
    Stopped,
    Completed,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        PlaybackStatus::Idle
    }
}

impl PlaybackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackStatus::Stopped | PlaybackStatus::Completed)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub session_id: Option<Uuid>,
    pub document_id: Option<DocumentId>,
    pub total_words: usize,
    pub words_per_minute: u32,
    pub resume_index: usize,
    /// Index of the word most recently shown. Before the first word this is
    /// the resume position.
    pub cursor: usize,
    /// Last index durably written to the progress store.
    pub checkpointed_index: usize,
    /// Set when a checkpoint write failed and the stored progress lags the cursor.
    pub checkpoint_stale: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(
        &mut self,
        session_id: Uuid,
        document_id: DocumentId,
        total_words: usize,
        words_per_minute: u32,
        resume_index: usize,
        started_at: DateTime<Utc>,
    ) {
        let resume_index = resume_index.min(total_words);
        *self = Self {
            status: PlaybackStatus::Running,
            session_id: Some(session_id),
            document_id: Some(document_id),
            total_words,
            words_per_minute,
            resume_index,
            cursor: resume_index.min(total_words.saturating_sub(1)),
            checkpointed_index: resume_index,
            checkpoint_stale: false,
            started_at: Some(started_at),
            finished_at: None,
        };
    }

    pub fn record_checkpoint(&mut self, next_index: usize) {
        self.checkpointed_index = next_index;
        self.checkpoint_stale = false;
    }

    pub fn record_checkpoint_failure(&mut self) {
        self.checkpoint_stale = true;
    }

    pub fn finish(&mut self, status: PlaybackStatus, finished_at: DateTime<Utc>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.finished_at = Some(finished_at);
    }

    pub fn percent_complete(&self) -> u8 {
        percent_complete(self.checkpointed_index, self.total_words)
    }
}
