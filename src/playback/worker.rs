use chrono::Utc;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::{
    sync::{mpsc, Mutex},
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    document::{percent_complete, DocumentId},
    progress::ProgressStore,
};

use super::{PlaybackEvent, PlaybackState, PlaybackStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Everything one session's step loop needs. Owned by the spawned task.
pub(super) struct StepLoop {
    pub session_id: Uuid,
    pub document_id: DocumentId,
    pub tokens: Arc<[String]>,
    pub resume_index: usize,
    pub delay: Duration,
    pub cursor: Arc<AtomicUsize>,
    pub state: Arc<Mutex<PlaybackState>>,
    pub events: mpsc::UnboundedSender<PlaybackEvent>,
    pub progress: ProgressStore,
}

/// Emit, wait, checkpoint for each remaining word until done or cancelled.
///
/// A cancel that lands during the wait still checkpoints the word already
/// shown, so the next session resumes right after it.
pub(super) async fn playback_loop(step: StepLoop, cancel_token: CancellationToken) {
    let total = step.tokens.len();
    let mut next_index = step.resume_index.min(total);
    let mut status = PlaybackStatus::Completed;

    log_debug!(
        "playback session {} starting at word {}/{} for {}",
        step.session_id,
        next_index,
        total,
        step.document_id
    );

    for index in step.resume_index..total {
        if cancel_token.is_cancelled() {
            status = PlaybackStatus::Stopped;
            break;
        }

        step.cursor.store(index, Ordering::Release);
        step.emit(PlaybackEvent::Word {
            session_id: step.session_id,
            index,
            token: step.tokens[index].clone(),
        });
        step.emit(PlaybackEvent::Progress {
            session_id: step.session_id,
            percent: percent_complete(index + 1, total),
        });

        let interrupted = tokio::select! {
            _ = time::sleep(step.delay) => false,
            _ = cancel_token.cancelled() => true,
        };

        next_index = index + 1;
        step.checkpoint(next_index).await;

        if interrupted {
            status = PlaybackStatus::Stopped;
            break;
        }
    }

    {
        let mut state = step.state.lock().await;
        state.finish(status, Utc::now());
    }

    log_debug!(
        "playback session {} {:?} at word {}/{}",
        step.session_id,
        status,
        next_index,
        total
    );

    step.emit(PlaybackEvent::Finished {
        session_id: step.session_id,
        status,
        next_index,
    });
}

impl StepLoop {
    fn emit(&self, event: PlaybackEvent) {
        // Nobody listening is fine, pacing and checkpoints continue.
        let _ = self.events.send(event);
    }

    async fn checkpoint(&self, next_index: usize) {
        let progress = self.progress.clone();
        let document_id = self.document_id.clone();
        let result =
            tokio::task::spawn_blocking(move || progress.set(&document_id, next_index)).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(Ok(())) => state.record_checkpoint(next_index),
            Ok(Err(err)) => {
                log_warn!(
                    "checkpoint {} for {} failed, stored progress is stale: {err:#}",
                    next_index,
                    self.document_id
                );
                state.record_checkpoint_failure();
            }
            Err(err) => {
                log_warn!(
                    "checkpoint worker for {} failed to join, stored progress is stale: {err}",
                    self.document_id
                );
                state.record_checkpoint_failure();
            }
        }
    }
}

/// Per-word wait for a rate in words per minute.
pub(super) fn pacing_delay(words_per_minute: u32) -> Duration {
    Duration::from_secs_f64(60.0 / f64::from(words_per_minute))
}
