use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    context::{context_window, ContextWindow},
    document::DocumentId,
    progress::ProgressStore,
};

use super::{
    worker::{pacing_delay, playback_loop, StepLoop},
    PlaybackEvent, PlaybackState,
};

struct ActiveSession {
    tokens: Arc<[String]>,
    cursor: Arc<AtomicUsize>,
    state: Arc<Mutex<PlaybackState>>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ActiveSession {
    /// Cancels the step loop and waits for it to exit. Safe to repeat.
    async fn shutdown(&mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("playback loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    async fn snapshot(&self) -> PlaybackState {
        let mut state = self.state.lock().await.clone();
        state.cursor = self.cursor.load(Ordering::Acquire);
        state
    }
}

/// Owns the single playback session of this process.
///
/// Clones share the session, so `stop` may be called from any task.
#[derive(Clone)]
pub struct PlaybackController {
    progress: ProgressStore,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl PlaybackController {
    /// Returns the controller and the receiving end of its notification channel.
    pub fn new(progress: ProgressStore) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            progress,
            events,
            session: Arc::new(Mutex::new(None)),
        };
        (controller, receiver)
    }

    /// Stops any previous session, then plays `tokens` from the stored resume index.
    pub async fn start(
        &self,
        document_id: DocumentId,
        tokens: Arc<[String]>,
        words_per_minute: u32,
    ) -> Result<PlaybackState> {
        if tokens.is_empty() {
            bail!("cannot start playback of {document_id}: no words");
        }
        if words_per_minute == 0 {
            bail!("words_per_minute must be greater than zero");
        }

        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.as_mut() {
            previous.shutdown().await?;
        }

        let resume_index = self.progress.get(&document_id);
        let session_id = Uuid::new_v4();

        let mut initial = PlaybackState::new();
        initial.begin_session(
            session_id,
            document_id.clone(),
            tokens.len(),
            words_per_minute,
            resume_index,
            Utc::now(),
        );

        let cursor = Arc::new(AtomicUsize::new(initial.cursor));
        let state = Arc::new(Mutex::new(initial));
        let cancel_token = CancellationToken::new();

        info!(
            "Starting playback of {} at {} wpm from word {}",
            document_id, words_per_minute, resume_index
        );

        let step = StepLoop {
            session_id,
            document_id,
            tokens: tokens.clone(),
            resume_index,
            delay: pacing_delay(words_per_minute),
            cursor: cursor.clone(),
            state: state.clone(),
            events: self.events.clone(),
            progress: self.progress.clone(),
        };
        let handle = tokio::spawn(playback_loop(step, cancel_token.clone()));

        let session = ActiveSession {
            tokens,
            cursor,
            state,
            cancel_token,
            handle: Some(handle),
        };
        let snapshot = session.snapshot().await;
        *slot = Some(session);

        Ok(snapshot)
    }

    /// Stops the current session and waits for its loop to exit.
    ///
    /// No event or checkpoint from that session happens after this returns.
    /// A no-op when nothing is playing.
    pub async fn stop(&self) -> Result<PlaybackState> {
        let mut slot = self.session.lock().await;
        match slot.as_mut() {
            Some(session) => {
                session.shutdown().await?;
                Ok(session.snapshot().await)
            }
            None => Ok(PlaybackState::new()),
        }
    }

    pub async fn snapshot(&self) -> PlaybackState {
        match self.session.lock().await.as_ref() {
            Some(session) => session.snapshot().await,
            None => PlaybackState::new(),
        }
    }

    /// Words around the last shown word of the current or most recent session.
    pub async fn context(&self, radius: usize) -> Option<ContextWindow> {
        let slot = self.session.lock().await;
        let session = slot.as_ref()?;
        let center = session.cursor.load(Ordering::Acquire);
        Some(context_window(&session.tokens, center, radius))
    }
}
