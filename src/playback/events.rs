use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::PlaybackStatus;

/// Notifications emitted by the step loop, in strictly increasing word order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaybackEvent {
    #[serde(rename_all = "camelCase")]
    Word {
        session_id: Uuid,
        index: usize,
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Progress { session_id: Uuid, percent: u8 },
    /// Always the last event of a session.
    #[serde(rename_all = "camelCase")]
    Finished {
        session_id: Uuid,
        status: PlaybackStatus,
        next_index: usize,
    },
}

/// Receives playback notifications. Implementations must return quickly,
/// a slow presenter delays pacing.
pub trait Presenter {
    fn on_word(&mut self, index: usize, token: &str);
    fn on_progress(&mut self, percent: u8);
    fn on_finished(&mut self, _status: PlaybackStatus, _next_index: usize) {}
}

/// Forwards one event. Returns the final status when the session ended.
pub fn dispatch(presenter: &mut dyn Presenter, event: PlaybackEvent) -> Option<PlaybackStatus> {
    match event {
        PlaybackEvent::Word { index, token, .. } => {
            presenter.on_word(index, &token);
            None
        }
        PlaybackEvent::Progress { percent, .. } => {
            presenter.on_progress(percent);
            None
        }
        PlaybackEvent::Finished {
            status, next_index, ..
        } => {
            presenter.on_finished(status, next_index);
            Some(status)
        }
    }
}

/// Pumps events into `presenter` until a session finishes or the channel closes.
pub async fn present(
    events: &mut mpsc::UnboundedReceiver<PlaybackEvent>,
    presenter: &mut dyn Presenter,
) -> Option<PlaybackStatus> {
    while let Some(event) = events.recv().await {
        if let Some(status) = dispatch(presenter, event) {
            return Some(status);
        }
    }
    None
}
