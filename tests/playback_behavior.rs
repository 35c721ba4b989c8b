use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rsvpreader_lib::{
    DocumentId, FileBacking, MemoryBacking, PlaybackController, PlaybackEvent, PlaybackStatus,
    ProgressStore, TableBacking, CONTEXT_RADIUS,
};
use tempfile::TempDir;
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn tokens(words: &[&str]) -> Arc<[String]> {
    words.iter().map(|word| word.to_string()).collect()
}

fn scenario_tokens() -> Arc<[String]> {
    tokens(&["alpha", "beta", "gamma", "delta"])
}

fn memory_store() -> ProgressStore {
    ProgressStore::new(Arc::new(MemoryBacking::new()))
}

#[derive(Debug, Default)]
struct Played {
    words: Vec<String>,
    indices: Vec<usize>,
    percents: Vec<u8>,
    status: Option<PlaybackStatus>,
    next_index: Option<usize>,
}

async fn next_event(events: &mut UnboundedReceiver<PlaybackEvent>) -> PlaybackEvent {
    timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for playback event")
        .expect("event channel closed")
}

/// Collects events until the session's `Finished` event.
async fn play_to_end(events: &mut UnboundedReceiver<PlaybackEvent>) -> Played {
    let mut played = Played::default();
    loop {
        match next_event(events).await {
            PlaybackEvent::Word { index, token, .. } => {
                played.indices.push(index);
                played.words.push(token);
            }
            PlaybackEvent::Progress { percent, .. } => played.percents.push(percent),
            PlaybackEvent::Finished {
                status, next_index, ..
            } => {
                played.status = Some(status);
                played.next_index = Some(next_index);
                return played;
            }
        }
    }
}

/// Waits until the word at `target` has been emitted.
async fn wait_for_word(events: &mut UnboundedReceiver<PlaybackEvent>, target: usize) {
    loop {
        if let PlaybackEvent::Word { index, .. } = next_event(events).await {
            if index == target {
                return;
            }
        }
    }
}

#[tokio::test]
async fn plays_every_word_in_order_with_progress_and_pacing() {
    let store = memory_store();
    let doc = DocumentId::new("book");
    let (controller, mut events) = PlaybackController::new(store.clone());

    let started = Instant::now();
    let state = controller
        .start(doc.clone(), scenario_tokens(), 600)
        .await
        .unwrap();
    assert_eq!(state.status, PlaybackStatus::Running);
    assert_eq!(state.resume_index, 0);

    let played = play_to_end(&mut events).await;
    let elapsed = started.elapsed();

    assert_eq!(played.words, vec!["alpha", "beta", "gamma", "delta"]);
    assert_eq!(played.percents, vec![25, 50, 75, 100]);
    assert_eq!(played.status, Some(PlaybackStatus::Completed));
    assert_eq!(played.next_index, Some(4));
    assert_eq!(store.get(&doc), 4);

    // Four words at 0.1s each.
    assert!(elapsed >= Duration::from_millis(380), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "too slow: {elapsed:?}");

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status, PlaybackStatus::Completed);
    assert_eq!(snapshot.checkpointed_index, 4);
    assert_eq!(snapshot.cursor, 3);
    assert!(!snapshot.checkpoint_stale);
}

#[tokio::test]
async fn stop_after_second_word_resumes_at_third_across_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reading_progress.json");
    let doc = DocumentId::new("/books/scenario.txt");

    {
        let store = ProgressStore::open(path.clone());
        let (controller, mut events) = PlaybackController::new(store.clone());
        controller
            .start(doc.clone(), scenario_tokens(), 60)
            .await
            .unwrap();

        wait_for_word(&mut events, 1).await;
        let stop_requested = Instant::now();
        let state = controller.stop().await.unwrap();

        // The one second pacing wait is interrupted.
        assert!(stop_requested.elapsed() < Duration::from_millis(900));
        assert_eq!(state.status, PlaybackStatus::Stopped);
        assert_eq!(state.checkpointed_index, 2);
        assert_eq!(store.get(&doc), 2);

        let rest = play_to_end(&mut events).await;
        assert!(rest.words.is_empty());
        assert_eq!(rest.status, Some(PlaybackStatus::Stopped));
        assert_eq!(rest.next_index, Some(2));
        assert!(events.try_recv().is_err());
    }

    let store = ProgressStore::open(path);
    let (controller, mut events) = PlaybackController::new(store.clone());
    let state = controller
        .start(doc.clone(), scenario_tokens(), 600)
        .await
        .unwrap();
    assert_eq!(state.resume_index, 2);

    let played = play_to_end(&mut events).await;
    assert_eq!(played.words, vec!["gamma", "delta"]);
    assert_eq!(played.percents, vec![75, 100]);
    assert_eq!(store.get(&doc), 4);
}

#[tokio::test]
async fn resumes_from_stored_index() {
    let store = memory_store();
    let doc = DocumentId::new("book");
    store.set(&doc, 3).unwrap();

    let (controller, mut events) = PlaybackController::new(store.clone());
    controller
        .start(doc.clone(), tokens(&["a", "b", "c", "d", "e", "f"]), 6000)
        .await
        .unwrap();

    let played = play_to_end(&mut events).await;
    assert_eq!(played.indices, vec![3, 4, 5]);
    assert_eq!(played.words, vec!["d", "e", "f"]);
    assert_eq!(played.percents, vec![67, 83, 100]);
    assert_eq!(store.get(&doc), 6);
}

#[tokio::test]
async fn fully_read_document_completes_without_words() {
    let store = memory_store();
    let doc = DocumentId::new("book");
    store.set(&doc, 4).unwrap();

    let (controller, mut events) = PlaybackController::new(store.clone());
    controller
        .start(doc.clone(), scenario_tokens(), 600)
        .await
        .unwrap();

    let played = play_to_end(&mut events).await;
    assert!(played.words.is_empty());
    assert!(played.percents.is_empty());
    assert_eq!(played.status, Some(PlaybackStatus::Completed));
    assert_eq!(played.next_index, Some(4));
    assert_eq!(store.get(&doc), 4);
}

#[tokio::test]
async fn reset_replays_from_first_word() {
    let store = memory_store();
    let doc = DocumentId::new("book");
    let (controller, mut events) = PlaybackController::new(store.clone());

    controller
        .start(doc.clone(), scenario_tokens(), 6000)
        .await
        .unwrap();
    play_to_end(&mut events).await;
    assert_eq!(store.get(&doc), 4);

    store.reset(&doc).unwrap();
    controller
        .start(doc.clone(), scenario_tokens(), 6000)
        .await
        .unwrap();
    let played = play_to_end(&mut events).await;
    assert_eq!(played.words, vec!["alpha", "beta", "gamma", "delta"]);
}

#[tokio::test]
async fn invalid_parameters_create_no_session() {
    let store = memory_store();
    let doc = DocumentId::new("book");
    let (controller, mut events) = PlaybackController::new(store.clone());

    assert!(controller.start(doc.clone(), tokens(&[]), 300).await.is_err());
    assert!(controller
        .start(doc.clone(), scenario_tokens(), 0)
        .await
        .is_err());

    assert_eq!(controller.snapshot().await.status, PlaybackStatus::Idle);
    assert!(controller.context(CONTEXT_RADIUS).await.is_none());
    assert!(events.try_recv().is_err());
    assert_eq!(store.get(&doc), 0);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (controller, mut events) = PlaybackController::new(memory_store());

    let idle = controller.stop().await.unwrap();
    assert_eq!(idle.status, PlaybackStatus::Idle);

    controller
        .start(DocumentId::new("book"), scenario_tokens(), 60)
        .await
        .unwrap();
    wait_for_word(&mut events, 0).await;

    let first = controller.stop().await.unwrap();
    let second = controller.stop().await.unwrap();
    assert_eq!(first.status, PlaybackStatus::Stopped);
    assert_eq!(second.status, PlaybackStatus::Stopped);
    assert_eq!(first.checkpointed_index, second.checkpointed_index);

    let other_handle = controller.clone();
    tokio::spawn(async move { other_handle.stop().await })
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn starting_a_new_session_reaps_the_previous_one() {
    let store = memory_store();
    let first_doc = DocumentId::new("first");
    let second_doc = DocumentId::new("second");
    let (controller, mut events) = PlaybackController::new(store.clone());

    let first = controller
        .start(first_doc.clone(), scenario_tokens(), 60)
        .await
        .unwrap();
    wait_for_word(&mut events, 0).await;

    let second = controller
        .start(second_doc.clone(), tokens(&["one", "two"]), 6000)
        .await
        .unwrap();
    assert_ne!(first.session_id, second.session_id);

    let leftover = play_to_end(&mut events).await;
    assert_eq!(leftover.status, Some(PlaybackStatus::Stopped));
    assert!(leftover.words.is_empty());
    assert_eq!(store.get(&first_doc), 1);

    let played = play_to_end(&mut events).await;
    assert_eq!(played.words, vec!["one", "two"]);
    assert_eq!(store.get(&second_doc), 2);
    assert_eq!(store.get(&first_doc), 1);
}

#[tokio::test]
async fn context_window_tracks_the_shown_word() {
    let store = memory_store();
    let doc = DocumentId::new("long");
    store.set(&doc, 100).unwrap();
    let words: Arc<[String]> = (0..130).map(|i| format!("w{i}")).collect();

    let (controller, mut events) = PlaybackController::new(store);
    controller.start(doc, words, 60).await.unwrap();
    wait_for_word(&mut events, 100).await;

    let window = controller.context(CONTEXT_RADIUS).await.unwrap();
    assert_eq!(window.start, 40);
    assert_eq!(window.end, 130);
    assert_eq!(window.current().map(|w| w.text.as_str()), Some("w100"));

    controller.stop().await.unwrap();
}

struct ReadOnlyBacking;

impl TableBacking for ReadOnlyBacking {
    fn read(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn write(&self, _contents: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("read-only filesystem"))
    }
}

#[tokio::test]
async fn failed_checkpoints_do_not_stop_playback() {
    let store = ProgressStore::new(Arc::new(ReadOnlyBacking));
    let (controller, mut events) = PlaybackController::new(store);

    controller
        .start(DocumentId::new("book"), scenario_tokens(), 6000)
        .await
        .unwrap();
    let played = play_to_end(&mut events).await;

    assert_eq!(played.words.len(), 4);
    assert_eq!(played.status, Some(PlaybackStatus::Completed));

    let snapshot = controller.snapshot().await;
    assert!(snapshot.checkpoint_stale);
    assert_eq!(snapshot.checkpointed_index, 0);
}

#[tokio::test]
async fn corrupt_progress_file_starts_from_the_beginning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reading_progress.json");
    std::fs::write(&path, "{\"book\": 3,,}").unwrap();

    let backing = Arc::new(FileBacking::new(path.clone()));
    let store = ProgressStore::new(backing);
    let (controller, mut events) = PlaybackController::new(store.clone());
    controller
        .start(DocumentId::new("book"), scenario_tokens(), 6000)
        .await
        .unwrap();

    let played = play_to_end(&mut events).await;
    assert_eq!(played.indices, vec![0, 1, 2, 3]);
    assert_eq!(store.get(&DocumentId::new("book")), 4);
    assert!(std::fs::read_to_string(&path).unwrap().contains("\"book\": 4"));
}
