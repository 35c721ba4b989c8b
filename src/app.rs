use std::{io, path::Path};

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};

use crate::{
    cli::{Cli, Command},
    context::{context_window, CONTEXT_RADIUS},
    document::{load_document, DocumentId, LoadedDocument, PlainTextExtractor, TokenExtractor},
    paths::{progress_file_path, settings_file_path},
    playback::{dispatch, PlaybackController, PlaybackEvent, PlaybackStatus},
    progress::ProgressStore,
    settings::{clamp, SettingsStore, WORDS_PER_MINUTE_RANGE},
    terminal::TerminalPresenter,
};

const ENABLE_LOGS: bool = true;

use crate::log_error;

/// Stores and the playback controller, built once at startup.
pub struct AppState {
    pub progress: ProgressStore,
    pub settings: SettingsStore,
    pub extractor: Box<dyn TokenExtractor>,
    pub playback: PlaybackController,
    events: Mutex<mpsc::UnboundedReceiver<PlaybackEvent>>,
}

impl AppState {
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(
            ProgressStore::open(progress_file_path()?),
            SettingsStore::open(settings_file_path()?),
            Box::new(PlainTextExtractor),
        ))
    }

    pub fn new(
        progress: ProgressStore,
        settings: SettingsStore,
        extractor: Box<dyn TokenExtractor>,
    ) -> Self {
        let (playback, events) = PlaybackController::new(progress.clone());
        Self {
            progress,
            settings,
            extractor,
            playback,
            events: Mutex::new(events),
        }
    }

    /// Stops any session still playing. Called once before exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.playback.stop().await.map(|_| ())
    }

    fn load(&self, file: &Path) -> Result<LoadedDocument> {
        load_document(file, self.extractor.as_ref(), &self.progress).inspect_err(|err| {
            log_error!("{err:#}");
        })
    }
}

pub async fn execute(cli: Cli, state: &AppState) -> Result<()> {
    match cli.command {
        Command::Read { file, wpm } => run_read(state, &file, wpm).await,
        Command::Status { file } => run_status(state, &file),
        Command::Reset { file } => run_reset(state, &file),
        Command::Context { file, at } => run_context(state, &file, at),
        Command::Settings { wpm, font_size } => run_settings(state, wpm, font_size),
    }
}

async fn run_read(state: &AppState, file: &Path, wpm: Option<u32>) -> Result<()> {
    let words_per_minute = match wpm {
        Some(wpm) => state.settings.update_words_per_minute(wpm)?,
        None => clamp(
            state.settings.reader_settings().words_per_minute,
            &WORDS_PER_MINUTE_RANGE,
        ),
    };

    let document = state.load(file)?;
    println!(
        "Loaded {} ({} words, {}% read{})",
        document.id,
        document.word_count(),
        document.percent_complete,
        if document.cover.is_some() { ", cover found" } else { "" }
    );

    if document.resume_index >= document.word_count() {
        println!("Already finished. Run `rsvpreader reset` to read it again.");
        return Ok(());
    }

    let controller = &state.playback;
    let mut events = state.events.lock().await;
    controller
        .start(document.id.clone(), document.tokens.clone(), words_per_minute)
        .await?;

    let mut presenter = TerminalPresenter::new(io::stdout());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    let status = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(status) = dispatch(&mut presenter, event) {
                        break status;
                    }
                }
                None => break PlaybackStatus::Stopped,
            },
            result = &mut ctrl_c, if !stopping => {
                result?;
                stopping = true;
                controller.stop().await?;
            }
        }
    };

    let snapshot = controller.stop().await?;
    if snapshot.checkpoint_stale {
        println!("Warning: progress could not be saved for the last words shown.");
    }
    if status == PlaybackStatus::Completed {
        println!("Done: {} words read.", snapshot.total_words);
    } else {
        println!(
            "Saved at word {} of {} ({}%).",
            snapshot.checkpointed_index,
            snapshot.total_words,
            snapshot.percent_complete()
        );
    }
    Ok(())
}

fn run_status(state: &AppState, file: &Path) -> Result<()> {
    let document = state.load(file)?;
    println!("{}", document.id);
    println!(
        "  word {} of {} ({}%)",
        document.resume_index,
        document.word_count(),
        document.percent_complete
    );
    if let Some(cover) = &document.cover {
        println!("  cover: {} bytes", cover.len());
    }
    Ok(())
}

fn run_reset(state: &AppState, file: &Path) -> Result<()> {
    let id = DocumentId::from_path(file)?;
    state.progress.reset(&id)?;
    println!("Progress has been reset to the start of {id}.");
    Ok(())
}

fn run_context(state: &AppState, file: &Path, at: Option<usize>) -> Result<()> {
    let document = state.load(file)?;
    let last = document.word_count() - 1;
    let center = at
        .unwrap_or_else(|| document.resume_index.saturating_sub(1))
        .min(last);

    let window = context_window(&document.tokens, center, CONTEXT_RADIUS);
    println!("words {}..{} of {}", window.start, window.end, document.word_count());
    println!("{}", window.render(|word| format!(">>{word}<<")));
    Ok(())
}

fn run_settings(state: &AppState, wpm: Option<u32>, font_size: Option<u32>) -> Result<()> {
    if let Some(wpm) = wpm {
        state.settings.update_words_per_minute(wpm)?;
    }
    if let Some(font_size) = font_size {
        state.settings.update_font_size(font_size)?;
    }

    let settings = state.settings.reader_settings();
    println!("words_per_minute = {}", settings.words_per_minute);
    println!("font_size = {}", settings.font_size);
    Ok(())
}
