mod app;
mod cli;
pub mod context;
pub mod document;
mod paths;
pub mod playback;
pub mod progress;
pub mod settings;
pub mod storage;
pub mod terminal;
mod utils;

use anyhow::Result;
use clap::Parser;

pub use app::AppState;
pub use context::{context_window, ContextWindow, CONTEXT_RADIUS};
pub use document::{DocumentId, LoadedDocument, PlainTextExtractor, TokenExtractor};
pub use playback::{PlaybackController, PlaybackEvent, PlaybackState, PlaybackStatus, Presenter};
pub use progress::ProgressStore;
pub use settings::{ReaderSettings, SettingsStore};
pub use storage::{FileBacking, MemoryBacking, TableBacking};

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    utils::logging::init();

    let cli = cli::Cli::parse();
    let state = AppState::open_default()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let result = app::execute(cli, &state).await;
        state.shutdown().await?;
        result
    })
}
