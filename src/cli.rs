use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "rsvpreader",
    version,
    about = "Read text one word at a time and pick up where you left off"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a document from its saved position. Ctrl-C stops and saves.
    Read {
        file: PathBuf,
        /// Words per minute, saved as the new default.
        #[arg(long)]
        wpm: Option<u32>,
    },
    /// Show saved progress for a document.
    Status { file: PathBuf },
    /// Start a document over from its first word.
    Reset { file: PathBuf },
    /// Print the words around the last one read.
    Context {
        file: PathBuf,
        /// Word index to center on instead of the saved position.
        #[arg(long)]
        at: Option<usize>,
    },
    /// Show or change reader settings.
    Settings {
        #[arg(long)]
        wpm: Option<u32>,
        #[arg(long)]
        font_size: Option<u32>,
    },
}
