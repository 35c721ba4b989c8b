use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{ops::RangeInclusive, path::PathBuf, sync::Arc};

use crate::storage::{FileBacking, JsonTable, TableBacking};

pub const WORDS_PER_MINUTE_KEY: &str = "words_per_minute";
pub const FONT_SIZE_KEY: &str = "font_size";

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 300;
pub const DEFAULT_FONT_SIZE: u32 = 16;

pub const WORDS_PER_MINUTE_RANGE: RangeInclusive<u32> = 100..=600;
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 10..=50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderSettings {
    pub words_per_minute: u32,
    pub font_size: u32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Durable `parameter -> value` table. Same load-full/rewrite-full contract
/// as the progress store, any value may overwrite any other.
#[derive(Clone)]
pub struct SettingsStore {
    table: JsonTable<i64>,
}

impl SettingsStore {
    pub fn new(backing: Arc<dyn TableBacking>) -> Self {
        Self {
            table: JsonTable::new(backing, "settings"),
        }
    }

    pub fn open(path: PathBuf) -> Self {
        Self::new(Arc::new(FileBacking::new(path)))
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.table.load().get(name).copied()
    }

    pub fn set(&self, name: &str, value: i64) -> Result<()> {
        self.table.update(|table| {
            table.insert(name.to_string(), value);
        })
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        let table = self.table.load();
        let read = |name: &str, default: u32| {
            table
                .get(name)
                .and_then(|value| u32::try_from(*value).ok())
                .unwrap_or(default)
        };

        ReaderSettings {
            words_per_minute: read(WORDS_PER_MINUTE_KEY, DEFAULT_WORDS_PER_MINUTE),
            font_size: read(FONT_SIZE_KEY, DEFAULT_FONT_SIZE),
        }
    }

    /// Stores a rate clamped to the supported range and returns it.
    pub fn update_words_per_minute(&self, words_per_minute: u32) -> Result<u32> {
        let clamped = clamp(words_per_minute, &WORDS_PER_MINUTE_RANGE);
        self.set(WORDS_PER_MINUTE_KEY, i64::from(clamped))?;
        Ok(clamped)
    }

    pub fn update_font_size(&self, font_size: u32) -> Result<u32> {
        let clamped = clamp(font_size, &FONT_SIZE_RANGE);
        self.set(FONT_SIZE_KEY, i64::from(clamped))?;
        Ok(clamped)
    }
}

pub fn clamp(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}
