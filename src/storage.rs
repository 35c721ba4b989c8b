//! Whole-table JSON persistence shared by the progress and settings stores.
//!
//! Every read loads the full table and every write replaces it, so nothing
//! is cached between calls. A missing or unparseable table reads as empty.

use anyhow::{Context, Result};
use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::NamedTempFile;

/// Raw text storage behind a table.
pub trait TableBacking: Send + Sync {
    /// Returns `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>>;
    /// Replaces the stored text as a single unit.
    fn write(&self, contents: &str) -> Result<()>;
}

/// File-backed table. Each write goes to its own temp file in the same
/// directory, which is then renamed over the table.
pub struct FileBacking {
    path: PathBuf,
}

impl FileBacking {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl TableBacking for FileBacking {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .with_context(|| format!("Failed to read table from {}", self.path.display()))
    }

    fn write(&self, contents: &str) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create table directory {}", dir.display()))?;

        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write temp file {}", file.path().display()))?;
        file.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temp file {}", file.path().display()))?;

        file.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory backing. Clones share the same underlying text.
#[derive(Clone, Default)]
pub struct MemoryBacking {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing pre-seeded with raw text, e.g. a corrupt table.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a whole string.
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TableBacking for MemoryBacking {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.lock().clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.lock() = Some(contents.to_string());
        Ok(())
    }
}

/// A `name -> value` table serialized as a pretty JSON object.
pub struct JsonTable<V> {
    backing: Arc<dyn TableBacking>,
    label: &'static str,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> Clone for JsonTable<V> {
    fn clone(&self) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            label: self.label,
            _value: std::marker::PhantomData,
        }
    }
}

impl<V> JsonTable<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(backing: Arc<dyn TableBacking>, label: &'static str) -> Self {
        Self {
            backing,
            label,
            _value: std::marker::PhantomData,
        }
    }

    /// Loads the whole table. Read and parse failures yield an empty table.
    pub fn load(&self) -> BTreeMap<String, V> {
        let raw = match self.backing.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(err) => {
                warn!("{} table unreadable, treating as empty: {err:#}", self.label);
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("{} table malformed, treating as empty: {err}", self.label);
            BTreeMap::new()
        })
    }

    /// Rewrites the whole table.
    pub fn save(&self, table: &BTreeMap<String, V>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(table)?;
        self.backing.write(&serialized)
    }

    /// Load, apply `update`, rewrite.
    pub fn update(&self, update: impl FnOnce(&mut BTreeMap<String, V>)) -> Result<()> {
        let mut table = self.load();
        update(&mut table);
        self.save(&table)
    }
}
