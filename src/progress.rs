use anyhow::Result;
use std::{path::PathBuf, sync::Arc};

use crate::document::DocumentId;
use crate::storage::{FileBacking, JsonTable, TableBacking};

/// Durable `document -> next unread index` table.
///
/// Every call is a full load or a full rewrite of the backing table.
#[derive(Clone)]
pub struct ProgressStore {
    table: JsonTable<u64>,
}

impl ProgressStore {
    pub fn new(backing: Arc<dyn TableBacking>) -> Self {
        Self {
            table: JsonTable::new(backing, "progress"),
        }
    }

    pub fn open(path: PathBuf) -> Self {
        Self::new(Arc::new(FileBacking::new(path)))
    }

    /// Stored resume index, or 0 when absent or unreadable.
    pub fn get(&self, id: &DocumentId) -> usize {
        self.table
            .load()
            .get(id.as_str())
            .map(|index| *index as usize)
            .unwrap_or(0)
    }

    pub fn set(&self, id: &DocumentId, index: usize) -> Result<()> {
        self.table.update(|table| {
            table.insert(id.as_str().to_string(), index as u64);
        })
    }

    pub fn reset(&self, id: &DocumentId) -> Result<()> {
        self.set(id, 0)
    }
}
