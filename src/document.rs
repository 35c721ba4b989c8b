use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::progress::ProgressStore;

const COVER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Stable key joining a document to its stored progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonical absolute path, so the same file maps to the same key across runs.
    pub fn from_path(path: &Path) -> Result<Self> {
        let canonical = fs::canonicalize(path)
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        Ok(Self(canonical.to_string_lossy().into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the word sequence and cover art for a document.
pub trait TokenExtractor: Send + Sync {
    fn extract(&self, id: &DocumentId) -> Result<Vec<String>>;
    fn extract_cover_image(&self, id: &DocumentId) -> Result<Option<Vec<u8>>>;
}

/// Naive whitespace tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Reads UTF-8 text files named by their document id.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    fn cover_candidates(path: &Path) -> Vec<PathBuf> {
        let Some(dir) = path.parent() else {
            return Vec::new();
        };
        let stem = path.file_stem().map(|stem| stem.to_string_lossy().into_owned());

        let mut candidates = Vec::new();
        for ext in COVER_EXTENSIONS {
            if let Some(stem) = &stem {
                candidates.push(dir.join(format!("{stem}.{ext}")));
            }
            candidates.push(dir.join(format!("cover.{ext}")));
        }
        candidates
    }
}

impl TokenExtractor for PlainTextExtractor {
    fn extract(&self, id: &DocumentId) -> Result<Vec<String>> {
        let text = fs::read_to_string(id.as_str())
            .with_context(|| format!("failed to read text from {id}"))?;
        Ok(tokenize(&text))
    }

    fn extract_cover_image(&self, id: &DocumentId) -> Result<Option<Vec<u8>>> {
        for candidate in Self::cover_candidates(Path::new(id.as_str())) {
            if candidate.is_file() {
                let bytes = fs::read(&candidate)
                    .with_context(|| format!("failed to read cover {}", candidate.display()))?;
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}

/// A document ready for playback.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub id: DocumentId,
    pub tokens: Arc<[String]>,
    pub cover: Option<Vec<u8>>,
    pub resume_index: usize,
    pub percent_complete: u8,
}

impl LoadedDocument {
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Extracts tokens and cover for `path` and looks up its stored progress.
///
/// Any extraction failure, or a document without words, is a load error.
pub fn load_document(
    path: &Path,
    extractor: &dyn TokenExtractor,
    progress: &ProgressStore,
) -> Result<LoadedDocument> {
    let load = || -> Result<LoadedDocument> {
        let id = DocumentId::from_path(path)?;
        let tokens = extractor.extract(&id)?;
        if tokens.is_empty() {
            bail!("document contains no words");
        }
        let cover = extractor.extract_cover_image(&id)?;
        let resume_index = progress.get(&id).min(tokens.len());
        let percent_complete = percent_complete(resume_index, tokens.len());

        Ok(LoadedDocument {
            id,
            tokens: tokens.into(),
            cover,
            resume_index,
            percent_complete,
        })
    };

    load().map_err(|err| anyhow!("could not load document {}: {err:#}", path.display()))
}

/// `round(done / total * 100)`, 0 for an empty document.
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (done as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
