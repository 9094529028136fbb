//! Trusted-source store
//!
//! An ordered, duplicate-free list of account handles whose posts may be
//! retweeted automatically. Persisted as a flat text file with one handle per
//! line. Every mutation rewrites the whole file before returning.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Durable list of trusted account handles
#[derive(Debug, Clone)]
pub struct TrustedSourceStore {
    path: PathBuf,
    sources: Vec<String>,
}

impl TrustedSourceStore {
    /// Load the store from `path`
    ///
    /// A missing file is created empty. Blank lines and repeated handles are
    /// dropped; the first occurrence keeps its position.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
            fs::File::create(&path).map_err(StorageError::Io)?;
            tracing::info!("Created empty trusted sources file at {}", path.display());
            return Ok(Self {
                path,
                sources: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path).map_err(StorageError::Io)?;
        let mut seen = HashSet::new();
        let sources: Vec<String> = content
            .lines()
            .filter_map(normalize)
            .filter(|handle| seen.insert(handle.clone()))
            .collect();

        tracing::debug!(
            "Loaded {} trusted source(s) from {}",
            sources.len(),
            path.display()
        );
        Ok(Self { path, sources })
    }

    /// Handles in insertion order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Add a handle; returns `false` for blank or already-present handles
    ///
    /// A leading `@` is ignored, so `@alice` and `alice` are the same source.
    pub fn add(&mut self, handle: &str) -> Result<bool> {
        let Some(handle) = normalize(handle) else {
            return Ok(false);
        };
        if self.sources.contains(&handle) {
            return Ok(false);
        }

        let mut updated = self.sources.clone();
        updated.push(handle.clone());
        save(&self.path, &updated)?;
        self.sources = updated;
        tracing::info!("Added trusted source: {}", handle);
        Ok(true)
    }

    /// Remove the handle at 1-based `position`
    ///
    /// Out-of-range positions leave the store untouched and return `None`.
    pub fn remove(&mut self, position: usize) -> Result<Option<String>> {
        if position == 0 || position > self.sources.len() {
            return Ok(None);
        }

        let mut updated = self.sources.clone();
        let removed = updated.remove(position - 1);
        save(&self.path, &updated)?;
        self.sources = updated;
        tracing::info!("Removed trusted source: {}", removed);
        Ok(Some(removed))
    }
}

/// Write `sources` next to `path`, then rename over it
///
/// The in-memory list is only replaced after this succeeds.
fn save(path: &Path, sources: &[String]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        for source in sources {
            writeln!(file, "{}", source)?;
        }
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::Io(e).into()
    })
}

fn normalize(raw: &str) -> Option<String> {
    let handle = raw.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle).trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}
