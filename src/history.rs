// src/history.rs
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::drivers::MonitorError;
use crate::export::Downloader;
use crate::types::Sample;

/// A saved export: the CSV blob plus an independent copy of the samples.
#[derive(Clone, Debug)]
pub struct SavedFile {
    pub name: String,
    pub created_at: DateTime<Local>,
    pub blob: Arc<[u8]>,
    pub snapshot: Vec<Sample>,
}

/// Saved files for this run, newest first. Nothing is persisted.
#[derive(Default)]
pub struct HistoryRegistry {
    files: Vec<SavedFile>,
}

impl HistoryRegistry {
    pub fn push(&mut self, file: SavedFile) {
        self.files.insert(0, file);
    }

    pub fn get(&self, index: usize) -> Option<&SavedFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedFile> {
        self.files.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Re-delivers entry `index`. `Ok(None)` when there is no such entry.
    pub fn download(
        &self,
        index: usize,
        downloader: &mut dyn Downloader,
    ) -> Result<Option<(String, PathBuf)>, MonitorError> {
        let Some(file) = self.files.get(index) else {
            return Ok(None);
        };
        let path = downloader.deliver(&file.name, &file.blob)?;
        Ok(Some((file.name.clone(), path)))
    }
}
