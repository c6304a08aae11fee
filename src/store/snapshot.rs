//! Store snapshots
//!
//! The whole store serialized as one JSON document. Saving writes a
//! temporary sibling file and renames it over the target so a crash
//! mid-write never leaves a truncated snapshot behind.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::borrowing::Borrowing;
use crate::catalog::Book;
use crate::notifications::Notification;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub format_version: u32,
    pub books: Vec<Book>,
    pub borrowings: Vec<Borrowing>,
    pub notifications: Vec<Notification>,
}

impl StoreSnapshot {
    /// Check the invariants a live store relies on
    pub fn validate(&self) -> StoreResult<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }

        let mut book_ids = HashSet::new();
        let mut isbns = HashSet::new();
        for book in &self.books {
            if !book_ids.insert(book.id) {
                return Err(StoreError::Corrupt(format!("duplicate book id {}", book.id)));
            }
            if !isbns.insert(book.metadata.isbn_13.as_str()) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate isbn_13 {}",
                    book.metadata.isbn_13
                )));
            }
            if !book.availability().is_valid() {
                return Err(StoreError::Corrupt(format!(
                    "book {} has available {} outside 0..={}",
                    book.id,
                    book.available(),
                    book.quantity()
                )));
            }
        }

        let mut borrowing_ids = HashSet::new();
        for borrowing in &self.borrowings {
            if !borrowing_ids.insert(borrowing.id()) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate borrowing id {}",
                    borrowing.id()
                )));
            }
            if !book_ids.contains(&borrowing.book_id()) {
                return Err(StoreError::Corrupt(format!(
                    "borrowing {} references missing book {}",
                    borrowing.id(),
                    borrowing.book_id()
                )));
            }
        }

        let mut notification_ids = HashSet::new();
        for notification in &self.notifications {
            if !notification_ids.insert(notification.id) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate notification id {}",
                    notification.id
                )));
            }
        }

        Ok(())
    }

    /// Read a snapshot. A missing file is not an error.
    pub fn load(path: &Path) -> StoreResult<Option<StoreSnapshot>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    /// Write atomically via temp file and rename
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = temp_path(path);
        {
            let file = File::create(&temp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp, path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
