//! Book model
//!
//! A [`Book`] is one catalog title, not a physical copy. Descriptive
//! fields live in [`BookMetadata`]; the copy counters live in
//! [`Availability`] and are only mutated by the availability ledger.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, LibraryResult};
use crate::ids::BookId;
use crate::ledger::Availability;

/// Descriptive fields of a catalog title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub isbn_10: Option<String>,
    pub isbn_13: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publisher: String,
    /// Free-form, as returned by lookups ("2004", "2004-05-01")
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Genres; recommendations match on these
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub preview_link: String,
    #[serde(default)]
    pub info_link: String,
    #[serde(default)]
    pub small_thumbnail: String,
    #[serde(default)]
    pub thumbnail: String,
}

impl BookMetadata {
    /// Minimal metadata, mostly for tests and manual cataloging
    pub fn new(isbn_13: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            isbn_13: isbn_13.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_authors<I, A>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, C>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Normalize identifiers and check required fields
    pub fn validate(mut self) -> LibraryResult<Self> {
        self.isbn_13 = normalize_isbn(&self.isbn_13);
        if !isbn_13_pattern().is_match(&self.isbn_13) {
            return Err(LibraryError::InvalidInput(format!(
                "isbn_13 must be 13 digits, got '{}'",
                self.isbn_13
            )));
        }

        if let Some(isbn_10) = self.isbn_10.take() {
            let isbn_10 = normalize_isbn(&isbn_10);
            if isbn_10.is_empty() {
                self.isbn_10 = None;
            } else if isbn_10_pattern().is_match(&isbn_10) {
                self.isbn_10 = Some(isbn_10);
            } else {
                return Err(LibraryError::InvalidInput(format!(
                    "isbn_10 must be 9 digits followed by a digit or X, got '{}'",
                    isbn_10
                )));
            }
        }

        if self.title.trim().is_empty() {
            return Err(LibraryError::InvalidInput("title is required".to_string()));
        }

        Ok(self)
    }

    /// Whether any of this book's categories matches `category`, ignoring case
    pub fn has_category(&self, category: &str) -> bool {
        let wanted = category_key(category);
        self.categories.iter().any(|c| category_key(c) == wanted)
    }
}

/// Case-folded form categories are compared by
pub fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Strip the separators people paste into ISBNs
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn isbn_13_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{13}$").expect("static ISBN-13 pattern"))
}

fn isbn_10_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{9}[\dX]$").expect("static ISBN-10 pattern"))
}

/// A cataloged title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    #[serde(flatten)]
    pub metadata: BookMetadata,
    #[serde(flatten)]
    pub(crate) availability: Availability,
    pub added_at: DateTime<Utc>,
}

impl Book {
    /// Assemble a stored row. Stores call this when assigning ids or
    /// loading persisted rows.
    pub fn from_parts(
        id: BookId,
        metadata: BookMetadata,
        availability: Availability,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            metadata,
            availability,
            added_at,
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn quantity(&self) -> u32 {
        self.availability.quantity()
    }

    pub fn available(&self) -> u32 {
        self.availability.available()
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    /// Case-insensitive substring match over title and authors
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.metadata.title.to_lowercase().contains(&needle)
            || self
                .metadata
                .authors
                .iter()
                .any(|a| a.to_lowercase().contains(&needle))
    }
}

/// Partial catalog edit. `available` is deliberately absent: a quantity
/// change is reconciled against copies on loan by the ledger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub language: Option<String>,
    pub quantity: Option<u32>,
}

impl BookUpdate {
    pub fn apply_to(&self, metadata: &mut BookMetadata) {
        if let Some(title) = &self.title {
            metadata.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            metadata.subtitle = subtitle.clone();
        }
        if let Some(authors) = &self.authors {
            metadata.authors = authors.clone();
        }
        if let Some(publisher) = &self.publisher {
            metadata.publisher = publisher.clone();
        }
        if let Some(published_date) = &self.published_date {
            metadata.published_date = published_date.clone();
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(page_count) = self.page_count {
            metadata.page_count = Some(page_count);
        }
        if let Some(categories) = &self.categories {
            metadata.categories = categories.clone();
        }
        if let Some(language) = &self.language {
            metadata.language = language.clone();
        }
    }

    pub fn validate(&self) -> LibraryResult<()> {
        match &self.title {
            Some(title) if title.trim().is_empty() => Err(LibraryError::InvalidInput(
                "title cannot be blank".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
