//! Catalog lookup
//!
//! Resolves an ISBN to descriptive metadata through an external volumes
//! API. The catalog only sees the [`CatalogLookup`] trait; tests use
//! [`StaticLookup`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::book::{normalize_isbn, BookMetadata};

/// Why an ISBN could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Book not found for ISBN {0}")]
    NotFound(String),

    #[error("Failed to fetch book details for ISBN {isbn}: {reason}")]
    Transport { isbn: String, reason: String },

    #[error("Unexpected lookup response for ISBN {isbn}: {reason}")]
    Malformed { isbn: String, reason: String },
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Metadata for `isbn`, with `isbn_13` set to the requested ISBN
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, LookupError>;
}

// ==================
// Google Books
// ==================

pub const DEFAULT_VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Google Books volumes API (`?q=isbn:<isbn>`)
#[derive(Debug, Clone)]
pub struct GoogleBooksLookup {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooksLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport {
                isbn: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CatalogLookup for GoogleBooksLookup {
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, LookupError> {
        let transport = |e: reqwest::Error| LookupError::Transport {
            isbn: isbn.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", format!("isbn:{}", isbn))])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(LookupError::Transport {
                isbn: isbn.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let body: VolumesResponse = response.json().await.map_err(|e| LookupError::Malformed {
            isbn: isbn.to_string(),
            reason: e.to_string(),
        })?;

        body.items
            .into_iter()
            .next()
            .map(|item| item.volume_info.into_metadata(isbn))
            .ok_or_else(|| LookupError::NotFound(isbn.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: String,
    authors: Vec<String>,
    publisher: String,
    published_date: String,
    description: String,
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<u32>,
    categories: Vec<String>,
    language: String,
    preview_link: String,
    info_link: String,
    image_links: ImageLinks,
}

#[derive(Debug, Default, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    small_thumbnail: String,
    thumbnail: String,
}

impl VolumeInfo {
    fn into_metadata(self, isbn: &str) -> BookMetadata {
        let isbn_10 = self
            .industry_identifiers
            .iter()
            .find(|id| id.kind == "ISBN_10")
            .map(|id| id.identifier.clone());

        BookMetadata {
            isbn_10,
            isbn_13: normalize_isbn(isbn),
            title: self.title,
            subtitle: self.subtitle,
            authors: self.authors,
            publisher: self.publisher,
            published_date: self.published_date,
            description: self.description,
            page_count: self.page_count,
            categories: self.categories,
            language: self.language,
            preview_link: self.preview_link,
            info_link: self.info_link,
            small_thumbnail: self.image_links.small_thumbnail,
            thumbnail: self.image_links.thumbnail,
        }
    }
}

// ==================
// Static
// ==================

/// Fixed table of known ISBNs
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<String, BookMetadata>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metadata: BookMetadata) -> Self {
        self.entries
            .insert(normalize_isbn(&metadata.isbn_13), metadata);
        self
    }
}

#[async_trait]
impl CatalogLookup for StaticLookup {
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, LookupError> {
        self.entries
            .get(&normalize_isbn(isbn))
            .cloned()
            .ok_or_else(|| LookupError::NotFound(isbn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_info_maps_fields() {
        let json = r#"{
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "Clean Code",
                    "authors": ["Robert C. Martin"],
                    "publishedDate": "2008-08-01",
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0132350882"},
                        {"type": "ISBN_13", "identifier": "9780132350884"}
                    ],
                    "pageCount": 464,
                    "categories": ["Computers"],
                    "imageLinks": {"smallThumbnail": "s.png", "thumbnail": "t.png"}
                }
            }]
        }"#;
        let body: VolumesResponse = serde_json::from_str(json).unwrap();
        let metadata = body
            .items
            .into_iter()
            .next()
            .unwrap()
            .volume_info
            .into_metadata("978-0132350884");

        assert_eq!(metadata.isbn_13, "9780132350884");
        assert_eq!(metadata.isbn_10.as_deref(), Some("0132350882"));
        assert_eq!(metadata.authors, vec!["Robert C. Martin"]);
        assert_eq!(metadata.page_count, Some(464));
        assert_eq!(metadata.thumbnail, "t.png");
        assert!(metadata.has_category("computers"));
    }

    #[test]
    fn test_empty_response_has_no_items() {
        let body: VolumesResponse = serde_json::from_str(r#"{"totalItems": 0}"#).unwrap();
        assert!(body.items.is_empty());
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let lookup = StaticLookup::new().with(BookMetadata::new("9780132350884", "Clean Code"));
        assert!(lookup.lookup("978-0-13-235088-4").await.is_ok());
        assert_eq!(
            lookup.lookup("9780000000000").await,
            Err(LookupError::NotFound("9780000000000".to_string()))
        );
    }
}
