//! # contract: data model and collaborator interfaces
//!
//! This module holds the plain data types that flow through the publish
//! pipeline ([`Entry`], [`ContentBlock`], [`TextRun`]) and the three traits the
//! [`crate::synchronise::Synchroniser`] drives:
//!
//! - [`SourceStore`]: the hosted content database (query, fetch blocks, acknowledge)
//! - [`VersionControl`]: the site repository (stage, commit, push)
//! - [`DocumentStore`]: the output directory holding one `<slug>.md` per entry
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so integration tests can build
//!   `MockSourceStore`, `MockVersionControl` and `MockDocumentStore` without
//!   touching the network, git or the disk.
//!
//! ## Errors
//! - Collaborator failures are boxed trait objects ([`BoxError`]); the
//!   synchroniser maps them into the stage-specific variants of
//!   [`crate::error::SyncError`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Error returned across every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Source-side publication state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    ReadyToPublish,
    Published,
}

/// One publishable content item, as read from the source store.
///
/// The front-matter fields are optional here because the source can hand back
/// an entry with any of them blank; [`crate::assemble::assemble`] rejects such
/// entries instead of rendering a half-filled header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque, stable identifier from the source store.
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Output file stem; the document is written as `<slug>.md`.
    pub slug: Option<String>,
    /// Empty when the source exposes zero or one tag.
    pub tags: Vec<String>,
    pub published_at: NaiveDate,
    pub status: Status,
}

impl Entry {
    /// `<slug>.md`, when the entry has a usable slug.
    pub fn file_name(&self) -> Option<String> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .map(|slug| format!("{slug}.md"))
    }
}

/// Emphasis flags carried by a [`TextRun`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// One contiguous span of styled text inside a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Raw text, not yet trimmed or escaped.
    pub text: String,
    pub emphasis: Emphasis,
    pub link: Option<String>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_emphasis(mut self, emphasis: Emphasis) -> Self {
        self.emphasis = emphasis;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// One node of an entry's flat, ordered content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "runs")]
pub enum ContentBlock {
    Paragraph(Vec<TextRun>),
    Heading1(Vec<TextRun>),
    Heading2(Vec<TextRun>),
    Heading3(Vec<TextRun>),
    BulletItem(Vec<TextRun>),
    /// Any block kind the renderer does not handle, tagged with the source's
    /// own type name for logging.
    Unsupported(String),
}

/// The hosted content database entries are read from and acknowledged in.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All entries currently in `status`, in the order the store returns them.
    async fn query(&self, status: Status) -> Result<Vec<Entry>, BoxError>;

    /// The ordered content blocks of one entry.
    async fn fetch_blocks(&self, entry_id: &str) -> Result<Vec<ContentBlock>, BoxError>;

    /// Move an entry to `status` in the source store.
    async fn set_status(&self, entry_id: &str, status: Status) -> Result<(), BoxError>;
}

/// The version-controlled working tree the documents are committed to.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stage a single written file.
    async fn stage(&self, path: &Path) -> Result<(), BoxError>;

    /// Whether the index holds changes for `path` relative to the last commit.
    async fn has_staged_changes(&self, path: &Path) -> Result<bool, BoxError>;

    /// Commit the staged state of `path` alone, leaving anything else in the index untouched.
    async fn commit(&self, path: &Path, message: &str) -> Result<(), BoxError>;

    /// Push local commits to the remote.
    async fn push(&self) -> Result<(), BoxError>;
}

/// The output directory holding the generated Markdown files.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write (or overwrite) `file_name` with `content`, returning the full path written.
    async fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, BoxError>;

    /// Names of the Markdown files currently in the output directory.
    async fn list(&self) -> Result<Vec<String>, BoxError>;
}
