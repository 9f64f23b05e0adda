//! Document assembly: front matter plus the rendered block stream.

use std::path::{Component, Path};

use crate::contract::{ContentBlock, Entry};
use crate::error::SyncError;
use crate::render::render_blocks;

/// A complete Markdown document ready to be written as `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub slug: String,
    pub file_name: String,
    pub content: String,
}

/// Build the document for `entry` from its ordered `blocks`.
///
/// Fails with [`SyncError::MalformedEntry`] when a front-matter field or the
/// slug is missing, or when the slug would not name a file directly inside the
/// output directory. Output is byte-for-byte deterministic for the same input.
pub fn assemble(entry: &Entry, blocks: &[ContentBlock]) -> Result<RenderedDocument, SyncError> {
    let title = required(entry, "title", &entry.title)?;
    let description = required(entry, "description", &entry.description)?;
    let category = required(entry, "category", &entry.category)?;
    let slug = required(entry, "slug", &entry.slug)?.trim();
    if !is_flat_file_stem(slug) {
        return Err(SyncError::MalformedEntry {
            entry_id: entry.id.clone(),
            field: "slug",
        });
    }

    let mut content = format!(
        "---\ntitle: \"{title}\"\ndate: \"{date}\"\ndescription: \"{description}\"\ntag: \"{tag}\"\ntype: \"post\"\n---\n\n",
        date = entry.published_at.format("%Y-%m-%d"),
        tag = category.to_lowercase(),
    );

    for line in render_blocks(blocks) {
        content.push_str(&line);
        content.push('\n');
    }

    Ok(RenderedDocument {
        slug: slug.to_string(),
        file_name: format!("{slug}.md"),
        content,
    })
}

fn required<'a>(
    entry: &Entry,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, SyncError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SyncError::MalformedEntry {
            entry_id: entry.id.clone(),
            field,
        }),
    }
}

/// A single plain path component with no separator of either platform.
fn is_flat_file_stem(slug: &str) -> bool {
    if slug.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(slug).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
