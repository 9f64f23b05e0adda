//! Filesystem [`DocumentStore`]: one Markdown file per entry in a flat directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::contract::{BoxError, DocumentStore};

/// Writes documents into `output_dir`, creating it on first write.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    output_dir: PathBuf,
}

impl FsDocumentStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, BoxError> {
        let mut components = Path::new(file_name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            error!(file_name, "Refusing to write outside the output directory");
            return Err(format!("{file_name:?} is not a plain file name").into());
        }

        if !self.output_dir.exists() {
            tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
                error!(error = ?e, path = %self.output_dir.display(), "Failed to create output directory");
                e
            })?;
            debug!(path = %self.output_dir.display(), "Created output directory");
        }

        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, content).await.map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to write document");
            e
        })?;
        Ok(path)
    }

    async fn list(&self) -> Result<Vec<String>, BoxError> {
        let mut dir = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Box::new(e)),
        };

        let mut names = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let is_markdown = path.extension().is_some_and(|ext| ext == "md");
            if !is_markdown || !item.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
