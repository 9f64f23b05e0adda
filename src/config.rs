use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "posts";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;

/// Everything a running publisher needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub notion: NotionConfig,
    /// Root of the git working tree.
    pub repo_dir: PathBuf,
    /// Where `<slug>.md` files are written; inside `repo_dir`.
    pub output_dir: PathBuf,
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub log_file: Option<PathBuf>,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            database_id = %self.notion.database_id,
            repo_dir = %self.repo_dir.display(),
            output_dir = %self.output_dir.display(),
            interval_secs = self.interval.as_secs(),
            "Loaded publish config"
        );
        debug!(config = ?self, "Publish config loaded (full debug)");
    }
}

/// Connection settings for the Notion API.
#[derive(Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub base_url: String,
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}
