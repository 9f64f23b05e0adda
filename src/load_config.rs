//! `load_config` module: resolves the process environment into a [`PublishConfig`].
//!
//! All configuration comes from environment variables (optionally seeded from a
//! `.env` file by the binary). Any missing or invalid value fails loading with an
//! error naming the variable.
//!
//! | variable           | required | default                  |
//! |--------------------|----------|--------------------------|
//! | `API_TOKEN`        | yes      |                          |
//! | `COLLECTION_ID`    | yes      |                          |
//! | `REPO_DIRECTORY`   | yes      |                          |
//! | `OUTPUT_DIRECTORY` | no       | `posts` (under the repo) |
//! | `INTERVAL_MINUTES` | no       | `15`                     |
//! | `LOG_FILE`         | no       |                          |
//! | `API_BASE_URL`     | no       | `https://api.notion.com` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tracing::{error, info};

use crate::config::{
    NotionConfig, PublishConfig, DEFAULT_API_BASE_URL, DEFAULT_INTERVAL_MINUTES,
    DEFAULT_OUTPUT_DIRECTORY,
};

pub fn load_config() -> Result<PublishConfig> {
    info!("Loading configuration from environment");

    let token = required("API_TOKEN")?;
    let database_id = required("COLLECTION_ID")?;
    let repo_dir = PathBuf::from(required("REPO_DIRECTORY")?);

    let output_dir = optional("OUTPUT_DIRECTORY")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY));
    // relative output paths live inside the repository
    let output_dir = if output_dir.is_absolute() {
        output_dir
    } else {
        repo_dir.join(output_dir)
    };

    let interval_minutes = match optional("INTERVAL_MINUTES") {
        None => DEFAULT_INTERVAL_MINUTES,
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => {
                error!(var = %raw, "INTERVAL_MINUTES must be positive");
                bail!("INTERVAL_MINUTES must be a positive integer, got 0");
            }
            Ok(minutes) => minutes,
            Err(e) => {
                error!(error = ?e, var = %raw, "INTERVAL_MINUTES must be a valid integer");
                bail!("INTERVAL_MINUTES must be a positive integer: {e}");
            }
        },
    };

    let interval_secs = interval_minutes.checked_mul(60).ok_or_else(|| {
        error!(minutes = interval_minutes, "INTERVAL_MINUTES is too large");
        anyhow!("INTERVAL_MINUTES is too large: {interval_minutes}")
    })?;

    let base_url = optional("API_BASE_URL")
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let config = PublishConfig {
        notion: NotionConfig {
            token,
            database_id,
            base_url,
        },
        repo_dir,
        output_dir,
        interval: Duration::from_secs(interval_secs),
        log_file: optional("LOG_FILE").map(PathBuf::from),
    };
    Ok(config)
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Found required variable in env");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            bail!("{name} environment variable is empty")
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            bail!("{name} environment variable not set: {e}")
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
