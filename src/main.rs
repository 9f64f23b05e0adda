use anyhow::Result;
use clap::Parser;
use notion_publish::cli::{init_tracing, run, Cli};
use notion_publish::load_config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config()?;

    init_tracing(config.log_file.as_deref())?;
    tracing::info!("Publisher startup: tracing initialised, environment loaded");
    config.trace_loaded();

    let result = run(cli, config).await;
    match &result {
        Ok(_) => tracing::info!("Publisher exited successfully"),
        Err(e) => tracing::error!(error = %e, "Publisher exited with error"),
    }
    result
}
