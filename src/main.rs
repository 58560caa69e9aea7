use anyhow::Result;

mod charts;
mod config;
mod error;
mod logging;
mod models;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (also reads .env)
    let config = config::load_config().await?;

    // Initialize logging
    logging::init_logging(&config.log_level)?;

    tracing::info!(
        "Writing report for {} to {}",
        config.settings.subject.full_name,
        config.output_dir.display()
    );

    let summary = services::report::run(&config).await?;

    for chart in &summary.charts {
        tracing::info!("Chart: {}", chart);
    }

    Ok(())
}
