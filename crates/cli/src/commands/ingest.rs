use super::OutputFormat;
use crate::formatters;
use keylens_config::Config;
use keylens_core::{Error, Result};
use keylens_monitor::IngestPipeline;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::Instrument;

pub async fn execute(config: &Config, input: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let source = input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| Error::file_system(path, "open capture", e))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let store = keylens_store::open(&config.store.url).await?;
    tracing::info!(store = %store.describe(), source = %source, "ingest starting");

    let pipeline = IngestPipeline::new(store, config.ingest.workers, config.ingest.channel_capacity);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    let summary = pipeline
        .run_until(reader, shutdown)
        .instrument(keylens_utils::ingest_span(&source, config.ingest.workers))
        .await?;

    formatters::print_summary(&summary, format)
}
