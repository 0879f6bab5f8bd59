use super::OutputFormat;
use crate::formatters;
use keylens_config::Config;
use keylens_core::Result;
use keylens_report::ReportContext;

pub async fn execute(config: &Config, key: &str, format: OutputFormat) -> Result<()> {
    let store = keylens_store::open(&config.store.url).await?;
    let context = ReportContext::new(store);

    match context.key_stats(key).await? {
        Some(record) => formatters::print_record(key, &record, format),
        None => {
            tracing::warn!(key = %key, "no statistics recorded for key");
            Ok(())
        }
    }
}
