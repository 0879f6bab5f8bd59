use crate::commands::{ingest, stats, Commands};
use keylens_config::Config;
use keylens_core::Result;

impl Commands {
    pub async fn execute(self, config: Config) -> Result<()> {
        match self {
            Commands::Ingest { input, format, .. } => ingest::execute(&config, input, format).await,
            Commands::Report { command } => command.execute(&config).await,
            Commands::Stats { key, format } => stats::execute(&config, &key, format).await,
            Commands::Completion { shell } => {
                crate::completion::generate_completion(shell);
                Ok(())
            }
        }
    }
}
