use anyhow::Result;
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::check_api_key;

#[derive(Debug, Args)]
pub struct CheckKeyArgs {
    /// Key to check; defaults to the configured OPENAI_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,
}

pub async fn handle_check_key(args: CheckKeyArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let key = args
        .api_key
        .or_else(|| config.llm.api_key.clone())
        .unwrap_or_default();

    let outcome = check_api_key(&config.llm, &config.chat, &key).await;
    print!("{}", formatter.format_key_check(&outcome));

    if !outcome.is_valid() {
        anyhow::bail!("API key check failed");
    }
    Ok(())
}
