use std::future::Future;

use anyhow::Result;
use clap::Args;

use crate::models::Config;
use crate::server::{AppState, run};

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:8501
    #[arg(long, short = 'b')]
    pub bind: Option<String>,
}

pub async fn handle_serve<F>(args: ServeArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = Config::load()?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let state = AppState::new(config)?;
    eprintln!("Serving docqa on http://{}", bind);

    run(state, &bind, shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}
