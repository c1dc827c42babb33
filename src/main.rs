use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pr_worklink::app::{self, RunStatus};
use pr_worklink::ci;
use pr_worklink::cli::Args;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match app::run(args).await {
        Ok(RunStatus::Success) => {}
        Ok(RunStatus::Failed) => process::exit(1),
        Err(err) => {
            tracing::error!(%err, "run aborted");
            ci::error(&format!("Action failed with error: {}", err));
            process::exit(1);
        }
    }
}
