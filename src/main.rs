use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;
mod domain;
mod error;
mod infrastructure;
mod observability;
mod services;
mod ui;

use cli::Cli;
use infrastructure::http::build_client;
use services::SyncService;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init_logging(cli.verbose);

    info!("Starting the firewall update script...");

    let service = SyncService::new(build_client()?, cli.endpoints());

    // Every required variable is checked before the first request goes out
    match service
        .run_with_lookup(|name| std::env::var(name).ok(), &cli.options())
        .await
    {
        Ok(report) => {
            ui::print_report(&report);
            Ok(())
        }
        Err(e) => {
            let e = anyhow::Error::from(e);
            error!("Firewall sync failed: {:#}", e);
            ui::print_error("Firewall sync failed; the policy file and security rules may disagree until the next successful run");
            Err(e)
        }
    }
}
