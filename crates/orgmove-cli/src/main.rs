//! orgmove CLI
//!
//! Places accounts in organizational units of a file-backed organization.

use clap::Parser;

use orgmove_cli::{Cli, Result};
use orgmove_common::telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(TelemetryConfig {
        json: cli.json_logs,
        ..Default::default()
    })?;

    cli.run().await
}
