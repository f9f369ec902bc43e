//! Scan control commands

use clap::Subcommand;

use super::{settle, Context};
use crate::error::CliResult;
use crate::output::print_info;

/// Scan subcommands
#[derive(Subcommand)]
pub enum ScanCommands {
    /// Start the background scan
    Start,

    /// Stop the running scan
    Stop,
}

/// Execute a scan command
pub async fn execute(command: ScanCommands, ctx: &Context) -> CliResult<()> {
    let mut dash = ctx.dashboard();

    // Controls follow the scan state last confirmed by the server.
    dash.refresh_stats();
    settle(&mut dash).await?;

    match command {
        ScanCommands::Start => dash.start_scan()?,
        ScanCommands::Stop => dash.stop_scan()?,
    }
    settle(&mut dash).await?;

    if let Some(stats) = dash.stats() {
        let state = if stats.scan.is_active { "running" } else { "idle" };
        print_info(&format!("Scan is {}", state));
    }
    Ok(())
}
