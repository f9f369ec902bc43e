//! Summary statistics command

use keywatch_types::SummaryStats;
use serde::Serialize;
use tabled::Tabled;

use super::{settle, Context};
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize, Tabled)]
struct StatRow {
    metric: &'static str,
    value: String,
}

fn rows(stats: &SummaryStats) -> Vec<StatRow> {
    let scan = &stats.scan;
    let progress = scan
        .progress_percent()
        .map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| "-".to_string());
    let current = if scan.current_query.is_empty() {
        "-".to_string()
    } else {
        scan.current_query.clone()
    };

    vec![
        StatRow { metric: "valid keys", value: stats.storage.valid_keys.to_string() },
        StatRow { metric: "rate-limited keys", value: stats.storage.rate_limited_keys.to_string() },
        StatRow { metric: "files scanned", value: stats.storage.total_files_scanned.to_string() },
        StatRow { metric: "scan active", value: scan.is_active.to_string() },
        StatRow {
            metric: "queries",
            value: format!("{}/{}", scan.processed_queries, scan.total_queries),
        },
        StatRow { metric: "progress", value: progress },
        StatRow { metric: "current query", value: current },
        StatRow { metric: "processed files", value: scan.processed_files.to_string() },
        StatRow { metric: "errors", value: scan.error_count.to_string() },
    ]
}

/// Fetch and print the summary stats
pub async fn execute(ctx: &Context) -> CliResult<()> {
    let mut dash = ctx.dashboard();
    dash.refresh_stats();
    settle(&mut dash).await?;

    let stats = dash
        .stats()
        .ok_or_else(|| CliError::Rejected("no stats received".to_string()))?;
    match ctx.format {
        OutputFormat::Table => output::print_output(rows(stats), OutputFormat::Table),
        format => output::print_single(stats, format),
    }
}
