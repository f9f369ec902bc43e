//! Live dashboard

use std::sync::Arc;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use keywatch_client::WsConnector;
use keywatch_sync::{Dashboard, NoticeLevel, Session};
use keywatch_types::{ChannelState, ListKind, LogRecord};

use super::Context;
use crate::error::CliResult;
use crate::output::print_info;

/// Prints what changed since the previous call and keeps the status bar current
struct Renderer {
    bar: ProgressBar,
    logs_seen: u64,
    last_notice: u64,
}

impl Renderer {
    fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            logs_seen: 0,
            last_notice: 0,
        }
    }

    fn render(&mut self, dash: &Dashboard) {
        let received = dash.logs_received();
        let fresh = usize::try_from(received.saturating_sub(self.logs_seen)).unwrap_or(usize::MAX);
        let retained: Vec<&LogRecord> = dash.logs().collect();
        let skip = retained.len().saturating_sub(fresh);
        for record in &retained[skip..] {
            self.bar.println(log_line(record));
        }
        self.logs_seen = received;

        let last_notice = self.last_notice;
        for notice in dash.notices().iter().filter(|n| n.id > last_notice) {
            let marker = match notice.level {
                NoticeLevel::Info => "ℹ".blue(),
                NoticeLevel::Success => "✓".green(),
                NoticeLevel::Warning => "⚠".yellow(),
                NoticeLevel::Error => "✗".red(),
            };
            self.bar.println(format!("{} {}", marker, notice.message));
            self.last_notice = notice.id;
        }

        self.bar.set_message(status_line(dash));
        if let Some(percent) = dash.stats().and_then(|s| s.scan.progress_percent()) {
            self.bar.set_position(percent.round() as u64);
        }
    }
}

fn log_line(record: &LogRecord) -> String {
    let time = record
        .timestamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let level = match record.level.to_ascii_lowercase().as_str() {
        "error" => "ERROR".red(),
        "warning" | "warn" => "WARN".yellow(),
        "debug" => "DEBUG".dimmed(),
        _ => "INFO".blue(),
    };
    format!("{} {:>5} {}", time.dimmed(), level, record.message)
}

fn status_line(dash: &Dashboard) -> String {
    let connection = match dash.channel_state() {
        ChannelState::Open => "Connected".green(),
        _ => "Disconnected".red(),
    };
    let pending = dash
        .pending_count()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());

    match dash.stats() {
        Some(stats) => {
            let scan = if stats.scan.is_active {
                format!("scanning '{}'", stats.scan.current_query)
            } else {
                "scan idle".to_string()
            };
            format!(
                "{} | valid {} | limited {} | pending review {} | {}",
                connection,
                stats.storage.valid_keys,
                stats.storage.rate_limited_keys,
                pending,
                scan
            )
        }
        None => format!("{} | pending review {} | loading stats...", connection, pending),
    }
}

/// Follow the server live until interrupted
pub async fn execute(ctx: &Context) -> CliResult<()> {
    let connector = WsConnector::from_endpoint(&ctx.endpoint)?;
    let session = Session::new(ctx.api(), Arc::new(connector), ctx.sync.clone());
    let notices = session.channel().subscribe();
    session.start();

    let mut dash = session.dashboard();
    dash.refresh_stats();
    dash.refresh(ListKind::ReviewQueue);

    print_info("Watching dashboard... (Ctrl+C to stop)");
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut renderer = Renderer::new(bar.clone());
    let interrupted = tokio::select! {
        _ = dash.run(notices, |d| renderer.render(d)) => Ok(()),
        result = tokio::signal::ctrl_c() => result,
    };

    dash.teardown();
    session.teardown().await;
    bar.finish_and_clear();
    interrupted?;

    print_info("Stopped watching");
    Ok(())
}
