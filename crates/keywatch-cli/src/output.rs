//! Output formatting utilities

use colored::*;
use keywatch_sync::{NoticeLevel, PageLink};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::CliResult;

const REPO_WIDTH: usize = 30;
const PATH_WIDTH: usize = 40;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print a vector of items in the specified format
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&data)?);
        }
    }
    Ok(())
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print a dashboard notice with the marker of its level
pub fn print_notice(level: NoticeLevel, message: &str) {
    match level {
        NoticeLevel::Info => print_info(message),
        NoticeLevel::Success => print_success(message),
        NoticeLevel::Warning => print_warning(message),
        NoticeLevel::Error => print_error(message),
    }
}

/// Hide the middle of a credential, keeping four characters on each side.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return key.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

/// Cut a repository name to its first characters.
pub fn shorten_repo(repo: &str) -> String {
    if repo.chars().count() > REPO_WIDTH {
        let head: String = repo.chars().take(REPO_WIDTH).collect();
        format!("{head}...")
    } else {
        repo.to_string()
    }
}

/// Keep the tail of a file path, where the file name lives.
pub fn shorten_path(path: &str) -> String {
    let len = path.chars().count();
    if len > PATH_WIDTH {
        let tail: String = path.chars().skip(len - PATH_WIDTH).collect();
        format!("...{tail}")
    } else {
        path.to_string()
    }
}

/// Render the pagination bar as a single line, e.g. `« 1 … 4 [5] 6 … 10 »`
pub fn render_page_links(links: &[PageLink]) -> String {
    links
        .iter()
        .filter_map(|link| match link {
            PageLink::Previous { enabled, .. } => enabled.then(|| "«".to_string()),
            PageLink::Next { enabled, .. } => enabled.then(|| "»".to_string()),
            PageLink::Page { number, current: true } => Some(format!("[{number}]")),
            PageLink::Page { number, .. } => Some(number.to_string()),
            PageLink::Ellipsis => Some("…".to_string()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print the position of a listed page under its table
pub fn print_page_summary(page: u32, pages: u32, total: u64, links: &[PageLink]) {
    let summary = format!("Page {} of {} ({} total)", page, pages.max(1), total);
    println!("{}", summary.dimmed());
    let bar = render_page_links(links);
    if !bar.is_empty() {
        println!("{}", bar);
    }
}

/// Compact timestamp for table cells
pub fn format_time(time: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
