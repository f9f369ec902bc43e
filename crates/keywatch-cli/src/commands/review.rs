//! Review queue commands

use clap::Subcommand;
use colored::*;
use keywatch_types::{
    ListKind, ReviewAction, ReviewItem, ReviewItemId, ReviewStatus, Severity, FILTER_SEVERITY,
    FILTER_STATUS,
};
use serde::Serialize;
use tabled::Tabled;

use super::{settle, Context};
use crate::error::{CliError, CliResult};
use crate::output::{
    self, format_time, print_error, print_info, shorten_path, shorten_repo, OutputFormat,
};

/// Review subcommands
#[derive(Subcommand)]
pub enum ReviewCommands {
    /// List findings in the review queue
    List {
        /// Review status (pending, approved, rejected, created)
        #[arg(short, long, default_value = "pending")]
        status: ReviewStatus,

        /// Severity (critical, high, medium)
        #[arg(long)]
        severity: Option<Severity>,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show one finding
    Show {
        /// Finding ID
        id: ReviewItemId,
    },

    /// Approve a finding for disclosure
    Approve {
        /// Finding ID
        id: ReviewItemId,

        /// Optional review note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Reject a finding
    Reject {
        /// Finding ID
        id: ReviewItemId,

        /// Rationale for the rejection
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Create the public disclosure of an approved finding
    Disclose {
        /// Finding ID
        id: ReviewItemId,
    },
}

/// Table row for finding display
#[derive(Debug, Serialize, Tabled)]
struct FindingRow {
    id: String,
    severity: String,
    status: String,
    #[tabled(rename = "type")]
    key_type: String,
    repo: String,
    file: String,
    reviewer: String,
    found: String,
}

impl From<&ReviewItem> for FindingRow {
    fn from(item: &ReviewItem) -> Self {
        Self {
            id: item.id.to_string(),
            severity: item.severity.to_string(),
            status: item.status.to_string(),
            key_type: item.key_type.clone(),
            repo: shorten_repo(&item.repo_name),
            file: shorten_path(&item.file_path),
            reviewer: item.reviewer.clone().unwrap_or_else(|| "-".to_string()),
            found: format_time(item.created_at.as_ref()),
        }
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
    }
}

fn print_finding(item: &ReviewItem) {
    println!("Finding {}  {}  {}", item.id, severity_label(item.severity), item.status);
    println!("  Type:       {}", item.key_type);
    println!("  Provider:   {}", item.provider);
    println!("  Repository: {}", item.repo_name);
    println!("  File:       {}", item.file_path);
    if !item.file_url.is_empty() {
        println!("  URL:        {}", item.file_url);
    }
    if !item.key_preview.is_empty() {
        println!("  Preview:    {}", item.key_preview);
    }
    if let Some(reviewer) = &item.reviewer {
        println!("  Reviewer:   {}", reviewer);
    }
    if let Some(note) = &item.note {
        println!("  Note:       {}", note);
    }
    if let Some(reference) = &item.disclosure_ref {
        println!("  Disclosure: {}", reference);
    }
}

/// Execute a review command
pub async fn execute(command: ReviewCommands, ctx: &Context) -> CliResult<()> {
    match command {
        ReviewCommands::List {
            status,
            severity,
            page,
        } => {
            let mut dash = ctx.dashboard();
            dash.configure_view(
                ListKind::ReviewQueue,
                &[
                    (FILTER_STATUS, Some(status.as_str())),
                    (FILTER_SEVERITY, severity.as_ref().map(Severity::as_str)),
                ],
                page,
            )?;
            settle(&mut dash).await?;

            let queue = dash.review_queue();
            let rows: Vec<FindingRow> = queue.items().iter().map(FindingRow::from).collect();
            output::print_output(rows, ctx.format)?;

            if let (OutputFormat::Table, Some(result)) = (ctx.format, queue.rendered()) {
                output::print_page_summary(
                    result.query.page,
                    result.total_pages(),
                    result.total,
                    &dash.page_links(ListKind::ReviewQueue),
                );
            }
            Ok(())
        }

        ReviewCommands::Show { id } => {
            let mut dash = ctx.dashboard();
            dash.load_review_item(id);
            settle(&mut dash).await?;

            let item = dash
                .workflow()
                .item(id)
                .ok_or_else(|| CliError::Rejected(format!("finding {} not found", id)))?;
            match ctx.format {
                OutputFormat::Table => print_finding(item),
                format => output::print_single(item, format)?,
            }
            Ok(())
        }

        ReviewCommands::Approve { id, note } => {
            let mut dash = ctx.dashboard();
            dash.submit_review(id, ReviewAction::Approve, ctx.reviewer(), note.as_deref())?;
            settle(&mut dash).await
        }

        ReviewCommands::Reject { id, note } => {
            let mut dash = ctx.dashboard();
            dash.submit_review(id, ReviewAction::Reject, ctx.reviewer(), note.as_deref())?;
            settle(&mut dash).await
        }

        ReviewCommands::Disclose { id } => {
            let mut dash = ctx.dashboard();
            dash.load_review_item(id);
            settle(&mut dash).await?;

            let confirmation = dash.request_disclosure(id)?;
            if let Some(item) = dash.workflow().item(id) {
                print_finding(item);
            }
            print_info("Creating a disclosure publishes this finding to the repository owner.");

            let confirm = dialoguer::Confirm::new()
                .with_prompt(format!("Create public disclosure for finding {}?", id))
                .default(false)
                .interact()
                .unwrap_or(false);

            if !confirm {
                dash.cancel_disclosure(id);
                print_error("Aborted");
                return Ok(());
            }

            dash.confirm_disclosure(&confirmation)?;
            settle(&mut dash).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_row() {
        let mut item = ReviewItem::new(ReviewItemId::new(4), Severity::Critical, ReviewStatus::Approved);
        item.reviewer = Some("alice".to_string());
        item.repo_name = "octo/demo".to_string();
        let row = FindingRow::from(&item);
        assert_eq!(row.id, "#4");
        assert_eq!(row.severity, "critical");
        assert_eq!(row.status, "approved");
        assert_eq!(row.reviewer, "alice");
        assert_eq!(row.found, "-");
    }
}
