//! Credential commands

use clap::Subcommand;
use keywatch_types::{Credential, CredentialId, CredentialKind, ListKind, FILTER_REPO, FILTER_SOURCE};
use serde::Serialize;
use tabled::Tabled;

use super::{settle, Context};
use crate::error::CliResult;
use crate::output::{
    self, format_time, mask_key, print_error, shorten_path, shorten_repo, OutputFormat,
};

/// Credential subcommands
#[derive(Subcommand)]
pub enum KeyCommands {
    /// List discovered credentials
    List {
        /// Credential list (valid, rate-limited)
        #[arg(short, long, default_value = "valid")]
        kind: CredentialKind,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Only keys from repositories matching this name
        #[arg(long)]
        repo: Option<String>,

        /// Only keys from this discovery source
        #[arg(long)]
        source: Option<String>,
    },

    /// Delete a stored credential
    Delete {
        /// Credential ID
        id: CredentialId,

        /// Credential list the key belongs to
        #[arg(short, long, default_value = "valid")]
        kind: CredentialKind,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Table row for credential display
#[derive(Debug, Serialize, Tabled)]
struct KeyRow {
    id: i64,
    /// Masked key material
    key: String,
    provider: String,
    repo: String,
    file: String,
    /// Tier of a valid key, rate-limit reason otherwise
    #[tabled(rename = "tier/reason")]
    detail: String,
    validated: String,
}

impl From<&Credential> for KeyRow {
    fn from(c: &Credential) -> Self {
        let detail = c
            .reason
            .clone()
            .or_else(|| c.tier.clone())
            .unwrap_or_else(|| "-".to_string());
        Self {
            id: c.id.get(),
            key: mask_key(&c.key),
            provider: c.provider.clone().unwrap_or_else(|| "-".to_string()),
            repo: shorten_repo(&c.repo_name),
            file: shorten_path(&c.file_path),
            detail,
            validated: format_time(c.validated_at.as_ref()),
        }
    }
}

/// Execute a credential command
pub async fn execute(command: KeyCommands, ctx: &Context) -> CliResult<()> {
    match command {
        KeyCommands::List {
            kind,
            page,
            repo,
            source,
        } => {
            let view = ListKind::from(kind);
            let mut dash = ctx.dashboard();

            let filters: Vec<_> = [(FILTER_REPO, repo.as_deref()), (FILTER_SOURCE, source.as_deref())]
                .into_iter()
                .filter(|(_, value)| value.is_some())
                .collect();
            dash.configure_view(view, &filters, page)?;
            settle(&mut dash).await?;

            let controller = dash.credentials(kind);
            let rows: Vec<KeyRow> = controller.items().iter().map(KeyRow::from).collect();
            output::print_output(rows, ctx.format)?;

            if let (OutputFormat::Table, Some(result)) = (ctx.format, controller.rendered()) {
                output::print_page_summary(
                    result.query.page,
                    result.total_pages(),
                    result.total,
                    &dash.page_links(view),
                );
            }
            Ok(())
        }

        KeyCommands::Delete { id, kind, yes } => {
            if !yes {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete {} key {}? This cannot be undone.", kind, id))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirm {
                    print_error("Aborted");
                    return Ok(());
                }
            }

            let mut dash = ctx.dashboard();
            dash.delete_item(ListKind::from(kind), id)?;
            settle(&mut dash).await
        }
    }
}
