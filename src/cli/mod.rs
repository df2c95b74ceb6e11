//! Command-line interface for blokaudit.
//!
//! Provides commands for finding oversized assets, finding unused
//! components, and showing the resolved configuration.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::audit::{self, classify, AuditOptions, KindFilter};
use crate::client::{DeliveryClient, ManagementClient};
use crate::config;
use crate::domain::asset::AssetKind;
use crate::domain::story::ContentVersion;
use crate::report::{AssetReport, ComponentReport};

/// blokaudit - Storyblok space audit tool
#[derive(Parser, Debug)]
#[command(name = "blokaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find oversized assets referenced by stories
    Assets {
        /// Primary space id (falls back to the config file)
        #[arg(short, long)]
        space: Option<u64>,

        /// Delivery API token
        #[arg(long, env = "BLOKAUDIT_DELIVERY_TOKEN", hide_env_values = true)]
        delivery_token: Option<String>,

        /// Management API personal access token
        #[arg(long, env = "BLOKAUDIT_MANAGEMENT_TOKEN", hide_env_values = true)]
        management_token: Option<String>,

        /// Content version to scan (published if not configured)
        #[arg(short, long, value_enum)]
        version: Option<VersionArg>,

        /// Oversize threshold in KiB
        #[arg(short, long)]
        threshold_kb: Option<u64>,

        /// Asset kinds to include (comma-separated)
        #[arg(short, long, value_enum, value_delimiter = ',')]
        kinds: Vec<KindArg>,

        /// Oversize rows to print
        #[arg(long, default_value = "20")]
        top: usize,

        /// Write the full report as JSON to this path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Find components no story uses
    Components {
        /// Primary space id (falls back to the config file)
        #[arg(short, long)]
        space: Option<u64>,

        /// Delivery API token
        #[arg(long, env = "BLOKAUDIT_DELIVERY_TOKEN", hide_env_values = true)]
        delivery_token: Option<String>,

        /// Management API personal access token
        #[arg(long, env = "BLOKAUDIT_MANAGEMENT_TOKEN", hide_env_values = true)]
        management_token: Option<String>,

        /// Content version to scan (draft if not configured, so usage in
        /// unpublished stories counts)
        #[arg(short, long, value_enum)]
        version: Option<VersionArg>,

        /// Delete the unused components after confirmation
        #[arg(long)]
        delete: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Write the full report as JSON to this path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Content version for CLI (maps to ContentVersion)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VersionArg {
    /// Published content only
    Published,

    /// Draft content, unpublished changes included
    Draft,
}

impl From<VersionArg> for ContentVersion {
    fn from(v: VersionArg) -> Self {
        match v {
            VersionArg::Published => ContentVersion::Published,
            VersionArg::Draft => ContentVersion::Draft,
        }
    }
}

/// Asset kind for CLI (maps to AssetKind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Image,
    Video,
    Doc,
    Unknown,

    /// Disable kind filtering
    All,
}

fn kind_filter_from_args(kinds: &[KindArg]) -> KindFilter {
    if kinds.is_empty() || kinds.contains(&KindArg::All) {
        return KindFilter::all();
    }

    let kinds: Vec<AssetKind> = kinds
        .iter()
        .filter_map(|kind| match kind {
            KindArg::Image => Some(AssetKind::Image),
            KindArg::Video => Some(AssetKind::Video),
            KindArg::Doc => Some(AssetKind::Doc),
            KindArg::Unknown => Some(AssetKind::Unknown),
            KindArg::All => None,
        })
        .collect();
    KindFilter::from_kinds(&kinds)
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Assets {
                space,
                delivery_token,
                management_token,
                version,
                threshold_kb,
                kinds,
                top,
                out,
            } => {
                audit_assets(
                    space,
                    delivery_token,
                    management_token,
                    version,
                    threshold_kb,
                    kinds,
                    top,
                    out,
                )
                .await
            }
            Commands::Components {
                space,
                delivery_token,
                management_token,
                version,
                delete,
                yes,
                out,
            } => {
                audit_components(
                    space,
                    delivery_token,
                    management_token,
                    version,
                    delete,
                    yes,
                    out,
                )
                .await
            }
            Commands::Config => show_config().await,
        }
    }
}

/// API clients plus the resolved primary space.
struct Connection {
    space_id: u64,
    delivery: DeliveryClient,
    management: ManagementClient,
}

/// Merge flags with the config file and build the API clients.
fn connect(
    space: Option<u64>,
    delivery_token: Option<String>,
    management_token: Option<String>,
) -> Result<Connection> {
    let config = config::config()?;

    let space_id = space
        .or(config.space_id)
        .context("No space id. Pass --space or set space_id in .blokaudit/config.yaml")?;
    let delivery_token = delivery_token
        .or_else(|| config.delivery_token.clone())
        .context("No delivery token. Pass --delivery-token or set BLOKAUDIT_DELIVERY_TOKEN")?;
    let management_token = management_token
        .or_else(|| config.management_token.clone())
        .context("No management token. Pass --management-token or set BLOKAUDIT_MANAGEMENT_TOKEN")?;

    let delivery = match &config.delivery_base_url {
        Some(base) => DeliveryClient::with_base_url(base, delivery_token),
        None => DeliveryClient::new(delivery_token),
    };
    let management = match &config.management_base_url {
        Some(base) => ManagementClient::with_base_url(base, management_token),
        None => ManagementClient::new(management_token),
    };

    Ok(Connection {
        space_id,
        delivery,
        management,
    })
}

/// Run the oversized-asset audit
#[allow(clippy::too_many_arguments)]
async fn audit_assets(
    space: Option<u64>,
    delivery_token: Option<String>,
    management_token: Option<String>,
    version: Option<VersionArg>,
    threshold_kb: Option<u64>,
    kinds: Vec<KindArg>,
    top: usize,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = config::config()?;
    let connection = connect(space, delivery_token, management_token)?;

    let version = version
        .map(ContentVersion::from)
        .or(config.version)
        .unwrap_or(ContentVersion::Published);
    let threshold_kb = threshold_kb
        .or(config.threshold_kb)
        .unwrap_or(config::DEFAULT_THRESHOLD_KB);
    let filter = if kinds.is_empty() && !config.kinds.is_empty() {
        classify::parse_kind_filter(&config.kinds)?
    } else {
        kind_filter_from_args(&kinds)
    };

    let options = AuditOptions {
        space_id: connection.space_id,
        version,
        threshold_bytes: config::threshold_bytes(threshold_kb),
        filter,
    };

    let outcome =
        audit::run_asset_audit(&connection.delivery, &connection.management, &options).await?;
    let report = AssetReport::from_audit(&outcome, &options);

    report.print(top);

    if let Some(path) = out {
        report.save(&path).await?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

/// Run the unused-component audit, optionally deleting what it finds
async fn audit_components(
    space: Option<u64>,
    delivery_token: Option<String>,
    management_token: Option<String>,
    version: Option<VersionArg>,
    delete: bool,
    yes: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = config::config()?;
    let connection = connect(space, delivery_token, management_token)?;

    let version = version
        .map(ContentVersion::from)
        .or(config.version)
        .unwrap_or(ContentVersion::Draft);

    let outcome = audit::run_component_audit(
        &connection.delivery,
        &connection.management,
        connection.space_id,
        version,
    )
    .await?;
    let report = ComponentReport::from_audit(&outcome, connection.space_id, version);

    report.print();

    if let Some(path) = out.as_ref() {
        report.save(path).await?;
        println!("\nReport written to {}", path.display());
    }

    if delete && !outcome.unused.is_empty() {
        let prompt = format!(
            "Delete {} unused component(s) from space {}?",
            outcome.unused.len(),
            connection.space_id
        );
        if !yes && !confirm(&prompt)? {
            println!("Aborted; nothing deleted");
            return Ok(());
        }

        for component in &outcome.unused {
            connection
                .management
                .delete_component(connection.space_id, component.id)
                .await?;
            println!("Deleted {} (id {})", component.name, component.id);
        }
        println!("\nDeleted {} component(s)", outcome.unused.len());
    }

    Ok(())
}

/// Show the resolved configuration
async fn show_config() -> Result<()> {
    let config = config::config()?;

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none found)"),
    }
    println!(
        "Space id: {}",
        config
            .space_id
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!(
        "Delivery token: {}",
        masked(config.delivery_token.as_deref())
    );
    println!(
        "Management token: {}",
        masked(config.management_token.as_deref())
    );
    println!(
        "Threshold: {} KiB",
        config.threshold_kb.unwrap_or(config::DEFAULT_THRESHOLD_KB)
    );
    let kinds = if config.kinds.is_empty() {
        "all".to_string()
    } else {
        config.kinds.join(", ")
    };
    println!("Kinds: {}", kinds);
    println!(
        "Version: {}",
        config
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(per-command default)".to_string())
    );
    if let Some(base) = &config.delivery_base_url {
        println!("Delivery base URL: {}", base);
    }
    if let Some(base) = &config.management_base_url {
        println!("Management base URL: {}", base);
    }

    Ok(())
}

/// Mask a token, keeping just enough to recognize it
fn masked(token: Option<&str>) -> String {
    match token {
        Some(token) if token.chars().count() > 4 => {
            let head: String = token.chars().take(4).collect();
            format!("{}... ({} chars)", head, token.chars().count())
        }
        Some(_) => "(set)".to_string(),
        None => "(not set)".to_string(),
    }
}

/// Ask a yes/no question on stdout/stdin
fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
