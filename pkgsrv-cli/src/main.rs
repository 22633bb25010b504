//! pkgsrv - prm package server
//!
//! Serves the package catalog over HTTP and offers a few commands to
//! inspect it from the shell.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pkgsrv_core::{CatalogService, ServiceConfig};

mod server;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "pkgsrv",
    about = "Query prm package and module specifications",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Configuration file (defaults to $PKGSRV_CONFIG or $PRMPCKGSRV_CONFIG, then ./config.yaml)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Set log level (defaults to debug when app.debug is set, info otherwise)
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the Web API
    Serve {
        /// Address to listen on (defaults to 0.0.0.0:<server.port>)
        #[clap(long)]
        bind: Option<SocketAddr>,
    },

    /// Load the index and every package document, reporting the first error
    Validate,

    /// List the available packages
    Packages {
        /// Output the listing as JSON
        #[clap(long)]
        json: bool,
    },

    /// Show the modules matching a query expression (e.g. mypackage.tools)
    Query {
        /// Package name followed by an optional module path
        expression: String,
    },
}

fn initialize_tracing(level: &str, json: bool) {
    // RUST_LOG wins over the CLI level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = match &cli.log_level {
        Some(level) => level.to_filter_directive(),
        None if config.debug => "debug",
        None => "info",
    };
    initialize_tracing(level, cli.log_json);
    debug!("Configuration: {:?}", config);

    let service = CatalogService::new(&config).with_context(|| {
        format!(
            "Failed to load package index {}",
            config.package_index.display()
        )
    })?;

    match cli.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], config.port)));
            server::serve(Arc::new(service), &config.app_path, addr).await
        }
        Command::Validate => validate_command(&service),
        Command::Packages { json } => packages_command(&service, json),
        Command::Query { expression } => query_command(&service, &expression),
    }
}

fn validate_command(service: &CatalogService) -> Result<()> {
    let summary = service.validate().context("Package catalog is invalid")?;
    info!("Validated {}", service.index_file().display());
    println!("{} packages, {} modules", summary.packages, summary.modules);
    Ok(())
}

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn packages_command(service: &CatalogService, json_output: bool) -> Result<()> {
    let listing = service.list_packages()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.packages.is_empty() {
        println!("No packages available.");
        return Ok(());
    }

    let rows: Vec<PackageRow> = listing
        .packages
        .into_iter()
        .map(|package| PackageRow {
            name: package.name,
            version: package.version,
            timestamp: package.timestamp,
            description: package.description.unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
    Ok(())
}

fn query_command(service: &CatalogService, expression: &str) -> Result<()> {
    match service.resolve_modules(expression)? {
        Some(listing) => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
        None => bail!("unknown package or module '{}'", expression),
    }
}
