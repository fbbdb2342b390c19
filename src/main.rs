//! ISEE entitlement lookup CLI.
//!
//! Run with: `isee-client CZ10130050,519841-425,ES`
//!
//! Registers a client on first use and stores the credentials in
//! `~/.hpiseeauth` (see `--authfile`).

use anyhow::{Context, Result};
use clap::Parser;
use isee_client::query::parse_batch;
use isee_client::{ClientConfig, CredentialStore, IseeClient, Session};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Look up HP warranty/entitlement information via ISEE.
///
/// Results are printed to stdout as XML; progress and errors go to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON credential file (default: ~/.hpiseeauth)
    #[arg(short, long)]
    authfile: Option<PathBuf>,

    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service base URL
    #[arg(long)]
    host: Option<String>,

    /// Directory to read request templates from instead of the bundled ones
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Entitlement to look up, format: serial,product[,country]
    #[arg(value_name = "ENT", required = true)]
    entitlements: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&content).context("Failed to parse config file")?
        }
        None => ClientConfig::default(),
    };
    if let Some(authfile) = args.authfile {
        config.auth.file = Some(authfile);
    }
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(dir) = args.templates {
        config.templates.dir = Some(dir);
    }

    let queries = parse_batch(&args.entitlements);
    if queries.is_empty() {
        anyhow::bail!("No valid entitlement given, expected serial,product[,country]");
    }

    let store = CredentialStore::new(config.auth.file_path());
    let mut session = Session::open(store).context("Failed to load credentials")?;
    let client = IseeClient::from_config(&config).context("Failed to create client")?;

    client
        .ensure_registered(&mut session)
        .context("Registration failed")?;
    let documents = client
        .lookup(&queries, &mut session)
        .context("Entitlement lookup failed")?;

    for document in documents {
        println!("{}", document.to_pretty_xml()?);
    }
    info!("Done");
    Ok(())
}
