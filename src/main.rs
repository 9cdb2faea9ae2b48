//! Main application entry point (CLI binary).
//!
//! Thin wrapper around the `geo_gate` library: parses arguments, loads the
//! policy file and `.env`, initializes the logger and audit database, runs
//! one decision for the given IP, and prints the outcome. Exits nonzero
//! when the request is blocked so scripts can branch on the result.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use geo_gate::audit::{init_db_pool_with_path, run_migrations};
use geo_gate::initialization::{init_client, init_logger_with};
use geo_gate::{
    load_policy_file, AuditSink, ClientRequest, GeoGate, GeoResolver, HttpGeoProvider,
    InMemoryGeoCache, LogFormat, LogLevel, PolicyConfig, SqliteAuditStore,
};

#[derive(Parser, Debug)]
#[command(name = "geo_gate", version, about = "Geolocation-based access decisions")]
struct Cli {
    /// Client IP to evaluate.
    ip: IpAddr,

    /// Policy file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Form id recorded in the audit log.
    #[arg(long)]
    form_id: Option<String>,

    /// Evaluate as a submission (counts against the rate limit) instead of
    /// a form load.
    #[arg(long)]
    submission: bool,

    /// Audit database path.
    #[arg(long, default_value = geo_gate::config::DB_PATH)]
    db_path: PathBuf,

    /// Logging verbosity.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log output format.
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Allows setting GEO_GATE_API_KEY in .env without exporting it manually.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = match &cli.config {
        Some(path) => load_policy_file(path)
            .with_context(|| format!("Failed to load policy file {}", path.display()))?,
        None => PolicyConfig::default(),
    };

    let sink: Option<Arc<dyn AuditSink>> = if config.log_enabled {
        let pool = init_db_pool_with_path(&cli.db_path)
            .await
            .context("Failed to open audit database")?;
        run_migrations(&pool)
            .await
            .context("Failed to run audit database migrations")?;
        Some(Arc::new(SqliteAuditStore::new(pool)))
    } else {
        None
    };

    let client = init_client().context("Failed to build HTTP client")?;
    let provider = HttpGeoProvider::new(client, &config.api_base_url, &config.api_key);
    let resolver = GeoResolver::new(Arc::new(InMemoryGeoCache::new()), Arc::new(provider));
    let gate = GeoGate::new(config, resolver, sink);

    let request = ClientRequest::from_addr(cli.ip);
    let outcome = if cli.submission {
        gate.check_submission(&request, cli.form_id.as_deref()).await
    } else {
        gate.check_form_load(&request, cli.form_id.as_deref()).await
    };

    let location = outcome
        .geo
        .as_ref()
        .map(|g| {
            let mut parts = vec![g.country_code.clone()];
            if let Some(region) = &g.region_code {
                parts.push(region.clone());
            }
            if let Some(zip) = &g.zip {
                parts.push(zip.clone());
            }
            parts.join("/")
        })
        .unwrap_or_else(|| "unknown location".to_string());

    // The audit write runs on a spawned task; give it time to land before
    // the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    if outcome.is_allowed() {
        println!("{} allowed ({}) - {}", outcome.ip, outcome.decision.reason, location);
        Ok(())
    } else {
        println!("{} blocked ({}) - {}", outcome.ip, outcome.decision.reason, location);
        process::exit(1);
    }
}
