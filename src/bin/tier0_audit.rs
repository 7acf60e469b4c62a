//! Tier0 Audit Binary
//!
//! One-shot batch run against a PostgreSQL-backed privilege graph:
//! re-tags tier0 from a membership file, classifies every boundary crossing
//! and writes the dangerous ones to `badConnections<unix-time>.csv`.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (or `--database-url`)
//! - `DB_MAX_CONNECTIONS` and friends: pool tuning, see `PostgresConfig`
//! - `AUDIT_MAX_CONCURRENCY`, `AUDIT_ELIGIBILITY_ATTRIBUTE`,
//!   `AUDIT_BROAD_MATCH_THRESHOLD`: run tuning, see `AuditConfig`
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... cargo run --bin tier0_audit --features cli -- \
//!     --membership-file ./tier0.txt --policy-file ./config.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use tier0_audit::store::postgres::PostgresConfig;
use tier0_audit::{AuditConfig, AuditRun, MembershipList, PolicyMatrix, PostgresGraphStore, ReportFormat};

/// Seconds allowed for the initial database connection.
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find edges crossing the tier0 boundary of a privilege graph",
    long_about = None
)]
struct Cli {
    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// File with one tier0 pattern per line.
    #[arg(long, default_value = "./tier0.txt")]
    membership_file: PathBuf,

    /// Policy matrix document.
    #[arg(long, default_value = "./config.json")]
    policy_file: PathBuf,

    /// Directory the report is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Maximum concurrent workers (overrides AUDIT_MAX_CONCURRENCY).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Node attribute required for discovery (overrides AUDIT_ELIGIBILITY_ATTRIBUTE).
    #[arg(long)]
    eligibility_attribute: Option<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Create the graph tables before running.
    #[arg(long)]
    init_schema: bool,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tier0_audit=info,sqlx=warn".into());

    if log_format == "pretty" {
        // Pretty format for local development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tier0 audit");

    // Everything that can fail fatally happens before the graph is touched.
    let policy = PolicyMatrix::from_path(&cli.policy_file).map_err(|e| {
        error!(error = %e, "Failed to load policy");
        e
    })?;
    let membership = MembershipList::from_path(&cli.membership_file).map_err(|e| {
        error!(error = %e, "Failed to load membership list");
        e
    })?;
    if !cli.output_dir.is_dir() {
        error!(output_dir = %cli.output_dir.display(), "Output directory does not exist");
        return Err(format!("output directory {} does not exist", cli.output_dir.display()).into());
    }
    if membership.is_empty() {
        warn!("Membership list has no usable patterns; nothing will be tagged tier0");
    }

    let mut config = AuditConfig::from_env();
    if let Some(workers) = cli.concurrency {
        config = config.with_max_concurrency(workers);
    }
    if let Some(attribute) = cli.eligibility_attribute {
        config = config.with_eligibility_attribute(attribute);
    }

    let mut pg_config = PostgresConfig::from_env().with_worker_capacity(config.max_concurrency);
    if let Some(url) = cli.database_url {
        pg_config = pg_config.with_database_url(url);
    }

    info!("Connecting to PostgreSQL...");
    let connect_start = Instant::now();
    let store = match tokio::time::timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        PostgresGraphStore::new(pg_config),
    ).await {
        Ok(Ok(store)) => store,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to connect to PostgreSQL");
            return Err(e.into());
        }
        Err(_) => {
            error!("PostgreSQL connection timeout after {}s", CONNECT_TIMEOUT_SECS);
            return Err("Database connection timeout".into());
        }
    };
    info!(
        latency_ms = connect_start.elapsed().as_millis() as u64,
        "PostgreSQL connection established"
    );

    if !store.is_healthy().await {
        error!("PostgreSQL health check failed");
        return Err("Database health check failed".into());
    }

    if cli.init_schema {
        store.ensure_schema().await?;
        info!("Graph schema ensured");
    }

    let run = AuditRun::new(Arc::new(store), policy, config);
    let outcome = run.execute(&membership).await?;

    let timestamp = chrono::Utc::now().timestamp();
    let path = outcome
        .report
        .write_to_dir(&cli.output_dir, timestamp, cli.format.into())?;
    info!(path = %path.display(), "Report written");

    println!("Bad connections: {}", outcome.dangerous_crossings());
    if !outcome.is_complete() {
        println!(
            "Incomplete: {} item(s) failed (patterns: {}, crossings rejected: {}, classification: {})",
            outcome.failed_items(),
            outcome.tagging.failures.len(),
            outcome.rejected_crossings.len(),
            outcome.classification.failures.len(),
        );
    }

    Ok(())
}
