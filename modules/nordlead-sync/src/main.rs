use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nordlead_common::Config;
use nordlead_store::{PgEntityStore, PgJobStore};
use nordlead_sync::logo::LogoFinder;
use nordlead_sync::summary::Summarizer;
use nordlead_sync::sync::{SyncOptions, SyncOrchestrator, SyncReport};
use registry_client::{RegistryClient, RegistrySpec, RetryPolicy};

#[derive(Parser)]
#[command(name = "sync", about = "Registry ingestion runs")]
struct Cli {
    /// Registry country code (NO, SE, DK, FI).
    #[arg(long, default_value = "NO")]
    country: String,

    /// Generate AI summaries for strong leads during ingestion.
    #[arg(long)]
    summaries: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full sync of the main register.
    Full,
    /// Change-feed sync since the last completed incremental run.
    Incremental,
    /// Load decision-maker roles for entities missing them.
    Roles,
    /// Sync branch records under locally known parents.
    Subentities,
    /// Full, then sub-entities, then roles.
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nordlead=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    info!(country = cli.country.as_str(), "Nordlead sync starting");

    let pool = nordlead_store::connect(&config.database_url).await?;
    nordlead_store::migrate(&pool).await?;

    let spec = registry_spec(&cli.country, &config)?;
    let policy = RetryPolicy::new(
        config.registry_retries,
        Duration::from_millis(config.registry_retry_base_ms),
    );
    let registry = Arc::new(
        RegistryClient::new(spec, config.registry_user_agent.clone()).with_policy(policy),
    );

    let entities = Arc::new(PgEntityStore::new(pool.clone()));
    let jobs = Arc::new(PgJobStore::new(pool));

    let mut options = SyncOptions::from_config(&config);
    options.generate_summaries = cli.summaries;

    let mut orchestrator =
        SyncOrchestrator::new(registry, entities, jobs, options).with_logo_finder(LogoFinder::new());
    if let Some(summarizer) = Summarizer::from_config(&config) {
        orchestrator = orchestrator.with_summarizer(summarizer);
    }

    match cli.command {
        Command::Full => print_report(orchestrator.run_full().await?),
        Command::Incremental => print_report(orchestrator.run_incremental().await?),
        Command::Roles => print_report(orchestrator.run_roles().await?),
        Command::Subentities => print_report(orchestrator.run_sub_entities().await?),
        Command::All => {
            print_report(orchestrator.run_full().await?);
            print_report(orchestrator.run_sub_entities().await?);
            print_report(orchestrator.run_roles().await?);
        }
    }

    Ok(())
}

fn registry_spec(country: &str, config: &Config) -> Result<RegistrySpec> {
    let spec = match country.to_uppercase().as_str() {
        "NO" => RegistrySpec::norway(&config.registry_base_url),
        "SE" => RegistrySpec::sweden("https://api.bolagsverket.se"),
        "DK" => RegistrySpec::denmark("https://cvrapi.dk"),
        "FI" => RegistrySpec::finland("https://avoindata.prh.fi/bis/v1"),
        other => anyhow::bail!("Unknown registry country: {other}"),
    };
    Ok(spec)
}

fn print_report(report: SyncReport) {
    println!("Job {} ({})", report.job_id, report.job_type);
    println!("{}", report.stats);
}
