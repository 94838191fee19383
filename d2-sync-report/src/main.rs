use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use d2_sync_log::{Checkpoint, CheckpointStore, FileCheckpointStore, LogFileSet, LogParser};
use d2_sync_suggest::{D2Api, MappingFile, MappingSet, RunConstants, SuggestionEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod since;

use config::{CliArgs, Config, RunConfig};

/// Mappings shipped with the binary, used when no file is configured.
const BUNDLED_MAPPINGS: &str = include_str!("../suggestions.json");

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_mappings(config: &Config) -> Result<MappingSet> {
    match &config.suggestions.path {
        Some(path) => MappingSet::from_file(path)
            .with_context(|| format!("Loading error mappings from {}", path.display())),
        None => {
            let file: MappingFile =
                serde_json::from_str(BUNDLED_MAPPINGS).context("Parsing bundled error mappings")?;
            MappingSet::new(&file.mappings).context("Compiling bundled error mappings")
        }
    }
}

async fn run(config: Config, since: Option<chrono::NaiveDateTime>) -> Result<()> {
    let store = config
        .checkpoint
        .enabled
        .then(|| FileCheckpointStore::new(&config.checkpoint.path));

    let since = match since {
        Some(since) => Some(since),
        None => store
            .as_ref()
            .and_then(|store| store.load())
            .map(|checkpoint| checkpoint.last_processed),
    };

    let files = LogFileSet::new(&config.logs.folder).with_live_name(&config.logs.live_file);
    let report = tokio::task::spawn_blocking(move || LogParser::new(files).parse(since))
        .await
        .context("Log parser task failed")?
        .with_context(|| format!("Parsing logs in {}", config.logs.folder.display()))?;

    let mappings = load_mappings(&config)?;
    let api = D2Api::new(&config.instance.url, config.auth()?)
        .context("Creating DHIS2 client")?;

    let constants = RunConstants {
        docker_container: config.suggestions.docker_container.clone(),
        resources_folder: config.suggestions.resources_folder.clone(),
        ..RunConstants::new(api.base_url())
    };

    let engine = SuggestionEngine::new(api, mappings, constants);
    let jobs = engine.attach(report.jobs).await;

    if jobs.is_empty() {
        info!("No sync jobs found");
    } else {
        println!("{}", render::render_jobs(&jobs));
    }

    let failed = jobs.iter().filter(|job| !job.success).count();
    info!(jobs = jobs.len(), failed, "Sync report done");

    if let Some(store) = store {
        let checkpoint = Checkpoint {
            last_processed: report.last_processed,
            last_sync: Local::now().naive_local(),
        };
        store
            .save(&checkpoint)
            .with_context(|| format!("Saving checkpoint to {}", store.path().display()))?;
    } else {
        warn!("Checkpoint disabled, next run will parse the same logs again");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let RunConfig { config, since } = RunConfig::from_args(args)?;

    init_tracing(&config.log_level);
    info!(url = %config.instance.url, logs = %config.logs.folder.display(), "d2-sync-report starting");

    run(config, since).await
}
