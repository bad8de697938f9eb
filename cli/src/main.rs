mod adapters;
mod inventory_file;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use actix_web::{App, HttpServer};
use clap::{Parser, Subcommand};
use fleetguard_common::config::{Database, Orchestrator as OrchestratorConfig, Predictor as PredictorConfig};
use fleetguard_common::tracing_init::init_tracing;
use fleetguard_entity::Platform;
use fleetguard_module_orchestrator::VerificationOrchestrator;
use fleetguard_module_predictor::LabelPredictor;
use fleetguard_module_predictor::example_index::ExampleIndex;
use fleetguard_module_predictor::taxonomy::Taxonomy;
use fleetguard_module_scan::ScanEngine;
use fleetguard_module_scan::model::ScanRequest;
use fleetguard_module_store::VulnStore;
use fleetguard_server::AppState;
use uuid::Uuid;

use adapters::{HttpCollector, HttpEmbedder, HttpLlmBackend};
use inventory_file::FileInventorySource;

#[derive(Parser, Debug)]
#[command(name = "fleetguardd", about = "Network-device vulnerability assessment engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(Serve),
    /// Open the store, applying any pending schema migrations.
    Migrate {
        #[command(flatten)]
        database: Database,
    },
    /// Apply an offline vulnerability update package.
    ApplyUpdate(ApplyUpdate),
    /// Seed device inventory from a flat JSON file of device stubs.
    SyncInventory(SyncInventory),
    /// Apply an air-gapped device snapshot in place of live discovery.
    ApplySnapshot(ApplySnapshot),
    /// Discover a device live over its REST management API.
    Discover(Discover),
    /// Run a single ad hoc scan against a platform/version/feature set.
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug)]
struct Serve {
    #[command(flatten)]
    database: Database,
    #[command(flatten)]
    predictor: PredictorConfig,
    #[command(flatten)]
    orchestrator: OrchestratorConfig,

    #[arg(long, env = "FLEETGUARD_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Platform-keyed label taxonomy JSON. Omit to serve with an empty
    /// taxonomy (Tier 3 prompts carry no label descriptions).
    #[arg(long, env = "FLEETGUARD_TAXONOMY_PATH")]
    taxonomy_path: Option<PathBuf>,

    /// Pre-built nearest-example index JSON. Omit to start Tier 2 cold
    /// (every prediction falls through to Tier 3).
    #[arg(long, env = "FLEETGUARD_EXAMPLE_INDEX_PATH")]
    example_index_path: Option<PathBuf>,

    #[arg(long, env = "FLEETGUARD_EMBEDDER_URL", default_value = "http://127.0.0.1:9001/embed")]
    embedder_url: String,

    #[arg(long, env = "FLEETGUARD_LLM_URL", default_value = "http://127.0.0.1:9002/infer")]
    llm_url: String,
}

#[derive(clap::Args, Debug)]
struct ApplyUpdate {
    #[command(flatten)]
    database: Database,

    /// Path to the label taxonomy JSON the package's labels are validated
    /// against.
    #[arg(long, env = "FLEETGUARD_TAXONOMY_PATH")]
    taxonomy_path: PathBuf,

    /// The update package (a zip containing manifest.json and the data
    /// file it names).
    package: PathBuf,

    /// Apply the package even if its data file's sha256 doesn't match the
    /// manifest. Never do this for a package received over an untrusted
    /// channel.
    #[arg(long)]
    skip_hash_check: bool,
}

#[derive(clap::Args, Debug)]
struct SyncInventory {
    #[command(flatten)]
    database: Database,

    /// JSON array of device stubs (hostname/ip/location/device_type).
    inventory_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct ApplySnapshot {
    #[command(flatten)]
    database: Database,
    #[command(flatten)]
    orchestrator: OrchestratorConfig,

    device_id: Uuid,

    /// Air-gapped DeviceSnapshot JSON document.
    snapshot_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct Discover {
    #[command(flatten)]
    database: Database,
    #[command(flatten)]
    orchestrator: OrchestratorConfig,

    device_id: Uuid,

    /// Base URL of the device's REST management API.
    host: String,

    /// Bearer token handed to the collector verbatim.
    #[arg(long, env = "FLEETGUARD_DEVICE_TOKEN")]
    token: String,
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    database: Database,

    #[arg(long, value_parser = parse_platform)]
    platform: Platform,
    #[arg(long)]
    version: String,
    #[arg(long)]
    hardware_model: Option<String>,
    #[arg(long)]
    feature: Vec<String>,
    #[arg(long)]
    severity: Vec<i16>,
}

/// `Platform` is a `sea_orm` active enum with a kebab-case serde rename, not
/// a `clap::ValueEnum` — entity types don't carry a CLI dependency. This
/// mirrors that same rename for the `--platform` flag.
fn parse_platform(raw: &str) -> Result<Platform, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown platform {raw:?} (expected one of: ios-xe, ios-xr, asa, ftd, nx-os)"))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("fleetguardd");

    let cli = Cli::parse();
    match cli.command.run().await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "fleetguardd exited with an error");
            ExitCode::FAILURE
        }
    }
}

impl Command {
    async fn run(self) -> anyhow::Result<ExitCode> {
        match self {
            Command::Serve(serve) => serve.run().await,
            Command::Migrate { database } => {
                fleetguard_module_store::db::connect(&database).await?;
                tracing::info!("database is up to date");
                Ok(ExitCode::SUCCESS)
            }
            Command::ApplyUpdate(args) => args.run().await,
            Command::SyncInventory(args) => args.run().await,
            Command::ApplySnapshot(args) => args.run().await,
            Command::Discover(args) => args.run().await,
            Command::Scan(args) => args.run().await,
        }
    }
}

impl Serve {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let scan_engine = ScanEngine::new(store.clone());

        let taxonomy = match &self.taxonomy_path {
            Some(path) => Taxonomy::load_json(path)?,
            None => Taxonomy::default(),
        };
        let example_index = match &self.example_index_path {
            Some(path) => ExampleIndex::load_json(path)?,
            None => ExampleIndex::new(Vec::new()),
        };

        let predictor = LabelPredictor::new(
            store.clone(),
            Arc::new(example_index),
            Arc::new(HttpEmbedder::new(self.embedder_url.clone())),
            Arc::new(HttpLlmBackend::new(self.llm_url.clone())),
            Arc::new(taxonomy),
            self.predictor,
        );

        let orchestrator = VerificationOrchestrator::new(store.clone(), self.orchestrator).with_predictor(predictor);

        let bind = self.bind;
        tracing::info!(%bind, "starting fleetguardd");

        HttpServer::new(move || {
            App::new().configure(fleetguard_server::configure(AppState {
                store: store.clone(),
                scan_engine: scan_engine.clone(),
                orchestrator: orchestrator.clone(),
            }))
        })
        .bind(bind)?
        .run()
        .await?;

        Ok(ExitCode::SUCCESS)
    }
}

impl ApplyUpdate {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let taxonomy = Taxonomy::load_json(&self.taxonomy_path)?;

        let report =
            fleetguard_module_ingestor::apply_update_package(&store, &taxonomy, &self.package, self.skip_hash_check)
                .await?;

        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            unchanged = report.unchanged,
            error_count = report.errors.len(),
            "applied update package"
        );
        for error in &report.errors {
            tracing::warn!(%error, "record rejected");
        }

        Ok(ExitCode::SUCCESS)
    }
}

impl SyncInventory {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let orchestrator = VerificationOrchestrator::new(store, OrchestratorConfig::default());

        let source = FileInventorySource::new(self.inventory_file);
        let report = orchestrator.sync_inventory(&source).await?;

        tracing::info!(
            inserted = report.inserted,
            already_present = report.already_present,
            error_count = report.errors.len(),
            "inventory synced"
        );
        Ok(ExitCode::SUCCESS)
    }
}

impl ApplySnapshot {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let orchestrator = VerificationOrchestrator::new(store, self.orchestrator);

        let json = tokio::fs::read(&self.snapshot_file).await?;
        fleetguard_module_ingestor::apply_snapshot_json(&orchestrator, self.device_id, &json).await?;

        tracing::info!(device_id = %self.device_id, "applied offline snapshot");
        Ok(ExitCode::SUCCESS)
    }
}

impl Discover {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let orchestrator = VerificationOrchestrator::new(store, self.orchestrator);

        let collector = HttpCollector::new();
        let credential = fleetguard_module_orchestrator::traits::TransportCredential(self.token);
        orchestrator
            .discover_device(self.device_id, &self.host, &collector, &credential)
            .await?;

        tracing::info!(device_id = %self.device_id, "discovered device");
        Ok(ExitCode::SUCCESS)
    }
}

impl ScanArgs {
    async fn run(self) -> anyhow::Result<ExitCode> {
        let db = fleetguard_module_store::db::connect(&self.database).await?;
        let store = VulnStore::new(db);
        let scan_engine = ScanEngine::new(store);

        let result = scan_engine
            .scan(ScanRequest {
                platform: self.platform,
                version: self.version,
                hardware_model: self.hardware_model,
                features: self.feature,
                severity_filter: if self.severity.is_empty() { None } else { Some(self.severity) },
                limit: None,
                offset: None,
            })
            .await?;

        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(ExitCode::SUCCESS)
    }
}
