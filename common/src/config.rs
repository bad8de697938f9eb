use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the embedded SQLite store (§4.2, §4.0 "Persistence
/// engine"). `busy_timeout` is the bound on write-lock contention before a
/// transaction is retried and, eventually, fails with `StoreBusy` (§7).
#[derive(clap::Args, Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[arg(long, env = "FLEETGUARD_DB_PATH", default_value = "fleetguard.db")]
    pub path: PathBuf,

    #[arg(long, env = "FLEETGUARD_DB_MAX_CONNECTIONS", default_value_t = 16)]
    pub max_connections: u32,

    #[arg(
        long,
        env = "FLEETGUARD_DB_BUSY_TIMEOUT",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub busy_timeout: Duration,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fleetguard.db"),
            max_connections: 16,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Database {
    /// A `sqlite::` connection URL suitable for `sea_orm::Database::connect`.
    pub fn to_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.display())
    }

    /// An in-memory database, used by tests and by `--in-memory` ad hoc runs.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == PathBuf::from(":memory:")
    }
}

/// Tuning knobs for `LabelPredictor` (§4.3) — the LLM deadline, cache-write
/// confidence floor, and Tier-2 similarity threshold.
#[derive(clap::Args, Debug, Clone, Serialize, Deserialize)]
pub struct Predictor {
    #[arg(
        long,
        env = "FLEETGUARD_LLM_DEADLINE",
        default_value = "4s",
        value_parser = humantime::parse_duration
    )]
    pub llm_deadline: Duration,

    #[arg(long, env = "FLEETGUARD_TIER2_SIMILARITY_THRESHOLD", default_value_t = 0.70)]
    pub tier2_similarity_threshold: f32,

    #[arg(long, env = "FLEETGUARD_CACHE_WRITE_CONFIDENCE_FLOOR", default_value_t = 0.75)]
    pub cache_write_confidence_floor: f32,

    #[arg(long, env = "FLEETGUARD_NEEDS_REVIEW_THRESHOLD", default_value_t = 0.70)]
    pub needs_review_threshold: f32,

    #[arg(long, env = "FLEETGUARD_TIER2_TOP_K", default_value_t = 5)]
    pub tier2_top_k: usize,
}

impl Default for Predictor {
    fn default() -> Self {
        Self {
            llm_deadline: Duration::from_secs(4),
            tier2_similarity_threshold: 0.70,
            cache_write_confidence_floor: 0.75,
            needs_review_threshold: 0.70,
            tier2_top_k: 5,
        }
    }
}

/// Tuning knobs for `VerificationOrchestrator` (§4.5, §5).
#[derive(clap::Args, Debug, Clone, Serialize, Deserialize)]
pub struct Orchestrator {
    #[arg(long, env = "FLEETGUARD_SCAN_WORKERS", default_value_t = 8)]
    pub scan_workers: usize,

    #[arg(
        long,
        env = "FLEETGUARD_COLLECTOR_DEADLINE",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub collector_deadline: Duration,

    #[arg(
        long,
        env = "FLEETGUARD_JOB_DEADLINE",
        default_value = "10m",
        value_parser = humantime::parse_duration
    )]
    pub job_deadline: Duration,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            scan_workers: 8,
            collector_deadline: Duration::from_secs(30),
            job_deadline: Duration::from_secs(600),
        }
    }
}
