use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::Platform;

/// The immutable, addressable `ScanResult` body (`spec.md` §3 "ScanResult").
/// `body_json` holds the full serialized result; the flat columns are the
/// `ScanSummary` projection used for rotation bookkeeping and comparisons
/// without deserializing the body.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scan_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub scan_id: Uuid,
    pub device_id: Uuid,
    pub timestamp: ChronoDateTimeUtc,

    pub platform: Platform,
    pub version: Option<String>,
    pub hardware_model: Option<String>,

    pub total_bugs: i32,
    pub bug_critical_high: i32,
    pub total_psirts: i32,
    pub psirt_critical_high: i32,
    pub hardware_filtered_count: i32,
    pub feature_filtered_count: i32,
    pub query_time_ms: i64,

    pub body_json: serde_json::Value,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
