use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::{DeviceSource, DiscoveryStatus, Platform};

/// `DeviceStub` plus the discovered fields and rotation slots
/// (`spec.md` §3 "Device"). Identity key is `(hostname, ip)`, enforced by a
/// unique index in the migration.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub device_id: Uuid,
    pub external_id: Option<String>,
    pub hostname: String,
    pub ip: String,
    pub location: Option<String>,
    pub device_type: Option<String>,
    pub source: DeviceSource,

    pub platform: Option<Platform>,
    pub version: Option<String>,
    pub hardware_model: Option<String>,
    pub features_json: serde_json::Value,
    pub discovery_status: DiscoveryStatus,
    pub discovery_error: Option<String>,

    pub last_scan_id: Option<Uuid>,
    pub previous_scan_id: Option<Uuid>,

    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scan_result::Entity",
        from = "Column::LastScanId",
        to = "super::scan_result::Column::ScanId"
    )]
    LastScan,
}

impl Related<super::scan_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LastScan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn features(&self) -> Vec<String> {
        serde_json::from_value(self.features_json.clone()).unwrap_or_default()
    }
}
