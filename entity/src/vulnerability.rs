use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::{DbPatternKind, LabelsSource, Platform, VulnKind};

/// One row per bug or advisory (`spec.md` §3 "Vulnerability").
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vulnerabilities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub vuln_id: Uuid,
    #[sea_orm(unique)]
    pub external_id: String,
    pub kind: VulnKind,
    pub platform: Platform,
    pub hardware_model: Option<String>,
    pub severity: i16,
    pub headline: String,
    pub summary: String,
    pub status: String,
    pub advisory_url: Option<String>,

    pub affected_versions_raw: String,
    pub pattern_kind: DbPatternKind,
    pub version_min: Option<String>,
    pub version_max: Option<String>,
    pub fixed_version: Option<String>,
    /// Raw explicit-list version strings, source of truth for rebuilding
    /// `version_index` rows (§8 round-trip invariant).
    pub explicit_list_json: serde_json::Value,

    /// Convenience projection of the current label set; `label_index` is
    /// the query path and must always agree with this column (§3, §8).
    pub labels_json: serde_json::Value,
    pub labels_source: LabelsSource,

    pub created_at: ChronoDateTimeUtc,
    pub last_modified: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::version_index::Entity")]
    VersionIndex,
    #[sea_orm(has_many = "super::label_index::Entity")]
    LabelIndex,
}

impl Related<super::version_index::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VersionIndex.def()
    }
}

impl Related<super::label_index::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabelIndex.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn labels(&self) -> Vec<String> {
        serde_json::from_value(self.labels_json.clone()).unwrap_or_default()
    }

    pub fn explicit_list(&self) -> Vec<String> {
        serde_json::from_value(self.explicit_list_json.clone()).unwrap_or_default()
    }
}
