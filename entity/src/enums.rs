use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The five network-OS families carried in `spec.md` §3. SQLite has no
/// native enum type, so every variant here round-trips through `String`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    #[sea_orm(string_value = "IOS-XE")]
    IosXe,
    #[sea_orm(string_value = "IOS-XR")]
    IosXr,
    #[sea_orm(string_value = "ASA")]
    Asa,
    #[sea_orm(string_value = "FTD")]
    Ftd,
    #[sea_orm(string_value = "NX-OS")]
    NxOs,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum VulnKind {
    #[sea_orm(string_value = "bug")]
    Bug,
    #[sea_orm(string_value = "advisory")]
    Advisory,
}

/// Mirrors `fleetguard_version::PatternKind`. Kept as a separate type since
/// `fleetguard-version` is intentionally dependency-free (no `sea_orm`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DbPatternKind {
    #[sea_orm(string_value = "explicit")]
    Explicit,
    #[sea_orm(string_value = "wildcard")]
    Wildcard,
    #[sea_orm(string_value = "open_later")]
    OpenLater,
    #[sea_orm(string_value = "open_earlier")]
    OpenEarlier,
    #[sea_orm(string_value = "major_wildcard")]
    MajorWildcard,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

impl From<fleetguard_version::PatternKind> for DbPatternKind {
    fn from(value: fleetguard_version::PatternKind) -> Self {
        use fleetguard_version::PatternKind as P;
        match value {
            P::Explicit => Self::Explicit,
            P::Wildcard => Self::Wildcard,
            P::OpenLater => Self::OpenLater,
            P::OpenEarlier => Self::OpenEarlier,
            P::MajorWildcard => Self::MajorWildcard,
            P::Unknown => Self::Unknown,
        }
    }
}

impl From<DbPatternKind> for fleetguard_version::PatternKind {
    fn from(value: DbPatternKind) -> Self {
        match value {
            DbPatternKind::Explicit => Self::Explicit,
            DbPatternKind::Wildcard => Self::Wildcard,
            DbPatternKind::OpenLater => Self::OpenLater,
            DbPatternKind::OpenEarlier => Self::OpenEarlier,
            DbPatternKind::MajorWildcard => Self::MajorWildcard,
            DbPatternKind::Unknown => Self::Unknown,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum LabelsSource {
    #[sea_orm(string_value = "training")]
    Training,
    #[sea_orm(string_value = "llm")]
    Llm,
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "imported")]
    Imported,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DeviceSource {
    #[sea_orm(string_value = "directory")]
    Directory,
    #[sea_orm(string_value = "manual")]
    Manual,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "stale")]
    Stale,
}
