use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vulnerabilities::Table)
                    .col(ColumnDef::new(Vulnerabilities::VulnId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Vulnerabilities::ExternalId).string().not_null().unique_key())
                    .col(ColumnDef::new(Vulnerabilities::Kind).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::Platform).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::HardwareModel).string().null())
                    .col(ColumnDef::new(Vulnerabilities::Severity).small_integer().not_null())
                    .col(ColumnDef::new(Vulnerabilities::Headline).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::Summary).text().not_null())
                    .col(ColumnDef::new(Vulnerabilities::Status).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::AdvisoryUrl).string().null())
                    .col(ColumnDef::new(Vulnerabilities::AffectedVersionsRaw).text().not_null())
                    .col(ColumnDef::new(Vulnerabilities::PatternKind).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::VersionMin).string().null())
                    .col(ColumnDef::new(Vulnerabilities::VersionMax).string().null())
                    .col(ColumnDef::new(Vulnerabilities::FixedVersion).string().null())
                    .col(
                        ColumnDef::new(Vulnerabilities::ExplicitListJson)
                            .json_binary()
                            .not_null()
                            .default(Expr::value("[]")),
                    )
                    .col(
                        ColumnDef::new(Vulnerabilities::LabelsJson)
                            .json_binary()
                            .not_null()
                            .default(Expr::value("[]")),
                    )
                    .col(ColumnDef::new(Vulnerabilities::LabelsSource).string().not_null())
                    .col(ColumnDef::new(Vulnerabilities::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Vulnerabilities::LastModified).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vulnerabilities_platform_severity")
                    .table(Vulnerabilities::Table)
                    .col(Vulnerabilities::Platform)
                    .col(Vulnerabilities::Severity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VersionIndex::Table)
                    .col(ColumnDef::new(VersionIndex::VulnId).uuid().not_null())
                    .col(ColumnDef::new(VersionIndex::NormalizedVersion).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(VersionIndex::VulnId)
                            .col(VersionIndex::NormalizedVersion),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(VersionIndex::VulnId)
                            .to(Vulnerabilities::Table, Vulnerabilities::VulnId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_version_index_normalized_version")
                    .table(VersionIndex::Table)
                    .col(VersionIndex::NormalizedVersion)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LabelIndex::Table)
                    .col(ColumnDef::new(LabelIndex::VulnId).uuid().not_null())
                    .col(ColumnDef::new(LabelIndex::Label).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(LabelIndex::VulnId)
                            .col(LabelIndex::Label),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(LabelIndex::VulnId)
                            .to(Vulnerabilities::Table, Vulnerabilities::VulnId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_label_index_label")
                    .table(LabelIndex::Table)
                    .col(LabelIndex::Label)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .col(ColumnDef::new(Devices::DeviceId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Devices::ExternalId).string().null())
                    .col(ColumnDef::new(Devices::Hostname).string().not_null())
                    .col(ColumnDef::new(Devices::Ip).string().not_null())
                    .col(ColumnDef::new(Devices::Location).string().null())
                    .col(ColumnDef::new(Devices::DeviceType).string().null())
                    .col(ColumnDef::new(Devices::Source).string().not_null())
                    .col(ColumnDef::new(Devices::Platform).string().null())
                    .col(ColumnDef::new(Devices::Version).string().null())
                    .col(ColumnDef::new(Devices::HardwareModel).string().null())
                    .col(
                        ColumnDef::new(Devices::FeaturesJson)
                            .json_binary()
                            .not_null()
                            .default(Expr::value("[]")),
                    )
                    .col(ColumnDef::new(Devices::DiscoveryStatus).string().not_null())
                    .col(ColumnDef::new(Devices::DiscoveryError).string().null())
                    .col(ColumnDef::new(Devices::LastScanId).uuid().null())
                    .col(ColumnDef::new(Devices::PreviousScanId).uuid().null())
                    .col(ColumnDef::new(Devices::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Devices::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_devices_hostname_ip")
                    .table(Devices::Table)
                    .col(Devices::Hostname)
                    .col(Devices::Ip)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScanResults::Table)
                    .col(ColumnDef::new(ScanResults::ScanId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ScanResults::DeviceId).uuid().not_null())
                    .col(ColumnDef::new(ScanResults::Timestamp).timestamp().not_null())
                    .col(ColumnDef::new(ScanResults::Platform).string().not_null())
                    .col(ColumnDef::new(ScanResults::Version).string().null())
                    .col(ColumnDef::new(ScanResults::HardwareModel).string().null())
                    .col(ColumnDef::new(ScanResults::TotalBugs).integer().not_null())
                    .col(ColumnDef::new(ScanResults::BugCriticalHigh).integer().not_null())
                    .col(ColumnDef::new(ScanResults::TotalPsirts).integer().not_null())
                    .col(ColumnDef::new(ScanResults::PsirtCriticalHigh).integer().not_null())
                    .col(ColumnDef::new(ScanResults::HardwareFilteredCount).integer().not_null())
                    .col(ColumnDef::new(ScanResults::FeatureFilteredCount).integer().not_null())
                    .col(ColumnDef::new(ScanResults::QueryTimeMs).big_integer().not_null())
                    .col(ColumnDef::new(ScanResults::BodyJson).json_binary().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from_col(ScanResults::DeviceId)
                            .to(Devices::Table, Devices::DeviceId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scan_results_device_timestamp")
                    .table(ScanResults::Table)
                    .col(ScanResults::DeviceId)
                    .col(ScanResults::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ScanResults::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Devices::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LabelIndex::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(VersionIndex::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Vulnerabilities::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Vulnerabilities {
    Table,
    VulnId,
    ExternalId,
    Kind,
    Platform,
    HardwareModel,
    Severity,
    Headline,
    Summary,
    Status,
    AdvisoryUrl,
    AffectedVersionsRaw,
    PatternKind,
    VersionMin,
    VersionMax,
    FixedVersion,
    ExplicitListJson,
    LabelsJson,
    LabelsSource,
    CreatedAt,
    LastModified,
}

#[derive(DeriveIden)]
enum VersionIndex {
    Table,
    VulnId,
    NormalizedVersion,
}

#[derive(DeriveIden)]
enum LabelIndex {
    Table,
    VulnId,
    Label,
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    DeviceId,
    ExternalId,
    Hostname,
    Ip,
    Location,
    DeviceType,
    Source,
    Platform,
    Version,
    HardwareModel,
    FeaturesJson,
    DiscoveryStatus,
    DiscoveryError,
    LastScanId,
    PreviousScanId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ScanResults {
    Table,
    ScanId,
    DeviceId,
    Timestamp,
    Platform,
    Version,
    HardwareModel,
    TotalBugs,
    BugCriticalHigh,
    TotalPsirts,
    PsirtCriticalHigh,
    HardwareFilteredCount,
    FeatureFilteredCount,
    QueryTimeMs,
    BodyJson,
}
