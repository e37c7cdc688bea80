//! Configuration store tables: calculations, report templates, audit log.
//!
//! Written with the schema builder so the same migration runs on Postgres and
//! on the SQLite databases used by the integration tests.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Calculations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Calculations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Calculations::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Calculations::Description).text())
                    .col(ColumnDef::new(Calculations::GroupLevel).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Calculations::CalculationType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Calculations::SourceTable).string_len(64))
                    .col(ColumnDef::new(Calculations::SourceColumn).string_len(64))
                    .col(ColumnDef::new(Calculations::AggregationFunction).string_len(16))
                    .col(ColumnDef::new(Calculations::WeightColumn).string_len(64))
                    .col(ColumnDef::new(Calculations::SqlText).text())
                    .col(ColumnDef::new(Calculations::ResultColumnName).string_len(63))
                    .col(ColumnDef::new(Calculations::CdiVariableName).string_len(128))
                    .col(ColumnDef::new(Calculations::CreatedBy).string_len(255).not_null())
                    .col(ColumnDef::new(Calculations::ApprovedBy).string_len(255))
                    .col(ColumnDef::new(Calculations::ApprovedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Calculations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Calculations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Calculations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // (name, group_level) uniqueness among active rows is enforced by the
        // repository; the index serves the lookup.
        manager
            .create_index(
                Index::create()
                    .name("idx_calculations_name_level")
                    .table(Calculations::Table)
                    .col(Calculations::Name)
                    .col(Calculations::GroupLevel)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReportTemplates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReportTemplates::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ReportTemplates::Name).string_len(255).not_null())
                    .col(ColumnDef::new(ReportTemplates::Description).text())
                    .col(ColumnDef::new(ReportTemplates::Scope).string_len(16).not_null())
                    .col(ColumnDef::new(ReportTemplates::DealTrancheMap).json().not_null())
                    .col(ColumnDef::new(ReportTemplates::Calculations).json().not_null())
                    .col(
                        ColumnDef::new(ReportTemplates::ColumnPreferences)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportTemplates::CreatedBy)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportTemplates::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ReportTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CalculationAuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CalculationAuditLog::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CalculationAuditLog::CalculationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CalculationAuditLog::Action).string_len(16).not_null())
                    .col(ColumnDef::new(CalculationAuditLog::Actor).string_len(255).not_null())
                    .col(ColumnDef::new(CalculationAuditLog::Changes).json().not_null())
                    .col(
                        ColumnDef::new(CalculationAuditLog::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_log_calculation")
                            .from(CalculationAuditLog::Table, CalculationAuditLog::CalculationId)
                            .to(Calculations::Table, Calculations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_calculation")
                    .table(CalculationAuditLog::Table)
                    .col(CalculationAuditLog::CalculationId)
                    .col(CalculationAuditLog::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CalculationAuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReportTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Calculations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Calculations {
    Table,
    Id,
    Name,
    Description,
    GroupLevel,
    CalculationType,
    SourceTable,
    SourceColumn,
    AggregationFunction,
    WeightColumn,
    SqlText,
    ResultColumnName,
    CdiVariableName,
    CreatedBy,
    ApprovedBy,
    ApprovedAt,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReportTemplates {
    Table,
    Id,
    Name,
    Description,
    Scope,
    DealTrancheMap,
    Calculations,
    ColumnPreferences,
    CreatedBy,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CalculationAuditLog {
    Table,
    Id,
    CalculationId,
    Action,
    Actor,
    Changes,
    RecordedAt,
}
