use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_receiving_tables::Migration),
            Box::new(m20240101_000003_create_workshop_tables::Migration),
            Box::new(m20240101_000004_create_spares_tables::Migration),
            Box::new(m20240101_000005_create_outward_tables::Migration),
            Box::new(m20240101_000006_create_activity_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Email,
        Name,
        PasswordHash,
        Role,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_receiving_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_receiving_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::PoNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierName).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::ExpectedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::ReceivedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(PurchaseOrders::Notes).text().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InwardBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InwardBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InwardBatches::BatchNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InwardBatches::InwardType).string_len(32).not_null())
                        .col(ColumnDef::new(InwardBatches::PurchaseOrderId).uuid().null())
                        .col(ColumnDef::new(InwardBatches::SupplierName).string().null())
                        .col(ColumnDef::new(InwardBatches::CustomerName).string().null())
                        .col(ColumnDef::new(InwardBatches::RentalReference).string().null())
                        .col(ColumnDef::new(InwardBatches::ReceivedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(InwardBatches::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InwardBatches::DeviceCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InwardBatches::Notes).text().null())
                        .col(
                            ColumnDef::new(InwardBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InwardBatches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inward_batches_purchase_order")
                                .from(InwardBatches::Table, InwardBatches::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Devices::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Devices::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Devices::Category).string_len(16).not_null())
                        .col(ColumnDef::new(Devices::Brand).string().not_null())
                        .col(ColumnDef::new(Devices::Model).string().not_null())
                        .col(ColumnDef::new(Devices::SerialNumber).string().null())
                        .col(ColumnDef::new(Devices::Cpu).string().null())
                        .col(ColumnDef::new(Devices::Ram).string().null())
                        .col(ColumnDef::new(Devices::Storage).string().null())
                        .col(ColumnDef::new(Devices::Ownership).string_len(16).not_null())
                        .col(ColumnDef::new(Devices::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Devices::Grade).string_len(1).null())
                        .col(ColumnDef::new(Devices::InwardBatchId).uuid().not_null())
                        .col(ColumnDef::new(Devices::RackLocation).string().null())
                        .col(
                            ColumnDef::new(Devices::RepairRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Devices::RepairCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Devices::PaintRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Devices::PaintCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Devices::Notes).text().null())
                        .col(
                            ColumnDef::new(Devices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Devices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_devices_inward_batch")
                                .from(Devices::Table, Devices::InwardBatchId)
                                .to(InwardBatches::Table, InwardBatches::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_status")
                        .table(Devices::Table)
                        .col(Devices::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_inward_batch_id")
                        .table(Devices::Table)
                        .col(Devices::InwardBatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Devices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InwardBatches::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        SupplierName,
        OrderDate,
        ExpectedQuantity,
        ReceivedQuantity,
        Status,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum InwardBatches {
        Table,
        Id,
        BatchNumber,
        InwardType,
        PurchaseOrderId,
        SupplierName,
        CustomerName,
        RentalReference,
        ReceivedBy,
        ReceivedAt,
        DeviceCount,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Devices {
        Table,
        Id,
        Barcode,
        Category,
        Brand,
        Model,
        SerialNumber,
        Cpu,
        Ram,
        Storage,
        Ownership,
        Status,
        Grade,
        InwardBatchId,
        RackLocation,
        RepairRequired,
        RepairCompleted,
        PaintRequired,
        PaintCompleted,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_workshop_tables {

    use super::m20240101_000002_create_receiving_tables::Devices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_workshop_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Inspections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Inspections::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Inspections::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(Inspections::InspectorId).uuid().not_null())
                        .col(ColumnDef::new(Inspections::Checklist).json().not_null())
                        .col(ColumnDef::new(Inspections::ReportedIssues).json().not_null())
                        .col(ColumnDef::new(Inspections::SparesRequired).json().not_null())
                        .col(ColumnDef::new(Inspections::PaintPanels).json().not_null())
                        .col(ColumnDef::new(Inspections::Notes).text().null())
                        .col(ColumnDef::new(Inspections::NextStatus).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Inspections::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Inspections::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inspections_device")
                                .from(Inspections::Table, Inspections::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RepairJobs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RepairJobs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::JobNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(RepairJobs::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(RepairJobs::InspectionId).uuid().null())
                        .col(ColumnDef::new(RepairJobs::Status).string_len(32).not_null())
                        .col(ColumnDef::new(RepairJobs::ReportedIssues).json().not_null())
                        .col(ColumnDef::new(RepairJobs::SparesRequired).json().not_null())
                        .col(
                            ColumnDef::new(RepairJobs::SparesIssued)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(RepairJobs::AssignedTo).uuid().null())
                        .col(
                            ColumnDef::new(RepairJobs::TatDueDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(RepairJobs::RepairNotes).text().null())
                        .col(
                            ColumnDef::new(RepairJobs::IsRework)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_repair_jobs_device")
                                .from(RepairJobs::Table, RepairJobs::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_repair_jobs_inspection")
                                .from(RepairJobs::Table, RepairJobs::InspectionId)
                                .to(Inspections::Table, Inspections::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_repair_jobs_status")
                        .table(RepairJobs::Table)
                        .col(RepairJobs::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SpecialistJobs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SpecialistJobs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SpecialistJobs::RepairJobId).uuid().not_null())
                        .col(ColumnDef::new(SpecialistJobs::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(SpecialistJobs::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(SpecialistJobs::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(SpecialistJobs::IssueDescription)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SpecialistJobs::AssignedTo).uuid().null())
                        .col(
                            ColumnDef::new(SpecialistJobs::BatteryHealthBefore)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SpecialistJobs::BatteryHealthAfter)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(SpecialistJobs::ResolutionNotes).text().null())
                        .col(
                            ColumnDef::new(SpecialistJobs::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SpecialistJobs::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SpecialistJobs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpecialistJobs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_specialist_jobs_repair_job")
                                .from(SpecialistJobs::Table, SpecialistJobs::RepairJobId)
                                .to(RepairJobs::Table, RepairJobs::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_specialist_jobs_device")
                                .from(SpecialistJobs::Table, SpecialistJobs::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaintPanels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaintPanels::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaintPanels::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(PaintPanels::Panel).string_len(16).not_null())
                        .col(ColumnDef::new(PaintPanels::Status).string_len(24).not_null())
                        .col(ColumnDef::new(PaintPanels::PaintedBy).uuid().null())
                        .col(ColumnDef::new(PaintPanels::CollectedBy).uuid().null())
                        .col(
                            ColumnDef::new(PaintPanels::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaintPanels::ReadyAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaintPanels::CollectedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaintPanels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaintPanels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_paint_panels_device")
                                .from(PaintPanels::Table, PaintPanels::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QcRecords::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(QcRecords::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(QcRecords::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(QcRecords::QcEngineerId).uuid().not_null())
                        .col(ColumnDef::new(QcRecords::Checklist).json().not_null())
                        .col(ColumnDef::new(QcRecords::Result).string_len(16).not_null())
                        .col(ColumnDef::new(QcRecords::FinalGrade).string_len(1).null())
                        .col(ColumnDef::new(QcRecords::Remarks).text().null())
                        .col(
                            ColumnDef::new(QcRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QcRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_qc_records_device")
                                .from(QcRecords::Table, QcRecords::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QcRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaintPanels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SpecialistJobs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(RepairJobs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Inspections::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Inspections {
        Table,
        Id,
        DeviceId,
        InspectorId,
        Checklist,
        ReportedIssues,
        SparesRequired,
        PaintPanels,
        Notes,
        NextStatus,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum RepairJobs {
        Table,
        Id,
        JobNumber,
        DeviceId,
        InspectionId,
        Status,
        ReportedIssues,
        SparesRequired,
        SparesIssued,
        AssignedTo,
        TatDueDate,
        StartedAt,
        CompletedAt,
        RepairNotes,
        IsRework,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SpecialistJobs {
        Table,
        Id,
        RepairJobId,
        DeviceId,
        Kind,
        Status,
        IssueDescription,
        AssignedTo,
        BatteryHealthBefore,
        BatteryHealthAfter,
        ResolutionNotes,
        StartedAt,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PaintPanels {
        Table,
        Id,
        DeviceId,
        Panel,
        Status,
        PaintedBy,
        CollectedBy,
        StartedAt,
        ReadyAt,
        CollectedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum QcRecords {
        Table,
        Id,
        DeviceId,
        QcEngineerId,
        Checklist,
        Result,
        FinalGrade,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_spares_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_spares_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SpareParts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SpareParts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareParts::PartCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(SpareParts::Name).string().not_null())
                        .col(ColumnDef::new(SpareParts::Category).string().null())
                        .col(ColumnDef::new(SpareParts::CompatibleModels).text().null())
                        .col(
                            ColumnDef::new(SpareParts::CurrentStock)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(SpareParts::CurrentStock).gte(0)),
                        )
                        .col(
                            ColumnDef::new(SpareParts::MinStockLevel)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(SpareParts::RackLocation).string().null())
                        .col(ColumnDef::new(SpareParts::UnitCost).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(SpareParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareParts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SpareTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SpareTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareTransactions::SparePartId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SpareTransactions::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(SpareTransactions::Quantity).integer().not_null())
                        .col(ColumnDef::new(SpareTransactions::RepairJobId).uuid().null())
                        .col(ColumnDef::new(SpareTransactions::PerformedBy).uuid().null())
                        .col(ColumnDef::new(SpareTransactions::Notes).text().null())
                        .col(
                            ColumnDef::new(SpareTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareTransactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_spare_transactions_part")
                                .from(SpareTransactions::Table, SpareTransactions::SparePartId)
                                .to(SpareParts::Table, SpareParts::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_spare_transactions_part")
                        .table(SpareTransactions::Table)
                        .col(SpareTransactions::SparePartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SpareTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SpareParts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SpareParts {
        Table,
        Id,
        PartCode,
        Name,
        Category,
        CompatibleModels,
        CurrentStock,
        MinStockLevel,
        RackLocation,
        UnitCost,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SpareTransactions {
        Table,
        Id,
        SparePartId,
        Kind,
        Quantity,
        RepairJobId,
        PerformedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_outward_tables {

    use super::m20240101_000002_create_receiving_tables::Devices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_outward_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OutwardRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutwardRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutwardRecords::OutwardNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(OutwardRecords::OutwardType).string_len(16).not_null())
                        .col(ColumnDef::new(OutwardRecords::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(OutwardRecords::ReferenceNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutwardRecords::ShippingDetails).text().null())
                        .col(ColumnDef::new(OutwardRecords::DispatchedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(OutwardRecords::DispatchedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutwardRecords::Notes).text().null())
                        .col(
                            ColumnDef::new(OutwardRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutwardRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OutwardItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutwardItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutwardItems::OutwardRecordId).uuid().not_null())
                        .col(
                            ColumnDef::new(OutwardItems::DeviceId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(OutwardItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutwardItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_outward_items_record")
                                .from(OutwardItems::Table, OutwardItems::OutwardRecordId)
                                .to(OutwardRecords::Table, OutwardRecords::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_outward_items_device")
                                .from(OutwardItems::Table, OutwardItems::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutwardItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OutwardRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OutwardRecords {
        Table,
        Id,
        OutwardNumber,
        OutwardType,
        CustomerName,
        ReferenceNumber,
        ShippingDetails,
        DispatchedBy,
        DispatchedAt,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OutwardItems {
        Table,
        Id,
        OutwardRecordId,
        DeviceId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_activity_tables {

    use super::m20240101_000002_create_receiving_tables::Devices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_activity_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeviceHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeviceHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeviceHistory::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(DeviceHistory::FromStatus).string_len(32).null())
                        .col(ColumnDef::new(DeviceHistory::ToStatus).string_len(32).not_null())
                        .col(ColumnDef::new(DeviceHistory::Action).string().not_null())
                        .col(ColumnDef::new(DeviceHistory::PerformedBy).uuid().null())
                        .col(ColumnDef::new(DeviceHistory::Notes).text().null())
                        .col(
                            ColumnDef::new(DeviceHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeviceHistory::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_device_history_device")
                                .from(DeviceHistory::Table, DeviceHistory::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_device_history_device_id")
                        .table(DeviceHistory::Table)
                        .col(DeviceHistory::DeviceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Attachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Attachments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attachments::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(Attachments::FileName).string().not_null())
                        .col(ColumnDef::new(Attachments::ContentType).string().not_null())
                        .col(ColumnDef::new(Attachments::SizeBytes).big_integer().not_null())
                        .col(ColumnDef::new(Attachments::StoragePath).string().not_null())
                        .col(ColumnDef::new(Attachments::UploadedBy).uuid().null())
                        .col(
                            ColumnDef::new(Attachments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Attachments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_attachments_device")
                                .from(Attachments::Table, Attachments::DeviceId)
                                .to(Devices::Table, Devices::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Attachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeviceHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeviceHistory {
        Table,
        Id,
        DeviceId,
        FromStatus,
        ToStatus,
        Action,
        PerformedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Attachments {
        Table,
        Id,
        DeviceId,
        FileName,
        ContentType,
        SizeBytes,
        StoragePath,
        UploadedBy,
        CreatedAt,
        UpdatedAt,
    }
}
