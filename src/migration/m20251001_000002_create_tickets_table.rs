use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tickets::AccountName).string().not_null())
                    .col(ColumnDef::new(Tickets::City).string().not_null())
                    .col(ColumnDef::new(Tickets::ContactPerson).string())
                    .col(ColumnDef::new(Tickets::ContactInfo).string())
                    .col(
                        ColumnDef::new(Tickets::Priority)
                            .string_len(16)
                            .not_null()
                            .default("LOW"),
                    )
                    .col(ColumnDef::new(Tickets::WorkType).string_len(16))
                    .col(ColumnDef::new(Tickets::Lease).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Tickets::UnderWarranty)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tickets::MachineModelOrType).string())
                    .col(ColumnDef::new(Tickets::IssueDescription).text())
                    .col(ColumnDef::new(Tickets::RequestingTechName).string())
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    AccountName,
    City,
    ContactPerson,
    ContactInfo,
    Priority,
    WorkType,
    Lease,
    UnderWarranty,
    MachineModelOrType,
    IssueDescription,
    RequestingTechName,
    CreatedAt,
    UpdatedAt,
}
