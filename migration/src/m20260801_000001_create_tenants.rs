use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenant::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenant::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tenant::Name).string().not_null())
                    .col(ColumnDef::new(Tenant::Identifier).string().not_null())
                    .col(
                        ColumnDef::new(Tenant::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tenant::SubscriptionEndsAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Tenant::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tenant::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Tenant::CreatedBy).uuid().null())
                    .col(ColumnDef::new(Tenant::UpdatedAt).timestamp().null())
                    .col(ColumnDef::new(Tenant::UpdatedBy).uuid().null())
                    .col(ColumnDef::new(Tenant::DeletedAt).timestamp().null())
                    .col(ColumnDef::new(Tenant::DeletedBy).uuid().null())
                    .to_owned(),
            )
            .await?;

        // Not unique: soft-deleted rows stay in the table and must not block
        // identifier reuse. Live-row uniqueness is enforced by the service.
        manager
            .create_index(
                Index::create()
                    .name("idx_tenant_identifier")
                    .table(Tenant::Table)
                    .col(Tenant::Identifier)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tenant::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tenant {
    Table,
    Id,
    Name,
    Identifier,
    IsActive,
    SubscriptionEndsAt,
    IsDeleted,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}
