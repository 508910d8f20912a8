use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppUser::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(AppUser::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AppUser::PasswordHash).string().not_null())
                    .col(ColumnDef::new(AppUser::FirstName).string().not_null())
                    .col(ColumnDef::new(AppUser::LastName).string().not_null())
                    .col(ColumnDef::new(AppUser::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(AppUser::FailedLoginCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AppUser::LockoutEndsAt).timestamp().null())
                    .col(ColumnDef::new(AppUser::LastLoginAt).timestamp().null())
                    .col(ColumnDef::new(AppUser::ResetToken).string().null())
                    .col(
                        ColumnDef::new(AppUser::ResetTokenExpiresAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AppUser::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppUser::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(AppUser::CreatedBy).uuid().null())
                    .col(ColumnDef::new(AppUser::UpdatedAt).timestamp().null())
                    .col(ColumnDef::new(AppUser::UpdatedBy).uuid().null())
                    .col(ColumnDef::new(AppUser::DeletedAt).timestamp().null())
                    .col(ColumnDef::new(AppUser::DeletedBy).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_user_tenant")
                            .from(AppUser::Table, AppUser::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_user_tenant_id")
                    .table(AppUser::Table)
                    .col(AppUser::TenantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_user_reset_token")
                    .table(AppUser::Table)
                    .col(AppUser::ResetToken)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    TenantId,
    FailedLoginCount,
    LockoutEndsAt,
    LastLoginAt,
    ResetToken,
    ResetTokenExpiresAt,
    IsDeleted,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[derive(Iden)]
enum Tenant {
    Table,
    Id,
}
