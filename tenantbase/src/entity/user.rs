use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "app_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Owning tenant. Immutable after creation; the schema restricts
    /// deletes so removing a tenant can never cascade here.
    pub tenant_id: Uuid,
    pub failed_login_count: i32,
    pub lockout_ends_at: Option<DateTime>,
    pub last_login_at: Option<DateTime>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime>,
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Model {
    /// Display name used in token claims.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl ActiveModelBehavior for ActiveModel {}
