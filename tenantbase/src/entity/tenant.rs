use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Lowercase slug. Unique among live rows (service-enforced, so a
    /// soft-deleted tenant does not block reuse).
    pub identifier: String,
    pub is_active: bool,
    pub subscription_ends_at: Option<DateTime>,
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
    #[sea_orm(has_many = "super::user::Entity")]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
