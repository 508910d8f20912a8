//! Tenant isolation and audit interception.
//!
//! Every read of a soft-deletable entity starts from the query
//! constructors here, which inject the standing predicates (soft-delete
//! exclusion, tenant scoping). Every write stamps audit metadata through
//! [`Audited`]. Callers never repeat the predicates, and none of this
//! raises new error kinds; it only narrows result sets.

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, NotSet, QueryFilter, Select, Set};
use uuid::Uuid;

use crate::entity::{tenant, user};

/// Who is acting and which tenant they belong to. Threaded explicitly
/// into every data-access call; there is no ambient request state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestScope {
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

impl RequestScope {
    /// Platform-level or system caller: no actor, no tenant restriction.
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            tenant_id: Some(tenant_id),
        }
    }
}

/// All tenant reads: soft-deleted rows are invisible.
pub fn tenants() -> Select<tenant::Entity> {
    tenant::Entity::find().filter(tenant::Column::IsDeleted.eq(false))
}

/// All user reads: soft-deleted rows are invisible, and a tenant-scoped
/// caller only sees rows of their own tenant. An unscoped caller gets no
/// tenant restriction.
pub fn users(scope: &RequestScope) -> Select<user::Entity> {
    let mut query = user::Entity::find().filter(user::Column::IsDeleted.eq(false));
    if let Some(tenant_id) = scope.tenant_id {
        query = query.filter(user::Column::TenantId.eq(tenant_id));
    }
    query
}

/// Audit stamping over the save pipeline.
///
/// Creation assigns the identifier and creation metadata; modification
/// stamps the update columns and drops any pending write to the creation
/// columns (immutable post-insert); deletion converts into a soft-delete
/// update, so the row is retained.
pub trait Audited {
    fn stamp_created(&mut self, scope: &RequestScope);
    fn stamp_updated(&mut self, scope: &RequestScope);
    fn stamp_deleted(&mut self, scope: &RequestScope);
}

impl Audited for tenant::ActiveModel {
    fn stamp_created(&mut self, scope: &RequestScope) {
        self.id = Set(Uuid::now_v7());
        self.is_deleted = Set(false);
        self.created_at = Set(Utc::now().naive_utc());
        self.created_by = Set(scope.user_id);
    }

    fn stamp_updated(&mut self, scope: &RequestScope) {
        self.created_at = NotSet;
        self.created_by = NotSet;
        self.updated_at = Set(Some(Utc::now().naive_utc()));
        self.updated_by = Set(scope.user_id);
    }

    fn stamp_deleted(&mut self, scope: &RequestScope) {
        self.created_at = NotSet;
        self.created_by = NotSet;
        self.is_deleted = Set(true);
        self.deleted_at = Set(Some(Utc::now().naive_utc()));
        self.deleted_by = Set(scope.user_id);
    }
}

impl Audited for user::ActiveModel {
    fn stamp_created(&mut self, scope: &RequestScope) {
        self.id = Set(Uuid::now_v7());
        self.is_deleted = Set(false);
        self.created_at = Set(Utc::now().naive_utc());
        self.created_by = Set(scope.user_id);
    }

    fn stamp_updated(&mut self, scope: &RequestScope) {
        self.created_at = NotSet;
        self.created_by = NotSet;
        self.updated_at = Set(Some(Utc::now().naive_utc()));
        self.updated_by = Set(scope.user_id);
    }

    fn stamp_deleted(&mut self, scope: &RequestScope) {
        self.created_at = NotSet;
        self.created_by = NotSet;
        self.is_deleted = Set(true);
        self.deleted_at = Set(Some(Utc::now().naive_utc()));
        self.deleted_by = Set(scope.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, PaginatorTrait};

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn insert_tenant(db: &DatabaseConnection, name: &str, identifier: &str) -> tenant::Model {
        let mut active = tenant::ActiveModel {
            name: Set(name.to_string()),
            identifier: Set(identifier.to_string()),
            is_active: Set(true),
            ..Default::default()
        };
        active.stamp_created(&RequestScope::unscoped());
        active.insert(db).await.unwrap()
    }

    async fn insert_user(db: &DatabaseConnection, email: &str, tenant_id: Uuid) -> user::Model {
        let mut active = user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set("hash".to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            tenant_id: Set(tenant_id),
            failed_login_count: Set(0),
            ..Default::default()
        };
        active.stamp_created(&RequestScope::unscoped());
        active.insert(db).await.unwrap()
    }

    #[tokio::test]
    async fn stamp_created_assigns_id_and_creation_metadata() {
        let db = setup_db().await;
        let actor = Uuid::now_v7();
        let scope = RequestScope {
            user_id: Some(actor),
            tenant_id: None,
        };

        let mut active = tenant::ActiveModel {
            name: Set("Acme Corp".to_string()),
            identifier: Set("acme-corp".to_string()),
            is_active: Set(true),
            ..Default::default()
        };
        active.stamp_created(&scope);
        let row = active.insert(&db).await.unwrap();

        assert!(!row.id.is_nil());
        assert_eq!(row.created_by, Some(actor));
        assert!(!row.is_deleted);
        assert!(row.updated_at.is_none());
    }

    #[tokio::test]
    async fn stamp_updated_drops_writes_to_creation_metadata() {
        let db = setup_db().await;
        let row = insert_tenant(&db, "Acme Corp", "acme-corp").await;
        let original_created_at = row.created_at;

        let mut active: tenant::ActiveModel = row.clone().into();
        // A caller trying to rewrite creation metadata gets silently ignored.
        active.created_at = Set(original_created_at + chrono::Duration::days(30));
        active.created_by = Set(Some(Uuid::now_v7()));
        active.name = Set("Acme Holdings".to_string());
        active.stamp_updated(&RequestScope::unscoped());
        active.update(&db).await.unwrap();

        let reloaded = tenants()
            .filter(tenant::Column::Id.eq(row.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.created_at, original_created_at);
        assert_eq!(reloaded.created_by, None);
        assert_eq!(reloaded.name, "Acme Holdings");
        assert!(reloaded.updated_at.is_some());
    }

    #[tokio::test]
    async fn soft_deleted_tenant_is_invisible_but_retained() {
        let db = setup_db().await;
        let keep = insert_tenant(&db, "Keep", "keep").await;
        let gone = insert_tenant(&db, "Gone", "gone").await;

        let mut active: tenant::ActiveModel = gone.clone().into();
        active.stamp_deleted(&RequestScope::unscoped());
        active.update(&db).await.unwrap();

        let visible = tenants().all(&db).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, keep.id);

        // The physical row is still there.
        let raw = tenant::Entity::find().count(&db).await.unwrap();
        assert_eq!(raw, 2);
        let row = tenant::Entity::find_by_id(gone.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_deleted);
        assert!(row.deleted_at.is_some());
    }

    #[tokio::test]
    async fn scoped_user_query_never_crosses_tenants() {
        let db = setup_db().await;
        let acme = insert_tenant(&db, "Acme", "acme").await;
        let globex = insert_tenant(&db, "Globex", "globex").await;
        let alice = insert_user(&db, "alice@acme.com", acme.id).await;
        insert_user(&db, "bob@acme.com", acme.id).await;
        insert_user(&db, "carol@globex.com", globex.id).await;

        let scope = RequestScope::for_user(alice.id, acme.id);
        let rows = users(&scope).all(&db).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|u| u.tenant_id == acme.id));
    }

    #[tokio::test]
    async fn unscoped_user_query_is_unrestricted() {
        let db = setup_db().await;
        let acme = insert_tenant(&db, "Acme", "acme").await;
        let globex = insert_tenant(&db, "Globex", "globex").await;
        insert_user(&db, "alice@acme.com", acme.id).await;
        insert_user(&db, "carol@globex.com", globex.id).await;

        let rows = users(&RequestScope::unscoped()).all(&db).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn soft_deleted_user_is_invisible_even_unscoped() {
        let db = setup_db().await;
        let acme = insert_tenant(&db, "Acme", "acme").await;
        let alice = insert_user(&db, "alice@acme.com", acme.id).await;

        let mut active: user::ActiveModel = alice.into();
        active.stamp_deleted(&RequestScope::unscoped());
        active.update(&db).await.unwrap();

        let rows = users(&RequestScope::unscoped()).all(&db).await.unwrap();
        assert!(rows.is_empty());
    }
}
