use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::tenant;
use crate::error::Error;
use crate::scope::{self, Audited, RequestScope};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Whitelisted fields for [`Tenants::update`]; absent fields stay unchanged.
#[derive(Debug, Default, Clone)]
pub struct TenantChanges {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub subscription_ends_at: Option<NaiveDateTime>,
}

pub struct Tenants {
    db: DatabaseConnection,
}

impl Tenants {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        scope: &RequestScope,
        name: &str,
        identifier: &str,
    ) -> Result<tenant::Model, Error> {
        let name = name.trim();
        let identifier = normalize_identifier(identifier);
        if name.is_empty() {
            return Err(Error::Validation("Tenant name must not be blank".into()));
        }
        if identifier.is_empty() {
            return Err(Error::Validation(
                "Tenant identifier must not be blank".into(),
            ));
        }
        if self.identifier_exists(&identifier).await? {
            return Err(Error::Conflict(format!(
                "Tenant identifier '{identifier}' already exists"
            )));
        }

        let mut active = tenant::ActiveModel {
            name: Set(name.to_string()),
            identifier: Set(identifier),
            is_active: Set(true),
            ..Default::default()
        };
        active.stamp_created(scope);
        Ok(active.insert(&self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<tenant::Model, Error> {
        scope::tenants()
            .filter(tenant::Column::Id.eq(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound("Tenant not found".into()))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<tenant::Model, Error> {
        scope::tenants()
            .filter(tenant::Column::Name.eq(name))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound("Tenant not found".into()))
    }

    pub async fn get_by_identifier(&self, identifier: &str) -> Result<tenant::Model, Error> {
        scope::tenants()
            .filter(tenant::Column::Identifier.eq(normalize_identifier(identifier)))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound("Tenant not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<tenant::Model>, Error> {
        Ok(scope::tenants()
            .order_by_asc(tenant::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Returns `(items, total)`. `page` floors at 1, `page_size` clamps to
    /// `[1, MAX_PAGE_SIZE]`.
    pub async fn list_paged(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<tenant::Model>, u64), Error> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let paginator = scope::tenants()
            .order_by_asc(tenant::Column::CreatedAt)
            .paginate(&self.db, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    pub async fn update(
        &self,
        scope: &RequestScope,
        id: Uuid,
        changes: TenantChanges,
    ) -> Result<tenant::Model, Error> {
        let existing = self.get(id).await?;
        let mut active: tenant::ActiveModel = existing.into();

        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::Validation("Tenant name must not be blank".into()));
            }
            active.name = Set(name);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(ends_at) = changes.subscription_ends_at {
            active.subscription_ends_at = Set(Some(ends_at));
        }
        active.stamp_updated(scope);

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, scope: &RequestScope, id: Uuid) -> Result<(), Error> {
        let existing = self.get(id).await?;
        let mut active: tenant::ActiveModel = existing.into();
        active.stamp_deleted(scope);
        active.update(&self.db).await?;
        Ok(())
    }

    /// Case-insensitive, live rows only.
    pub async fn identifier_exists(&self, identifier: &str) -> Result<bool, Error> {
        let count = scope::tenants()
            .filter(tenant::Column::Identifier.eq(normalize_identifier(identifier)))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

pub(crate) fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> Tenants {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Tenants::new(db)
    }

    fn unscoped() -> RequestScope {
        RequestScope::unscoped()
    }

    #[tokio::test]
    async fn create_normalizes_identifier_to_lowercase() {
        let tenants = setup().await;
        let row = tenants
            .create(&unscoped(), "Acme Corp", "Acme-Corp")
            .await
            .unwrap();
        assert_eq!(row.identifier, "acme-corp");
        assert!(row.is_active);
    }

    #[tokio::test]
    async fn create_blank_name_rejected() {
        let tenants = setup().await;
        let err = tenants.create(&unscoped(), "  ", "acme").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn create_blank_identifier_rejected() {
        let tenants = setup().await;
        let err = tenants.create(&unscoped(), "Acme", "  ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn identifier_conflict_is_case_insensitive() {
        let tenants = setup().await;
        tenants.create(&unscoped(), "Acme", "Acme").await.unwrap();

        let err = tenants
            .create(&unscoped(), "Other", "acme")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let err = tenants
            .create(&unscoped(), "Other", "ACME")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn get_by_identifier_is_case_insensitive() {
        let tenants = setup().await;
        let created = tenants.create(&unscoped(), "Acme", "acme").await.unwrap();
        let found = tenants.get_by_identifier("ACME").await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn get_unknown_id_not_found() {
        let tenants = setup().await;
        let err = tenants.get(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn deleted_tenant_vanishes_from_every_read_path() {
        let tenants = setup().await;
        let row = tenants.create(&unscoped(), "Acme", "acme").await.unwrap();
        tenants.delete(&unscoped(), row.id).await.unwrap();

        assert!(matches!(
            tenants.get(row.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            tenants.get_by_name("Acme").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(tenants.list().await.unwrap().is_empty());
        let (items, total) = tenants.list_paged(1, 10).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
        assert!(!tenants.identifier_exists("acme").await.unwrap());
    }

    #[tokio::test]
    async fn delete_unknown_id_not_found() {
        let tenants = setup().await;
        let err = tenants
            .delete(&unscoped(), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn identifier_reusable_after_soft_delete() {
        let tenants = setup().await;
        let row = tenants.create(&unscoped(), "Acme", "acme").await.unwrap();
        tenants.delete(&unscoped(), row.id).await.unwrap();

        // The retained row no longer blocks the slug.
        let again = tenants.create(&unscoped(), "Acme 2", "acme").await.unwrap();
        assert_ne!(again.id, row.id);
    }

    #[tokio::test]
    async fn list_paged_clamps_page_and_size() {
        let tenants = setup().await;
        for i in 0..3 {
            tenants
                .create(&unscoped(), &format!("T{i}"), &format!("t{i}"))
                .await
                .unwrap();
        }

        // page 0 floors to 1, size 0 clamps to 1
        let (items, total) = tenants.list_paged(0, 0).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(total, 3);

        let (items, total) = tenants.list_paged(2, 2).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn update_touches_whitelisted_fields_only() {
        let tenants = setup().await;
        let row = tenants.create(&unscoped(), "Acme", "acme").await.unwrap();

        let updated = tenants
            .update(
                &unscoped(),
                row.id,
                TenantChanges {
                    name: Some("Acme Holdings".to_string()),
                    is_active: Some(false),
                    subscription_ends_at: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Acme Holdings");
        assert!(!updated.is_active);
        // Identifier is not part of the whitelist.
        assert_eq!(updated.identifier, "acme");
        assert_eq!(updated.created_at, row.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_blank_name_rejected() {
        let tenants = setup().await;
        let row = tenants.create(&unscoped(), "Acme", "acme").await.unwrap();
        let err = tenants
            .update(
                &unscoped(),
                row.id,
                TenantChanges {
                    name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn update_unknown_id_not_found() {
        let tenants = setup().await;
        let err = tenants
            .update(&unscoped(), Uuid::now_v7(), TenantChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
