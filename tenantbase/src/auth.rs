use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use password_hash::SaltString;
use rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::entity::{tenant, user};
use crate::error::Error;
use crate::scope::{self, Audited, RequestScope};
use crate::tenants::normalize_identifier;

/// Failed attempts before the account locks.
pub const MAX_FAILED_LOGINS: i32 = 5;
/// How long a lockout lasts.
pub const LOCKOUT_MINUTES: i64 = 5;
const MIN_PASSWORD_LEN: usize = 8;

/// Input to [`Auth::register`]: a new tenant and its first user, created
/// together.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub company_identifier: String,
}

pub struct Auth {
    db: DatabaseConnection,
}

impl Auth {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Expose the underlying DB connection for direct SeaORM queries.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Hash a plaintext password with Argon2id + a random salt.
    pub fn hash_password(password: &str) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hash(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, Error> {
        let hash = PasswordHash::new(password_hash).map_err(|e| Error::Hash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    }

    pub fn validate_password(password: &str) -> Result<(), Error> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, Error> {
        let email = email.trim().to_lowercase();
        Ok(scope::users(&RequestScope::unscoped())
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    /// Register a new tenant and its first user. Both uniqueness checks run
    /// before any write; the two inserts share one transaction, so a failed
    /// user insert leaves no orphan tenant behind.
    pub async fn register(
        &self,
        reg: NewRegistration,
    ) -> Result<(tenant::Model, user::Model), Error> {
        let email = reg.email.trim().to_lowercase();
        let company_name = reg.company_name.trim().to_string();
        let identifier = normalize_identifier(&reg.company_identifier);

        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation(
                "A valid email address is required".into(),
            ));
        }
        if company_name.is_empty() {
            return Err(Error::Validation("Company name must not be blank".into()));
        }
        if identifier.is_empty() {
            return Err(Error::Validation(
                "Company identifier must not be blank".into(),
            ));
        }
        Self::validate_password(&reg.password)?;

        let actor = RequestScope::unscoped();

        let email_taken = scope::users(&actor)
            .filter(user::Column::Email.eq(email.clone()))
            .count(&self.db)
            .await?
            > 0;
        if email_taken {
            return Err(Error::Conflict("Email is already registered".into()));
        }

        let identifier_taken = scope::tenants()
            .filter(tenant::Column::Identifier.eq(identifier.clone()))
            .count(&self.db)
            .await?
            > 0;
        if identifier_taken {
            return Err(Error::Conflict(format!(
                "Tenant identifier '{identifier}' already exists"
            )));
        }

        let password_hash = Self::hash_password(&reg.password)?;

        let txn = self.db.begin().await?;

        let mut new_tenant = tenant::ActiveModel {
            name: Set(company_name),
            identifier: Set(identifier),
            is_active: Set(true),
            ..Default::default()
        };
        new_tenant.stamp_created(&actor);
        let created_tenant = new_tenant.insert(&txn).await?;

        let mut new_user = user::ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(reg.first_name.trim().to_string()),
            last_name: Set(reg.last_name.trim().to_string()),
            tenant_id: Set(created_tenant.id),
            failed_login_count: Set(0),
            ..Default::default()
        };
        new_user.stamp_created(&actor);
        let created_user = new_user.insert(&txn).await?;

        txn.commit().await?;

        Ok((created_tenant, created_user))
    }

    /// Verify credentials, enforcing the lockout policy and the tenant
    /// active check. Unknown email and wrong password are deliberately
    /// indistinguishable; a lockout is reported distinctly and gates even
    /// a correct password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, Error> {
        let now = Utc::now().naive_utc();
        let found = self
            .find_by_email(email)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if let Some(until) = found.lockout_ends_at {
            if until > now {
                return Err(Error::LockedOut);
            }
        }

        if !Self::verify_password(password, &found.password_hash)? {
            self.record_failed_login(&found).await?;
            return Err(Error::InvalidCredentials);
        }

        let actor = RequestScope::for_user(found.id, found.tenant_id);
        let mut active: user::ActiveModel = found.into();
        active.failed_login_count = Set(0);
        active.lockout_ends_at = Set(None);
        active.last_login_at = Set(Some(now));
        active.stamp_updated(&actor);
        let authed = active.update(&self.db).await?;

        let owning_tenant = scope::tenants()
            .filter(tenant::Column::Id.eq(authed.tenant_id))
            .one(&self.db)
            .await?;
        match owning_tenant {
            Some(t) if t.is_active => Ok(authed),
            _ => Err(Error::TenantInactive),
        }
    }

    /// The fifth failed attempt arms the lockout and resets the counter.
    async fn record_failed_login(&self, found: &user::Model) -> Result<(), Error> {
        let attempts = found.failed_login_count + 1;
        let mut active: user::ActiveModel = found.clone().into();
        if attempts >= MAX_FAILED_LOGINS {
            active.failed_login_count = Set(0);
            active.lockout_ends_at =
                Set(Some(Utc::now().naive_utc() + Duration::minutes(LOCKOUT_MINUTES)));
        } else {
            active.failed_login_count = Set(attempts);
        }
        active.stamp_updated(&RequestScope::unscoped());
        active.update(&self.db).await?;
        Ok(())
    }
}
