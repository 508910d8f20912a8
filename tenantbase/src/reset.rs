use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::Auth;
use crate::entity::user;
use crate::error::Error;
use crate::notify::Notifier;
use crate::scope::{self, Audited, RequestScope};

/// Token material: 32 random bytes, base64-encoded.
const RESET_TOKEN_BYTES: usize = 32;
/// Tokens expire one hour after issue.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub struct PasswordReset {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl PasswordReset {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Issue a reset token for `email`. An unknown address reports success
    /// without any state change, so the endpoint leaks nothing about which
    /// addresses are registered.
    pub async fn request(&self, email: &str) -> Result<(), Error> {
        let email = email.trim().to_lowercase();
        let found = scope::users(&RequestScope::unscoped())
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        let Some(found) = found else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        let expires_at = Utc::now().naive_utc() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let mut active: user::ActiveModel = found.clone().into();
        active.reset_token = Set(Some(token.clone()));
        active.reset_token_expires_at = Set(Some(expires_at));
        active.stamp_updated(&RequestScope::unscoped());
        active.update(&self.db).await?;

        // Delivery is out-of-band; a failed dispatch is logged, not surfaced.
        if let Err(e) = self
            .notifier
            .password_reset_requested(&found.email, &token)
            .await
        {
            tracing::error!(error = %e, "password reset notification failed");
        }

        Ok(())
    }

    /// Redeem a token, setting a new password. Single use: the row is
    /// claimed with a conditional update (token still matches, expiry still
    /// ahead), so two concurrent redemptions of the same token cannot both
    /// succeed. Returns `false` when the token is unknown, expired, or
    /// already claimed.
    pub async fn redeem(&self, token: &str, new_password: &str) -> Result<bool, Error> {
        Auth::validate_password(new_password)?;

        let now = Utc::now().naive_utc();
        let candidate = scope::users(&RequestScope::unscoped())
            .filter(user::Column::ResetToken.eq(token))
            .one(&self.db)
            .await?;
        let Some(candidate) = candidate else {
            return Ok(false);
        };
        match candidate.reset_token_expires_at {
            Some(expires_at) if expires_at > now => {}
            _ => return Ok(false),
        }

        let password_hash = Auth::hash_password(new_password)?;
        let claim = user::ActiveModel {
            password_hash: Set(password_hash),
            reset_token: Set(None),
            reset_token_expires_at: Set(None),
            updated_at: Set(Some(now)),
            ..Default::default()
        };
        let claimed = user::Entity::update_many()
            .set(claim)
            .filter(user::Column::Id.eq(candidate.id))
            .filter(user::Column::ResetToken.eq(token))
            .filter(user::Column::ResetTokenExpiresAt.gt(now))
            .exec(&self.db)
            .await?;

        Ok(claimed.rows_affected == 1)
    }
}

/// URL-safe alphabet: the token travels inside a link.
fn generate_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
