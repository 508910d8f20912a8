use thiserror::Error;

/// Domain error taxonomy. The API edge maps these onto HTTP statuses;
/// anything not listed there surfaces as a 500 with a generic body.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// Bad email or password. Deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Too many failed attempts; reported distinctly from bad credentials.
    #[error("account is temporarily locked")]
    LockedOut,
    #[error("tenant is inactive")]
    TenantInactive,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
    #[error("password hash error: {0}")]
    Hash(String),
}
