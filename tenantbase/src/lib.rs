//! TenantBase - multi-tenant SaaS backend boilerplate
//!
//! Tenant CRUD, registration/login with JWT issuance, and a single-use
//! password-reset flow over a SeaORM store with soft delete, audit
//! stamping and per-tenant row scoping.

pub mod api;
pub mod auth;
pub mod entity;
pub mod error;
pub mod notify;
pub mod reset;
pub mod scope;
pub mod tenants;
