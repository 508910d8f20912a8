use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::set_header::response::SetResponseHeaderLayer;

use crate::auth::Auth;
use crate::reset::PasswordReset;
use crate::tenants::Tenants;

pub mod auth_handlers;
pub mod dto;
pub mod jwt;
pub mod tenant_handlers;

// ---------- shared state ----------

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
    pub tenants: Arc<Tenants>,
    pub reset: Arc<PasswordReset>,
    pub db: DatabaseConnection,
    pub jwt: jwt::JwtConfig,
}

// ---------- error type ----------

/// A JSON error response: `{"error": "..."}` with an HTTP status.
pub struct ApiErr(StatusCode, String);

impl ApiErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(status, msg.into())
    }

    /// Unhandled-fault boundary: full detail goes to the server log; the
    /// body stays generic unless TB_DEBUG_ERRORS exposes it (development
    /// mode).
    pub fn internal(e: impl std::fmt::Display) -> Self {
        let detail = e.to_string();
        tracing::error!(error = %detail, "unhandled error");
        if debug_errors() {
            Self(StatusCode::INTERNAL_SERVER_ERROR, detail)
        } else {
            Self(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }
}

fn debug_errors() -> bool {
    std::env::var("TB_DEBUG_ERRORS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl From<crate::error::Error> for ApiErr {
    fn from(e: crate::error::Error) -> Self {
        use crate::error::Error;
        match e {
            Error::Validation(msg) => Self(StatusCode::BAD_REQUEST, msg),
            Error::Conflict(msg) => Self(StatusCode::CONFLICT, msg),
            Error::NotFound(msg) => Self(StatusCode::NOT_FOUND, msg),
            Error::InvalidCredentials => Self(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            Error::LockedOut => Self(
                StatusCode::UNAUTHORIZED,
                "Account is locked after too many failed attempts; try again later".to_string(),
            ),
            Error::TenantInactive => Self(
                StatusCode::UNAUTHORIZED,
                "Tenant account is inactive".to_string(),
            ),
            other => Self::internal(other),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

// ---------- router ----------

pub fn api_router(state: AppState) -> Router {
    let allowed_origins: Vec<HeaderValue> = std::env::var("TB_CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new() // no origins allowed = same-origin only
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api", api())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}

fn api() -> Router<AppState> {
    Router::new()
        // auth
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/forgot-password", post(auth_handlers::forgot_password))
        .route("/auth/reset-password", post(auth_handlers::reset_password))
        // tenants
        .route(
            "/tenants",
            get(tenant_handlers::list_tenants).post(tenant_handlers::create_tenant),
        )
        .route(
            "/tenants/{id}",
            get(tenant_handlers::get_tenant)
                .put(tenant_handlers::update_tenant)
                .delete(tenant_handlers::delete_tenant),
        )
        .route(
            "/tenants/identifier/{identifier}",
            get(tenant_handlers::identifier_exists),
        )
}
