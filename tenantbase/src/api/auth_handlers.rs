use axum::{extract::State, http::StatusCode, response::Json};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use sea_orm::{ColumnTrait, QueryFilter};
use uuid::Uuid;

use crate::auth::NewRegistration;
use crate::entity::{tenant, user};
use crate::scope;

use super::{
    ApiErr, AppState,
    dto::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse, MessageResponse,
        RegisterRequest, ResetPasswordRequest, TenantResponse, UserResponse,
    },
    jwt::{AuthClaims, Claims, JwtConfig, encode_jwt},
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiErr> {
    let (_, created_user) = state
        .auth
        .register(NewRegistration {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            company_name: body.company_name,
            company_identifier: body.company_identifier,
        })
        .await?;

    let payload = issue_tokens(&created_user, &state.jwt)?;
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiErr> {
    let authed = state.auth.authenticate(&body.email, &body.password).await?;
    let payload = issue_tokens(&authed, &state.jwt)?;
    Ok(Json(payload))
}

pub async fn me(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, ApiErr> {
    let caller = claims.scope();
    let me = scope::users(&caller)
        .filter(user::Column::Id.eq(claims.sub))
        .one(&state.db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::new(StatusCode::UNAUTHORIZED, "Unknown user"))?;

    let owning_tenant = scope::tenants()
        .filter(tenant::Column::Id.eq(me.tenant_id))
        .one(&state.db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::new(StatusCode::UNAUTHORIZED, "Unknown tenant"))?;

    Ok(Json(MeResponse {
        user: UserResponse::from(me),
        tenant: TenantResponse::from(owning_tenant),
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiErr> {
    state.reset.request(&body.email).await?;
    // Identical response whether or not the address is registered.
    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent".to_string(),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiErr> {
    if body.new_password != body.confirm_password {
        return Err(ApiErr::new(
            StatusCode::BAD_REQUEST,
            "Passwords do not match",
        ));
    }

    let redeemed = state.reset.redeem(&body.token, &body.new_password).await?;
    if !redeemed {
        return Err(ApiErr::new(
            StatusCode::BAD_REQUEST,
            "Invalid or expired reset token",
        ));
    }

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

fn issue_tokens(authed: &user::Model, config: &JwtConfig) -> Result<AuthResponse, ApiErr> {
    let expires_at = Utc::now() + Duration::minutes(config.access_ttl_minutes);
    let claims = Claims {
        sub: authed.id,
        email: authed.email.clone(),
        name: authed.display_name(),
        tenant_id: authed.tenant_id,
        jti: Uuid::new_v4(),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        exp: expires_at.timestamp() as u64,
    };
    let access_token = encode_jwt(&claims, &config.secret).map_err(ApiErr::internal)?;

    Ok(AuthResponse {
        access_token,
        refresh_token: generate_refresh_token(),
        expires_at: expires_at.naive_utc(),
        user: UserResponse::from(authed.clone()),
    })
}

/// Opaque refresh token: 64 random bytes, base64.
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
