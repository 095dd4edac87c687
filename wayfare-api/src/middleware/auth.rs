use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_core::{RequestContext, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// Bearer token claims issued by the identity service. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Extractor turning the bearer token into an explicit request context.
/// Handlers never see raw tokens, only the principal and role.
pub struct Auth(pub RequestContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(state.auth.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        let claims = token_data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Malformed subject claim".to_string()))?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("Unknown role: {}", claims.role)))?;

        Ok(Auth(RequestContext::new(user_id, role)))
    }
}

/// As [`Auth`], but additionally requires the admin role.
pub struct AdminAuth(pub RequestContext);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(ctx) = Auth::from_request_parts(parts, state).await?;
        if !ctx.is_admin() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminAuth(ctx))
    }
}
