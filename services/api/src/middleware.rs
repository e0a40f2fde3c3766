//! Authentication middleware for access token validation
//!
//! Every request passes through [`auth_middleware`]. Requests without an
//! `Authorization` header continue anonymously; requests with one must carry
//! a valid, unrevoked token. Handlers then pick [`AuthUser`] (login required)
//! or [`MaybeUser`] (login optional) as an extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use common::role::Role;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Reject anyone but administrators
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Reject anyone but the given owner
    pub fn require_owner(&self, owner_id: Uuid) -> ApiResult<()> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// The viewer, if the request was authenticated
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

/// Outcome of inspecting the `Authorization` header
#[derive(Debug, PartialEq)]
enum Credentials<'a> {
    Anonymous,
    Token(&'a str),
    Malformed,
}

fn credentials(headers: &HeaderMap) -> Credentials<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Credentials::Anonymous;
    };

    value
        .to_str()
        .ok()
        .and_then(|header| {
            header
                .strip_prefix("Token ")
                .or_else(|| header.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map_or(Credentials::Malformed, Credentials::Token)
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match credentials(req.headers()) {
        Credentials::Anonymous => None,
        Credentials::Malformed => return Err(ApiError::Unauthorized),
        Credentials::Token(token) => Some(token.to_string()),
    };
    let Some(token) = token else {
        return Ok(next.run(req).await);
    };

    let claims = state.jwt_service.validate_token(&token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })?;

    let revoked = state
        .redis_pool
        .is_token_revoked(&claims.jti)
        .await
        .map_err(|e| {
            error!("Failed to check token revocation: {}", e);
            ApiError::Internal(e)
        })?;

    if revoked {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}
