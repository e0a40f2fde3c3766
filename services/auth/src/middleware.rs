//! Middleware for access token validation

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

use crate::{AppState, error::AuthError};

/// Extract the raw token from an `Authorization: Token <t>` or `Bearer <t>` header
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;

    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Validate the access token and reject revoked ones
///
/// On success the decoded [`common::jwt::Claims`] are stored in the request
/// extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_headers(req.headers()).ok_or(AuthError::Unauthorized)?;

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        info!("Rejected token: {}", e);
        AuthError::Unauthorized
    })?;

    let revoked = state
        .redis_pool
        .is_token_revoked(&claims.jti)
        .await
        .map_err(|e| {
            error!("Failed to check token revocation: {}", e);
            AuthError::Internal(e)
        })?;

    if revoked {
        return Err(AuthError::Unauthorized);
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_token_and_bearer_schemes() {
        assert_eq!(token_from_headers(&headers("Token abc")), Some("abc"));
        assert_eq!(token_from_headers(&headers("Bearer abc")), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(token_from_headers(&headers("Basic abc")), None);
        assert_eq!(token_from_headers(&headers("Token ")), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
