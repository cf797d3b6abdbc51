//! Bearer token authentication for the ledger routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, error::ApiError};
use ledgerly_core::accounts::UserRole;
use ledgerly_shared::{AppError, Claims};

fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

fn reject(err: AppError) -> Response {
    ApiError::from(err).into_response()
}

/// Validates the bearer token and stores its claims in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return reject(AppError::Unauthorized(
            "Authorization header with Bearer token is required".to_string(),
        ));
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            reject(AppError::from(e))
        }
    }
}

/// Authenticated caller, taken from the validated token claims.
///
/// Handlers pass [`AuthUser::user_id`] and [`AuthUser::role`] explicitly
/// into every ledger operation.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// The acting user.
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.0.user_id()
    }

    /// The caller's organization; every ledger query is scoped to it.
    #[must_use]
    pub fn organization_id(&self) -> Uuid {
        self.0.organization_id()
    }

    /// The caller's role. Unknown role names get the least privilege.
    #[must_use]
    pub fn role(&self) -> UserRole {
        UserRole::parse(&self.0.role).unwrap_or(UserRole::Viewer)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(role: &str) -> AuthUser {
        AuthUser(Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            role,
            Utc::now() + Duration::minutes(5),
        ))
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(user("approver").role(), UserRole::Approver);
        assert_eq!(user("owner").role(), UserRole::Owner);
        assert_eq!(user("superuser").role(), UserRole::Viewer);
    }
}
