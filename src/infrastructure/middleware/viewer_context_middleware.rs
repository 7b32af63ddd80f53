// ViewerContext Middleware - resolves the caller's identity once per request
// and injects it into request extensions for handlers

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::viewer::ViewerContext,
    models::AuthenticatedUser,
};

/// The authentication subsystem, as seen by this service: something that can
/// turn an opaque API token into a user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_token(&self, token: &str) -> AppResult<Option<AuthenticatedUser>>;
}

/// Middleware that creates the request-scoped viewer context.
/// Requests without credentials continue as anonymous; bad credentials are a 401.
pub async fn viewer_context_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let viewer_context = create_viewer_context(token, app_state.identity.as_ref()).await?;

    debug!(
        request_id = %viewer_context.request_id,
        user_id = ?viewer_context.user_id,
        "{} {}",
        request.method(),
        request.uri().path()
    );

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// Pulls the token out of `Authorization: Bearer <token>`.
/// No header means anonymous; any other scheme is rejected.
fn extract_bearer_token(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header.".to_string()))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header. Expected 'Bearer <token>'.".to_string(),
        )),
    }
}

async fn create_viewer_context(
    token: Option<String>,
    identity: &dyn IdentityProvider,
) -> AppResult<ViewerContext> {
    let request_id = format!("req-{}", Uuid::new_v4());

    let Some(token) = token else {
        return Ok(ViewerContext::anonymous(request_id));
    };

    match identity.resolve_token(&token).await? {
        Some(user) => Ok(ViewerContext::authenticated_user(
            user.id,
            user.username,
            user.is_staff,
            request_id,
        )),
        None => {
            warn!(request_id = %request_id, "Rejected request with unknown API token");
            Err(AppError::Unauthorized("Invalid token.".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct StaticIdentity;

    #[async_trait]
    impl IdentityProvider for StaticIdentity {
        async fn resolve_token(&self, token: &str) -> AppResult<Option<AuthenticatedUser>> {
            Ok((token == "good-token").then(|| AuthenticatedUser {
                id: 42,
                username: "grace".to_string(),
                is_staff: false,
            }))
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token123"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), Some("token123".to_string()));
    }

    #[test]
    fn test_extract_no_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert("authorization", HeaderValue::from_static("Bearer    "));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[tokio::test]
    async fn test_create_viewer_context() {
        let anonymous = create_viewer_context(None, &StaticIdentity).await.unwrap();
        assert!(!anonymous.is_authenticated());
        assert!(anonymous.request_id.starts_with("req-"));

        let known = create_viewer_context(Some("good-token".to_string()), &StaticIdentity)
            .await
            .unwrap();
        assert_eq!(known.user_id, Some(42));
        assert_eq!(known.username.as_deref(), Some("grace"));

        let unknown = create_viewer_context(Some("stale".to_string()), &StaticIdentity).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }
}
