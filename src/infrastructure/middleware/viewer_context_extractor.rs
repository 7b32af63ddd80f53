// ViewerContext Extractor - hands the request's viewer to handlers

use crate::{error::AppError, infrastructure::viewer::ViewerContext};
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Cheap-to-clone handle on the request's `ViewerContext`.
///
/// ```ignore
/// async fn handler(vc: Vc) -> AppResult<Json<Value>> {
///     let author_id = vc.require_user()?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

// Deref so handlers can write vc.user_id, vc.is_authenticated(), etc.
impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        // Missing context means the middleware was not installed on this route.
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Internal("viewer context middleware not installed".to_string()));

        async move { vc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_vc_from_extensions() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(Arc::new(ViewerContext::authenticated_user(
            3,
            "linus".to_string(),
            false,
            "test-request".to_string(),
        )));

        let vc = Vc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(vc.request_id, "test-request");
        assert_eq!(vc.user_id, Some(3));
        assert_eq!(vc.arc().username.as_deref(), Some("linus"));
    }

    #[tokio::test]
    async fn test_vc_missing_is_internal_error() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let result = Vc::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
