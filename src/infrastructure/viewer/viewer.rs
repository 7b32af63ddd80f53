// ViewerContext - who is making the current request

use crate::error::{AppError, AppResult};

/// Request-scoped identity produced by the authentication middleware.
/// Business logic only ever sees this, never headers or tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub request_id: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub is_staff: bool,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        ViewerContext {
            request_id,
            user_id: None,
            username: None,
            is_staff: false,
        }
    }

    pub fn authenticated_user(
        user_id: i64,
        username: String,
        is_staff: bool,
        request_id: String,
    ) -> Self {
        ViewerContext {
            request_id,
            user_id: Some(user_id),
            username: Some(username),
            is_staff,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The caller's user id, or 401 for anonymous requests.
    pub fn require_user(&self) -> AppResult<i64> {
        self.user_id.ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })
    }
}
