// Permission rules - request-level and object-level access control
// Each resource declares a policy (an ordered list of rules); every rule must allow.

use axum::http::Method;

use crate::{
    error::{AppError, AppResult},
    infrastructure::viewer::ViewerContext,
};

/// Outcome of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResult {
    Allow,
    Deny,
}

/// A composable access rule.
pub trait PermissionRule: Send + Sync {
    /// Rule name for logging.
    fn name(&self) -> &'static str;

    /// Checked before the target object is loaded.
    fn has_permission(&self, _viewer: &ViewerContext, _method: &Method) -> PermissionResult {
        PermissionResult::Allow
    }

    /// Checked once the object is loaded; `owner_id` is its recorded author.
    fn has_object_permission(
        &self,
        _viewer: &ViewerContext,
        _method: &Method,
        _owner_id: i64,
    ) -> PermissionResult {
        PermissionResult::Allow
    }
}

/// GET, HEAD and OPTIONS never mutate.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Owner-write predicate: only the recorded author may mutate.
pub fn can_write(viewer: &ViewerContext, author_id: i64) -> bool {
    viewer.user_id == Some(author_id)
}

/// Reads are open, anything else needs an authenticated caller.
pub struct IsAuthenticatedOrReadOnly;

impl PermissionRule for IsAuthenticatedOrReadOnly {
    fn name(&self) -> &'static str {
        "is_authenticated_or_read_only"
    }

    fn has_permission(&self, viewer: &ViewerContext, method: &Method) -> PermissionResult {
        if is_safe_method(method) || viewer.is_authenticated() {
            PermissionResult::Allow
        } else {
            PermissionResult::Deny
        }
    }
}

/// Object-level: reads are open, mutations only by the author.
pub struct IsAuthorOrReadOnly;

impl PermissionRule for IsAuthorOrReadOnly {
    fn name(&self) -> &'static str {
        "is_author_or_read_only"
    }

    fn has_object_permission(
        &self,
        viewer: &ViewerContext,
        method: &Method,
        owner_id: i64,
    ) -> PermissionResult {
        if is_safe_method(method) || can_write(viewer, owner_id) {
            PermissionResult::Allow
        } else {
            PermissionResult::Deny
        }
    }
}

/// Every method needs an authenticated caller.
pub struct IsAuthenticated;

impl PermissionRule for IsAuthenticated {
    fn name(&self) -> &'static str {
        "is_authenticated"
    }

    fn has_permission(&self, viewer: &ViewerContext, _method: &Method) -> PermissionResult {
        if viewer.is_authenticated() {
            PermissionResult::Allow
        } else {
            PermissionResult::Deny
        }
    }
}

/// Ordered rule set attached to a resource.
#[derive(Clone, Copy)]
pub struct PermissionPolicy {
    rules: &'static [&'static dyn PermissionRule],
}

impl PermissionPolicy {
    pub const fn new(rules: &'static [&'static dyn PermissionRule]) -> Self {
        Self { rules }
    }

    pub fn check_request(&self, viewer: &ViewerContext, method: &Method) -> AppResult<()> {
        for rule in self.rules {
            if rule.has_permission(viewer, method) == PermissionResult::Deny {
                return Err(denied(viewer, method, rule.name()));
            }
        }
        Ok(())
    }

    pub fn check_object(&self, viewer: &ViewerContext, method: &Method, owner_id: i64) -> AppResult<()> {
        for rule in self.rules {
            if rule.has_object_permission(viewer, method, owner_id) == PermissionResult::Deny {
                return Err(denied(viewer, method, rule.name()));
            }
        }
        Ok(())
    }
}

// Anonymous callers get 401 so they know to authenticate; known callers get 403.
fn denied(viewer: &ViewerContext, method: &Method, rule: &str) -> AppError {
    tracing::debug!(
        request_id = %viewer.request_id,
        user_id = ?viewer.user_id,
        rule,
        "{} denied",
        method
    );
    if viewer.is_authenticated() {
        AppError::Forbidden("You do not have permission to perform this action.".to_string())
    } else {
        AppError::Unauthorized("Authentication credentials were not provided.".to_string())
    }
}

pub const CATEGORY_POLICY: PermissionPolicy = PermissionPolicy::new(&[&IsAuthenticatedOrReadOnly]);
pub const TAG_POLICY: PermissionPolicy = PermissionPolicy::new(&[&IsAuthenticatedOrReadOnly]);
pub const POST_POLICY: PermissionPolicy =
    PermissionPolicy::new(&[&IsAuthenticatedOrReadOnly, &IsAuthorOrReadOnly]);
// No ownership rule: any authenticated user may edit or delete a comment.
pub const COMMENT_POLICY: PermissionPolicy = PermissionPolicy::new(&[&IsAuthenticatedOrReadOnly]);
pub const PROFILE_POLICY: PermissionPolicy = PermissionPolicy::new(&[&IsAuthenticated]);
