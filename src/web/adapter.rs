//! Request adapter mapping HTTP requests to crate types.

use crate::principal::Principal;

/// Framework-agnostic view of one incoming request.
///
/// Intentionally simple owned data, so no framework request type leaks into
/// the core. Framework-specific code should implement `From<FrameworkRequest>`
/// for `RequestAdapter`.
///
/// # Examples
///
/// ```
/// use guias_core::web::RequestAdapter;
/// use guias_core::Principal;
///
/// let mut adapter = RequestAdapter::new("req-12345".to_string());
/// adapter.set_principal(Some(Principal::con_rol("delegacion", Some(7))));
/// assert_eq!(adapter.request_id(), "req-12345");
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    /// Unique request identifier (required, for tracing).
    request_id: String,
    /// Authenticated principal, set by the credential layer.
    principal: Option<Principal>,
}

impl RequestAdapter {
    /// Creates an adapter with only a request id; the principal is attached
    /// after authentication.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            principal: None,
        }
    }

    /// Sets the authenticated principal, typically from verified JWT claims.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the principal, if authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}
