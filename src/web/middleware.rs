//! Per-request scoping.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::policy::{AccessPolicy, Operacion};
use crate::roles::resolver_roles;
use crate::scope::ScopeCtx;

use super::RequestAdapter;

/// Resolves the scoping context for one request.
///
/// Runs the role resolver and the access policy once, before any repository
/// operation. Handlers receive the returned [`ScopeCtx`] and pass it down;
/// nothing downstream looks at the principal again.
///
/// # Errors
///
/// - [`Error::Unauthenticated`] when enforcement is on and no principal was
///   attached — before any scoping logic runs.
/// - [`Error::DelegacionSinResolver`] when the caller is allowed but has no
///   resolvable delegation for a scoped resource. The pipeline stops here;
///   there is no unscoped fallback and no default delegation.
/// - [`Error::Forbidden`] when the resolved roles do not satisfy the
///   operation's required role set.
///
/// # Examples
///
/// ```
/// use guias_core::web::{resolver_scope, RequestAdapter};
/// use guias_core::{AccessPolicy, Operacion, Principal, Recurso};
///
/// let policy = AccessPolicy::protegida();
/// let mut adapter = RequestAdapter::new("req-1".to_string());
/// adapter.set_principal(Some(Principal::con_rol("delegacion", Some(7))));
///
/// let scope = resolver_scope(&policy, &adapter, Operacion::leer(Recurso::Guias)).unwrap();
/// assert_eq!(scope.delegacion, Some(7));
/// ```
pub fn resolver_scope(
    policy: &AccessPolicy,
    adapter: &RequestAdapter,
    op: Operacion,
) -> Result<ScopeCtx> {
    let Some(principal) = adapter.principal() else {
        if policy.protegido() {
            return Err(Error::Unauthenticated);
        }
        // Development mode: unauthenticated callers get the open decision.
        return policy.decidir(&BTreeSet::new(), op, None).a_resultado(op);
    };

    let roles = resolver_roles(principal);
    let resultado = policy
        .decidir(&roles, op, principal.delegacion_id)
        .a_resultado(op);

    if let Err(err) = &resultado {
        tracing::debug!(
            request_id = %adapter.request_id(),
            operacion = %op.etiqueta(),
            error = %err,
            "acceso denegado"
        );
    }
    resultado
}
