//! Request-scoped visibility context.

/// The resolved scoping context attached to a request.
///
/// Derived once per request by [`crate::policy::AccessPolicy::decidir`] and
/// consumed by every repository operation. Not persisted.
///
/// Invariants:
/// - `privilegiado` ⇒ `delegacion` is ignored for read visibility (full
///   access); an explicit target may still be supplied for writes.
/// - not `privilegiado` ⇒ `delegacion` is `Some`, guaranteed by the policy
///   (a non-privileged caller without one is rejected before any repository
///   operation runs), except on resources that are not delegation-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeCtx {
    /// Bypasses delegation scoping for reads.
    pub privilegiado: bool,
    /// The caller's delegation, when scoped.
    pub delegacion: Option<i64>,
    /// May supply an explicit target delegation on writes (admin,
    /// recaudación). A plain delegación can never override its own id.
    pub puede_redirigir: bool,
}

impl ScopeCtx {
    /// Full access: privileged and allowed to redirect writes.
    pub fn total() -> Self {
        Self {
            privilegiado: true,
            delegacion: None,
            puede_redirigir: true,
        }
    }

    /// Read-privileged, non-redirecting context (control/auditor/central).
    pub fn lectura_privilegiada() -> Self {
        Self {
            privilegiado: true,
            delegacion: None,
            puede_redirigir: false,
        }
    }

    /// Context scoped to one delegation.
    pub fn de_delegacion(id: i64) -> Self {
        Self {
            privilegiado: false,
            delegacion: Some(id),
            puede_redirigir: false,
        }
    }

    /// Resolves the target delegation for a create/update.
    ///
    /// An explicit target wins only when the caller may redirect; otherwise
    /// the caller's own delegation applies. `None` means the row is written
    /// unassigned (orphan), which only privileged callers may end up doing.
    pub fn destino(&self, explicita: Option<i64>) -> Option<i64> {
        if self.puede_redirigir {
            explicita.or(self.delegacion)
        } else {
            self.delegacion
        }
    }

    /// In-memory form of the row visibility predicate: own rows plus
    /// orphans, or everything when privileged.
    pub fn es_visible(&self, delegacion_fila: Option<i64>) -> bool {
        if self.privilegiado {
            return true;
        }
        match delegacion_fila {
            None => true,
            Some(d) => Some(d) == self.delegacion,
        }
    }
}
