//! The authenticated caller and its raw claims.

/// A raw role claim as it arrives on a verified credential.
///
/// Tokens minted by different issuers over the system's lifetime carry the
/// role in different shapes: a plain string, an array of strings, a legacy
/// numeric role id, or a nested object holding either the id or a
/// description. [`crate::roles::resolver_roles`] flattens all of them into
/// the canonical [`crate::roles::Rol`] set; nothing else in the crate looks
/// at raw claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRol {
    /// A single role name. May be a comma/whitespace-separated scope list
    /// (`"guias.read delegacion"`), split during normalization.
    Texto(String),
    /// An array of role names.
    Lista(Vec<String>),
    /// A legacy numeric role id from the roles table.
    Legado(u32),
    /// A nested role object, `{ idroles, dsc }` style.
    Objeto {
        /// Legacy numeric id, if the object carried one.
        id: Option<u32>,
        /// Role description, if the object carried one.
        descripcion: Option<String>,
    },
}

/// The authenticated caller.
///
/// Constructed once per request from a verified credential, immutable, and
/// discarded at request end. Carries only what scoping needs: the raw role
/// claims and the optional delegation claim. Everything user-facing (name,
/// email) stays in the credential layer.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    /// User id (`sub`), when the credential carries one. Used to attribute
    /// observations; never used for scoping.
    pub usuario_id: Option<i64>,
    /// Raw role claims in arrival order.
    pub claims: Vec<ClaimRol>,
    /// Delegation id claim, when present.
    pub delegacion_id: Option<i64>,
}

impl Principal {
    /// A principal with a single string role and a delegation claim — the
    /// common case for delegation-office tokens.
    pub fn con_rol(rol: impl Into<String>, delegacion_id: Option<i64>) -> Self {
        Self {
            usuario_id: None,
            claims: vec![ClaimRol::Texto(rol.into())],
            delegacion_id,
        }
    }
}
