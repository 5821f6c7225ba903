use thiserror::Error;

/// Errors produced by scoping, policy and repository operations.
///
/// Every variant maps to a stable HTTP status class via [`Error::status`].
/// Two deliberate distinctions are encoded here:
///
/// - [`Error::DelegacionSinResolver`] is NOT a permission failure. It means a
///   non-privileged caller has no resolvable delegation and must be told so
///   (a 400, not a 403).
/// - [`Error::NotFound`] covers both "row does not exist" and "row belongs to
///   another delegation". Collapsing them prevents a caller from probing
///   which ids exist outside their scope.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credential, before any scoping logic runs.
    #[error("autenticación requerida")]
    Unauthenticated,

    /// Non-privileged caller with no resolvable delegation id.
    #[error("no se pudo determinar tu delegación")]
    DelegacionSinResolver,

    /// Resolved roles do not satisfy the operation's required role set.
    #[error("forbidden: {info}")]
    Forbidden {
        /// `recurso:accion` tag identifying the denied operation.
        info: String,
    },

    /// Row missing or outside the caller's visible scope.
    #[error("no encontrado")]
    NotFound,

    /// The target guía of a link operation is not in the caller's scope.
    ///
    /// Kept distinct from [`Error::NotFound`] so a failed link tells the
    /// caller which side of the pair was rejected.
    #[error("la guía no pertenece a tu delegación")]
    GuiaFueraDeAlcance,

    /// Scoped-uniqueness violation on create.
    #[error("ya existe un documento con ese número en esa delegación")]
    Conflicto,

    /// Missing required field or malformed input.
    #[error("{0}")]
    Validacion(String),

    /// Unexpected datastore failure. Displays generically; the underlying
    /// error is preserved as `source` for logging, never for the caller.
    #[error("error interno")]
    Datastore(#[from] sqlx::Error),

    /// Unexpected file-store failure. Same policy as [`Error::Datastore`].
    #[error("error interno")]
    Almacen(#[from] std::io::Error),
}

impl Error {
    /// HTTP status code class for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthenticated => 401,
            Error::DelegacionSinResolver => 400,
            Error::Forbidden { .. } => 403,
            Error::NotFound => 404,
            Error::GuiaFueraDeAlcance => 400,
            Error::Conflicto => 409,
            Error::Validacion(_) => 400,
            Error::Datastore(_) | Error::Almacen(_) => 500,
        }
    }

    /// Builds a [`Error::Forbidden`] tagged `recurso:accion`.
    pub fn forbidden(recurso: &str, accion: &str) -> Self {
        Error::Forbidden {
            info: format!("{recurso}:{accion}"),
        }
    }

    /// Builds a [`Error::Validacion`] from any message.
    pub fn validacion(msg: impl Into<String>) -> Self {
        Error::Validacion(msg.into())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
