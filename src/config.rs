//! Process-wide configuration.
//!
//! Resolved once at startup and passed explicitly into the components that
//! need it. Nothing in the crate reads the environment after this point; a
//! handler that needs the uploads directory receives it, it does not ask
//! the process for it.

use crate::policy::AccessPolicy;

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Datastore connection URL.
    pub database_url: String,
    /// Root directory for stored images.
    pub uploads_dir: String,
    /// Whether role enforcement is active (`PROTECT_API`). Off is for
    /// development only and grants every caller full access.
    pub proteger_api: bool,
}

impl Config {
    /// Reads configuration from the environment, with development defaults.
    ///
    /// `PROTECT_API` must be exactly `"true"` to enable enforcement; any
    /// other value (or absence) leaves the API open, mirroring how the
    /// deployment has always toggled it.
    pub fn desde_entorno() -> Self {
        let proteger_api = std::env::var("PROTECT_API").as_deref() == Ok("true");
        if proteger_api {
            tracing::info!("protección de API activada");
        } else {
            tracing::warn!("protección de API desactivada (solo desarrollo)");
        }
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            uploads_dir: std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            proteger_api,
        }
    }

    /// Builds the access policy implied by the protection toggle.
    pub fn policy(&self) -> AccessPolicy {
        if self.proteger_api {
            AccessPolicy::protegida()
        } else {
            AccessPolicy::abierta()
        }
    }
}
