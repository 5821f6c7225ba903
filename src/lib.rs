//! Delegation-scoped authorization and document tracking core.
//!
//! This crate is the business core of a backend that tracks paper-document
//! chains — guías and remitos — issued to regional offices (delegaciones).
//! Its center of gravity is the scoping layer: per request, it decides which
//! rows the caller may see or mutate, reconciles orphan (unassigned) rows
//! through one-way claim transitions, and lets privileged roles bypass
//! scoping — in exactly one place instead of once per resource handler.
//!
//! # Core Types
//!
//! - [`Principal`]: the authenticated caller with its raw role claims
//! - [`Rol`] / [`resolver_roles`]: the canonical role taxonomy and the
//!   single normalization pipeline feeding it
//! - [`AccessPolicy`]: required-role table, admin bypass, read-privilege
//!   allow-list
//! - [`ScopeCtx`]: the resolved per-request scoping context
//! - [`repo`]: ownership-aware repository operations over the datastore
//!
//! # Examples
//!
//! ```
//! use guias_core::{AccessPolicy, Decision, Operacion, Principal, Recurso, resolver_roles};
//!
//! let policy = AccessPolicy::protegida();
//! let principal = Principal::con_rol("ROLE_Delegación", Some(7));
//!
//! let roles = resolver_roles(&principal);
//! let decision = policy.decidir(&roles, Operacion::leer(Recurso::Guias), principal.delegacion_id);
//!
//! match decision {
//!     Decision::Permitido(scope) => {
//!         assert_eq!(scope.delegacion, Some(7));
//!         assert!(!scope.privilegiado);
//!     }
//!     Decision::Denegado(_) => unreachable!("delegación con claim resuelve"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entregas;
pub mod error;
pub mod fields;
pub mod filestore;
pub mod gps;
pub mod imagenes;
pub mod model;
pub mod notify;
pub mod policy;
pub mod principal;
pub mod repo;
pub mod report;
pub mod roles;
pub mod schema;
pub mod scope;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};
pub use policy::{AccessPolicy, Accion, Decision, Denegacion, Operacion, Recurso};
pub use principal::{ClaimRol, Principal};
pub use roles::{resolver_roles, Rol};
pub use scope::ScopeCtx;
