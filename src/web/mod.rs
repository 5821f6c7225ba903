//! Framework-agnostic request boundary.
//!
//! This module is the seam between whatever HTTP layer surrounds the crate
//! and the scoping logic. It contains no framework-specific code; a router
//! integration builds a [`RequestAdapter`] from its own request type and
//! hands it to [`resolver_scope`].
//!
//! # Design Principles
//!
//! 1. **Authentication upstream**: the credential layer verifies the token
//!    and sets the principal on the adapter. An adapter with no principal is
//!    an unauthenticated request.
//! 2. **Scoping before data access**: [`resolver_scope`] runs once per
//!    request and must have produced a [`crate::ScopeCtx`] before any
//!    repository operation is invoked.
//! 3. **No silent defaults**: a non-privileged caller whose delegation
//!    cannot be resolved stops the pipeline with a 400-class error. The
//!    middleware never falls back to "unscoped" (cross-delegation leak) nor
//!    to a fixed delegation (ownership corruption).

mod adapter;
mod middleware;

pub use adapter::RequestAdapter;
pub use middleware::resolver_scope;
