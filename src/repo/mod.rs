//! Ownership-aware repository operations.
//!
//! Every function here takes the request's [`crate::ScopeCtx`] and applies
//! it as a WHERE constraint; there is no unscoped query path for
//! non-privileged callers. Multi-statement sequences (create + bridge row,
//! claim + link) run inside one transaction on one connection, committed on
//! success and rolled back on any error.
//!
//! The visibility predicate for scoped callers is always the same:
//! `delegacion_id = :propia OR delegacion_id IS NULL` — own rows plus
//! orphans. Orphans become owned through the one-way claim transition, which
//! is folded into the UPDATE statement itself so that concurrent claims
//! resolve to exactly one winner (the loser's UPDATE matches zero rows).

pub mod delegaciones;
pub mod documentos;
pub mod guias;
pub mod observaciones;
pub mod remitos;
pub mod titulares;

use sqlx::{QueryBuilder, Sqlite};

use crate::error::Error;
use crate::scope::ScopeCtx;

/// Outcome of a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actualizacion {
    /// Rows affected. Zero means the row was reassigned between the read
    /// and the write (a lost claim race) — not an error, but not a silent
    /// success either.
    pub cambiadas: u64,
    /// Whether this update claimed an orphan row for the caller.
    pub reclamada: bool,
}

/// Outcome of linking a remito to a guía.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vinculacion {
    /// Rows affected by the link write.
    pub cambiadas: u64,
    /// Whether the remito was claimed as part of the link.
    pub remito_reclamado: bool,
    /// Whether the guía was claimed as part of the link.
    pub guia_reclamada: bool,
}

/// Appends the row visibility predicate for scoped callers.
///
/// Privileged contexts see everything, so nothing is appended. The caller
/// must have already written a `WHERE` clause this can be AND-ed onto.
pub(crate) fn empujar_visibilidad(qb: &mut QueryBuilder<'_, Sqlite>, scope: &ScopeCtx) {
    if scope.privilegiado {
        return;
    }
    qb.push(" AND (delegacion_id = ")
        .push_bind(scope.delegacion)
        .push(" OR delegacion_id IS NULL)");
}

/// Maps a sqlx failure, surfacing unique-index violations as conflicts.
pub(crate) fn mapear_sqlx(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return Error::Conflicto;
        }
    }
    Error::Datastore(err)
}
