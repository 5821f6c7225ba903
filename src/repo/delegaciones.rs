//! Delegación catalog.
//!
//! Not delegation-owned data — who may call these is decided entirely by
//! the access policy, so no scope parameter appears here.

use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::model::Delegacion;

/// Lists every delegation, by name.
pub async fn listar(pool: &SqlitePool) -> Result<Vec<Delegacion>> {
    let filas = sqlx::query_as::<_, Delegacion>("SELECT * FROM delegaciones ORDER BY nombre ASC")
        .fetch_all(pool)
        .await?;
    Ok(filas)
}

/// Fetches one delegation by id.
pub async fn por_id(pool: &SqlitePool, id: i64) -> Result<Delegacion> {
    sqlx::query_as::<_, Delegacion>("SELECT * FROM delegaciones WHERE id = ? LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound)
}

/// Creates a delegation. Name and email are both required.
pub async fn crear(pool: &SqlitePool, nombre: &str, email: &str) -> Result<i64> {
    if nombre.trim().is_empty() || email.trim().is_empty() {
        return Err(Error::validacion("nombre y email son obligatorios"));
    }
    let res = sqlx::query("INSERT INTO delegaciones (nombre, email) VALUES (?, ?)")
        .bind(nombre.trim())
        .bind(email.trim())
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}
