//! Free-text observations on guías.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::model::Observacion;
use crate::scope::ScopeCtx;

use super::guias;

/// Lists a guía's observations, newest first. The parent guía must be
/// visible to the caller.
pub async fn listar_por_guia(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    guia_id: i64,
) -> Result<Vec<Observacion>> {
    guias::buscar_por_id(pool, scope, guia_id)
        .await?
        .ok_or(Error::NotFound)?;

    let filas = sqlx::query_as::<_, Observacion>(
        "SELECT * FROM guias_observaciones WHERE guia_id = ? ORDER BY fecha DESC",
    )
    .bind(guia_id)
    .fetch_all(pool)
    .await?;
    Ok(filas)
}

/// Adds an observation to a visible guía. The authoring user id comes from
/// the credential when present; anonymous notes are kept, not rejected.
pub async fn crear(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    usuario_id: Option<i64>,
    guia_id: i64,
    texto: &str,
) -> Result<i64> {
    let texto = texto.trim();
    if texto.is_empty() {
        return Err(Error::validacion("la observación es requerida"));
    }
    guias::buscar_por_id(pool, scope, guia_id)
        .await?
        .ok_or(Error::NotFound)?;

    let res = sqlx::query(
        "INSERT INTO guias_observaciones (guia_id, usuario_id, texto, fecha) VALUES (?, ?, ?, ?)",
    )
    .bind(guia_id)
    .bind(usuario_id)
    .bind(texto)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}
