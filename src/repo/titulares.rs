//! Titular catalog.

use sqlx::{QueryBuilder, SqlitePool};

use crate::error::{Error, Result};
use crate::fields::{TitularDraft, TitularPatch};
use crate::model::Titular;

/// Search cap: the listing is an autocomplete source, not a report.
const LIMITE: i64 = 200;

/// Searches titulares. An empty query lists the first page alphabetically;
/// otherwise the query matches cuit exactly or name fields by substring.
pub async fn buscar(pool: &SqlitePool, consulta: &str) -> Result<Vec<Titular>> {
    let consulta = consulta.trim();
    if consulta.is_empty() {
        let filas = sqlx::query_as::<_, Titular>(
            "SELECT * FROM titulares ORDER BY razon_social ASC, apellido ASC, nombre ASC LIMIT ?",
        )
        .bind(LIMITE)
        .fetch_all(pool)
        .await?;
        return Ok(filas);
    }

    let parecido = format!("%{consulta}%");
    let filas = sqlx::query_as::<_, Titular>(
        "SELECT * FROM titulares \
         WHERE cuit = ? OR razon_social LIKE ? OR nombre LIKE ? OR apellido LIKE ? \
         ORDER BY razon_social ASC, apellido ASC, nombre ASC LIMIT ?",
    )
    .bind(consulta)
    .bind(&parecido)
    .bind(&parecido)
    .bind(&parecido)
    .bind(LIMITE)
    .fetch_all(pool)
    .await?;
    Ok(filas)
}

/// Fetches one titular by id.
pub async fn por_id(pool: &SqlitePool, id: i64) -> Result<Titular> {
    sqlx::query_as::<_, Titular>("SELECT * FROM titulares WHERE id = ? LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound)
}

/// Creates a titular. At least a company name or a person name is required.
pub async fn crear(pool: &SqlitePool, draft: TitularDraft) -> Result<Titular> {
    let tiene_nombre = draft.razon_social.as_deref().is_some_and(|s| !s.is_empty())
        || draft.nombre.as_deref().is_some_and(|s| !s.is_empty())
        || draft.apellido.as_deref().is_some_and(|s| !s.is_empty());
    if !tiene_nombre {
        return Err(Error::validacion(
            "debe indicar razon_social o nombre/apellido",
        ));
    }

    let res = sqlx::query(
        "INSERT INTO titulares (razon_social, cuit, nombre, apellido) VALUES (?, ?, ?, ?)",
    )
    .bind(draft.razon_social)
    .bind(draft.cuit)
    .bind(draft.nombre)
    .bind(draft.apellido)
    .execute(pool)
    .await?;
    por_id(pool, res.last_insert_rowid()).await
}

/// Partially updates a titular and returns the fresh row.
pub async fn actualizar(pool: &SqlitePool, id: i64, patch: TitularPatch) -> Result<Titular> {
    if patch.esta_vacio() {
        return Err(Error::validacion("sin campos para actualizar"));
    }

    let mut qb = QueryBuilder::new("UPDATE titulares SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(v) = patch.razon_social {
            set.push("razon_social = ").push_bind_unseparated(v);
        }
        if let Some(v) = patch.cuit {
            set.push("cuit = ").push_bind_unseparated(v);
        }
        if let Some(v) = patch.nombre {
            set.push("nombre = ").push_bind_unseparated(v);
        }
        if let Some(v) = patch.apellido {
            set.push("apellido = ").push_bind_unseparated(v);
        }
    }
    qb.push(" WHERE id = ").push_bind(id);

    let res = qb.build().execute(pool).await?;
    if res.rows_affected() == 0 {
        return Err(Error::NotFound);
    }
    por_id(pool, id).await
}
