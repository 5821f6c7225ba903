//! Guía repository.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::error::{Error, Result};
use crate::fields::{GuiaDraft, GuiaPatch};
use crate::model::{EstadoGuia, Guia};
use crate::scope::ScopeCtx;

use super::{empujar_visibilidad, mapear_sqlx, Actualizacion};

/// Filter for guía listings. All criteria compose with the caller's
/// visibility predicate; none can widen it.
#[derive(Debug, Clone, Default)]
pub struct GuiaFiltro {
    /// Exact document number.
    pub numero: Option<String>,
    /// Only rows without an emission date (undelivered stock).
    pub sin_fecha_emision: bool,
    /// Only rows without an expiry date (unused).
    pub no_usadas: bool,
    /// Order orphans first — for "available to claim" listings only.
    pub huerfanas_primero: bool,
}

/// Lists the guías visible to the caller.
///
/// Privileged contexts see every row; scoped contexts see their own rows
/// plus orphans. Default order is by numero; stock listings order by load
/// date, orphan-first when requested.
pub async fn listar(pool: &SqlitePool, scope: &ScopeCtx, filtro: &GuiaFiltro) -> Result<Vec<Guia>> {
    let mut qb = QueryBuilder::new("SELECT * FROM guias WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    if let Some(numero) = filtro.numero.clone() {
        qb.push(" AND numero = ").push_bind(numero);
    }
    if filtro.sin_fecha_emision {
        qb.push(" AND fecha_emision IS NULL");
    }
    if filtro.no_usadas {
        qb.push(" AND fecha_vencimiento IS NULL");
    }
    if filtro.huerfanas_primero {
        qb.push(" ORDER BY (delegacion_id IS NULL) DESC, fecha_carga ASC");
    } else if filtro.sin_fecha_emision || filtro.no_usadas {
        qb.push(" ORDER BY fecha_carga ASC");
    } else {
        qb.push(" ORDER BY numero ASC");
    }
    let filas = qb.build_query_as::<Guia>().fetch_all(pool).await?;
    Ok(filas)
}

/// Lists only the visible document numbers.
pub async fn numeros(pool: &SqlitePool, scope: &ScopeCtx) -> Result<Vec<String>> {
    let mut qb = QueryBuilder::new("SELECT numero FROM guias WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    qb.push(" ORDER BY numero ASC");
    let numeros = qb.build_query_scalar::<String>().fetch_all(pool).await?;
    Ok(numeros)
}

/// Fetches one guía by id under the caller's visibility.
pub async fn por_id(pool: &SqlitePool, scope: &ScopeCtx, id: i64) -> Result<Guia> {
    buscar_por_id(pool, scope, id).await?.ok_or(Error::NotFound)
}

/// Fetches one guía by numero under the caller's visibility.
pub async fn por_numero(pool: &SqlitePool, scope: &ScopeCtx, numero: &str) -> Result<Guia> {
    let mut qb = QueryBuilder::new("SELECT * FROM guias WHERE numero = ");
    qb.push_bind(numero.to_string());
    empujar_visibilidad(&mut qb, scope);
    qb.push(" LIMIT 1");
    let fila = qb.build_query_as::<Guia>().fetch_optional(pool).await?;
    fila.ok_or(Error::NotFound)
}

/// Visibility-constrained point lookup, shared with other repositories.
pub(crate) async fn buscar_por_id<'c, E>(
    ejecutor: E,
    scope: &ScopeCtx,
    id: i64,
) -> Result<Option<Guia>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let mut qb = QueryBuilder::new("SELECT * FROM guias WHERE id = ");
    qb.push_bind(id);
    empujar_visibilidad(&mut qb, scope);
    qb.push(" LIMIT 1");
    let fila = qb.build_query_as::<Guia>().fetch_optional(ejecutor).await?;
    Ok(fila)
}

/// Creates a guía.
///
/// The target delegation is the draft's explicit id when the caller may
/// redirect, else the caller's own delegation. Orphan creation (no target)
/// is reserved to privileged callers. The scoped-uniqueness pre-check and
/// the insert share one transaction; under a concurrent duplicate the
/// unique index still wins and surfaces as [`Error::Conflicto`].
pub async fn crear(pool: &SqlitePool, scope: &ScopeCtx, draft: GuiaDraft) -> Result<i64> {
    let destino = scope.destino(draft.delegacion_id);
    if destino.is_none() && !scope.privilegiado {
        return Err(Error::DelegacionSinResolver);
    }
    let mut tx = pool.begin().await?;
    let id = insertar(&mut tx, destino, &draft).await?;
    tx.commit().await?;
    Ok(id)
}

/// Insert within a caller-owned transaction (create and delivery batches).
pub(crate) async fn insertar(
    tx: &mut Transaction<'_, Sqlite>,
    destino: Option<i64>,
    draft: &GuiaDraft,
) -> Result<i64> {
    let numero = match draft.numero.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => return Err(Error::validacion("numero es requerido")),
    };

    let duplicada: Option<i64> = match destino {
        Some(d) => {
            sqlx::query_scalar("SELECT id FROM guias WHERE numero = ? AND delegacion_id = ? LIMIT 1")
                .bind(&numero)
                .bind(d)
                .fetch_optional(&mut **tx)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT id FROM guias WHERE numero = ? AND delegacion_id IS NULL LIMIT 1")
                .bind(&numero)
                .fetch_optional(&mut **tx)
                .await?
        }
    };
    if duplicada.is_some() {
        return Err(Error::Conflicto);
    }

    let fecha_carga = draft.fecha_carga.unwrap_or_else(|| Utc::now().naive_utc());
    let estado = draft
        .estado
        .unwrap_or_else(|| EstadoGuia::por_devolucion(draft.devuelta).codigo());

    let res = sqlx::query(
        "INSERT INTO guias (numero, fecha_emision, fecha_vencimiento, fecha_carga, \
         fecha_entrega, en_deposito, devuelta, informada, titular, destino, titular_id, \
         delegacion_id, estado) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&numero)
    .bind(draft.fecha_emision)
    .bind(draft.fecha_vencimiento)
    .bind(fecha_carga)
    .bind(draft.fecha_entrega)
    .bind(draft.en_deposito)
    .bind(draft.devuelta)
    .bind(draft.informada)
    .bind(draft.titular.clone())
    .bind(draft.destino.clone())
    .bind(draft.titular_id)
    .bind(destino)
    .bind(estado)
    .execute(&mut **tx)
    .await
    .map_err(mapear_sqlx)?;
    let id = res.last_insert_rowid();

    if let Some(d) = destino {
        sqlx::query("INSERT INTO guias_delegaciones (guia_id, delegacion_id) VALUES (?, ?)")
            .bind(id)
            .bind(d)
            .execute(&mut **tx)
            .await?;
    }
    Ok(id)
}

/// Partially updates a guía.
///
/// The row is loaded under the caller's visibility (404 otherwise). When it
/// is an orphan and the caller is scoped, the update claims it in the same
/// statement — and the statement's WHERE re-applies the visibility
/// predicate, so if another delegation claimed the row in between, this
/// update affects zero rows instead of stealing it.
pub async fn actualizar_parcial(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    id: i64,
    patch: GuiaPatch,
) -> Result<Actualizacion> {
    if patch.esta_vacio() {
        return Err(Error::validacion("sin campos para actualizar"));
    }

    let mut tx = pool.begin().await?;
    let guia = buscar_por_id(&mut *tx, scope, id)
        .await?
        .ok_or(Error::NotFound)?;

    // Explicit delegation targets are honored only with redirect permission;
    // for everyone else the field was never in their allow-list.
    let redireccion = if scope.puede_redirigir {
        patch.delegacion_id
    } else {
        None
    };
    let reclamar = !scope.privilegiado
        && guia.delegacion_id.is_none()
        && scope.delegacion.is_some()
        && redireccion.is_none();
    let estado = patch
        .estado
        .or_else(|| patch.devuelta.map(|d| EstadoGuia::por_devolucion(d).codigo()));

    let mut qb = QueryBuilder::new("UPDATE guias SET ");
    let mut campos = 0usize;
    {
        let mut set = qb.separated(", ");
        if let Some(v) = patch.fecha_emision {
            set.push("fecha_emision = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.fecha_vencimiento {
            set.push("fecha_vencimiento = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.fecha_entrega {
            set.push("fecha_entrega = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.fecha_carga {
            set.push("fecha_carga = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.en_deposito {
            set.push("en_deposito = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.devuelta {
            set.push("devuelta = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.informada {
            set.push("informada = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.titular.clone() {
            set.push("titular = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.destino.clone() {
            set.push("destino = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.titular_id {
            set.push("titular_id = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = estado {
            set.push("estado = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = redireccion {
            set.push("delegacion_id = ").push_bind_unseparated(v);
            campos += 1;
        } else if reclamar {
            set.push("delegacion_id = ")
                .push_bind_unseparated(scope.delegacion);
            campos += 1;
        }
    }

    if campos == 0 {
        // Every supplied key was outside the caller's allow-list.
        return Err(Error::validacion("sin campos para actualizar"));
    }

    qb.push(" WHERE id = ").push_bind(id);
    empujar_visibilidad(&mut qb, scope);

    let res = qb.build().execute(&mut *tx).await.map_err(mapear_sqlx)?;
    tx.commit().await?;

    Ok(Actualizacion {
        cambiadas: res.rows_affected(),
        reclamada: reclamar && res.rows_affected() > 0,
    })
}
