//! Remito repository.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::error::{Error, Result};
use crate::fields::{RemitoDraft, RemitoPatch};
use crate::model::Remito;
use crate::scope::ScopeCtx;

use super::{empujar_visibilidad, guias, mapear_sqlx, Actualizacion, Vinculacion};

/// Filter for remito listings.
#[derive(Debug, Clone, Default)]
pub struct RemitoFiltro {
    /// Exact document number.
    pub numero: Option<String>,
    /// Only rows not yet linked to any guía.
    pub no_usados: bool,
    /// Order orphans first — for "available to claim" listings only.
    pub huerfanos_primero: bool,
}

/// Lists the remitos visible to the caller.
pub async fn listar(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    filtro: &RemitoFiltro,
) -> Result<Vec<Remito>> {
    let mut qb = QueryBuilder::new("SELECT * FROM remitos WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    if let Some(numero) = filtro.numero.clone() {
        qb.push(" AND numero = ").push_bind(numero);
    }
    if filtro.no_usados {
        qb.push(" AND guia_numero IS NULL AND guia_id IS NULL");
    }
    if filtro.huerfanos_primero {
        qb.push(" ORDER BY (delegacion_id IS NULL) DESC, numero ASC");
    } else {
        qb.push(" ORDER BY numero ASC");
    }
    let filas = qb.build_query_as::<Remito>().fetch_all(pool).await?;
    Ok(filas)
}

/// Fetches one remito by numero under the caller's visibility.
pub async fn por_numero(pool: &SqlitePool, scope: &ScopeCtx, numero: &str) -> Result<Remito> {
    let mut qb = QueryBuilder::new("SELECT * FROM remitos WHERE numero = ");
    qb.push_bind(numero.to_string());
    empujar_visibilidad(&mut qb, scope);
    qb.push(" LIMIT 1");
    let fila = qb.build_query_as::<Remito>().fetch_optional(pool).await?;
    fila.ok_or(Error::NotFound)
}

/// Fetches one remito by id under the caller's visibility.
pub async fn por_id(pool: &SqlitePool, scope: &ScopeCtx, id: i64) -> Result<Remito> {
    buscar_por_id(pool, scope, id).await?.ok_or(Error::NotFound)
}

/// Visibility-constrained point lookup, shared with other repositories.
pub(crate) async fn buscar_por_id<'c, E>(
    ejecutor: E,
    scope: &ScopeCtx,
    id: i64,
) -> Result<Option<Remito>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let mut qb = QueryBuilder::new("SELECT * FROM remitos WHERE id = ");
    qb.push_bind(id);
    empujar_visibilidad(&mut qb, scope);
    qb.push(" LIMIT 1");
    let fila = qb.build_query_as::<Remito>().fetch_optional(ejecutor).await?;
    Ok(fila)
}

/// Creates a remito. Same target-resolution and uniqueness rules as
/// [`guias::crear`](super::guias::crear).
pub async fn crear(pool: &SqlitePool, scope: &ScopeCtx, draft: RemitoDraft) -> Result<i64> {
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
    draft: &RemitoDraft,
) -> Result<i64> {
    let numero = match draft.numero.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => return Err(Error::validacion("numero es requerido")),
    };

    let duplicado: Option<i64> = match destino {
        Some(d) => {
            sqlx::query_scalar("SELECT id FROM remitos WHERE numero = ? AND delegacion_id = ? LIMIT 1")
                .bind(&numero)
                .bind(d)
                .fetch_optional(&mut **tx)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT id FROM remitos WHERE numero = ? AND delegacion_id IS NULL LIMIT 1")
                .bind(&numero)
                .fetch_optional(&mut **tx)
                .await?
        }
    };
    if duplicado.is_some() {
        return Err(Error::Conflicto);
    }

    let fecha_carga = draft.fecha_carga.unwrap_or_else(|| Utc::now().naive_utc());

    let res = sqlx::query(
        "INSERT INTO remitos (numero, fecha_vencimiento, guia_numero, fecha_carga, \
         fecha_devolucion, devuelto, delegacion_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&numero)
    .bind(draft.fecha_vencimiento)
    .bind(draft.guia_numero.clone())
    .bind(fecha_carga)
    .bind(draft.fecha_devolucion)
    .bind(draft.devuelto)
    .bind(destino)
    .execute(&mut **tx)
    .await
    .map_err(mapear_sqlx)?;
    Ok(res.last_insert_rowid())
}

/// Partially updates a remito, with the same claim semantics as
/// [`guias::actualizar_parcial`](super::guias::actualizar_parcial).
pub async fn actualizar_parcial(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    id: i64,
    patch: RemitoPatch,
) -> Result<Actualizacion> {
    if patch.esta_vacio() {
        return Err(Error::validacion("sin campos para actualizar"));
    }

    let mut tx = pool.begin().await?;
    let remito = buscar_por_id(&mut *tx, scope, id)
        .await?
        .ok_or(Error::NotFound)?;

    let redireccion = if scope.puede_redirigir {
        patch.delegacion_id
    } else {
        None
    };
    let reclamar = !scope.privilegiado
        && remito.delegacion_id.is_none()
        && scope.delegacion.is_some()
        && redireccion.is_none();

    let mut qb = QueryBuilder::new("UPDATE remitos SET ");
    let mut campos = 0usize;
    {
        let mut set = qb.separated(", ");
        if let Some(v) = patch.fecha_vencimiento {
            set.push("fecha_vencimiento = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.guia_numero.clone() {
            set.push("guia_numero = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.fecha_carga {
            set.push("fecha_carga = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.fecha_devolucion {
            set.push("fecha_devolucion = ").push_bind_unseparated(v);
            campos += 1;
        }
        if let Some(v) = patch.devuelto {
            set.push("devuelto = ").push_bind_unseparated(v);
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

/// Links a remito to a guía.
///
/// Both rows are loaded under the caller's visibility inside one
/// transaction. A missing/invisible remito is a plain not-found; an
/// invisible guía is reported as its own error so the caller knows which
/// side failed. Orphans touched by a scoped caller are claimed as part of
/// the same transaction, with `WHERE delegacion_id IS NULL` guarding each
/// claim so concurrent callers cannot steal an already-claimed row.
///
/// The denormalized `guia_numero` is always re-derived from the guía row
/// read in this transaction — never accepted from the caller. Re-linking
/// the same guía is a no-op success; a different guía overwrites the link.
pub async fn vincular_a_guia(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    remito_id: i64,
    guia_id: i64,
) -> Result<Vinculacion> {
    let mut tx = pool.begin().await?;

    let remito = buscar_por_id(&mut *tx, scope, remito_id)
        .await?
        .ok_or(Error::NotFound)?;
    let guia = guias::buscar_por_id(&mut *tx, scope, guia_id)
        .await?
        .ok_or(Error::GuiaFueraDeAlcance)?;

    let mut remito_reclamado = false;
    let mut guia_reclamada = false;
    if !scope.privilegiado {
        if let Some(propia) = scope.delegacion {
            if remito.delegacion_id.is_none() {
                let res = sqlx::query(
                    "UPDATE remitos SET delegacion_id = ? WHERE id = ? AND delegacion_id IS NULL",
                )
                .bind(propia)
                .bind(remito_id)
                .execute(&mut *tx)
                .await
                .map_err(mapear_sqlx)?;
                remito_reclamado = res.rows_affected() > 0;
            }
            if guia.delegacion_id.is_none() {
                let res = sqlx::query(
                    "UPDATE guias SET delegacion_id = ? WHERE id = ? AND delegacion_id IS NULL",
                )
                .bind(propia)
                .bind(guia_id)
                .execute(&mut *tx)
                .await
                .map_err(mapear_sqlx)?;
                guia_reclamada = res.rows_affected() > 0;
            }
        }
    }

    let mut qb = QueryBuilder::new("UPDATE remitos SET guia_id = ");
    qb.push_bind(guia_id);
    qb.push(", guia_numero = ").push_bind(guia.numero.clone());
    qb.push(" WHERE id = ").push_bind(remito_id);
    empujar_visibilidad(&mut qb, scope);

    let res = qb.build().execute(&mut *tx).await.map_err(mapear_sqlx)?;
    tx.commit().await?;

    Ok(Vinculacion {
        cambiadas: res.rows_affected(),
        remito_reclamado,
        guia_reclamada,
    })
}
