//! Paginated control-general reporting view.
//!
//! Read-only listings for the oversight screens: page/limit pagination,
//! substring filters, date ranges, and — for guías — the attached image
//! paths plus the remitos associated by document number. The caller's
//! visibility predicate applies exactly as in the repositories; the report
//! can never widen what a scoped caller sees.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::Result;
use crate::model::{Guia, Remito};
use crate::repo::empujar_visibilidad;
use crate::scope::ScopeCtx;

/// Page request. Out-of-range values are clamped, not rejected.
#[derive(Debug, Clone, Copy)]
pub struct Paginacion {
    /// 1-based page number.
    pub pagina: u32,
    /// Page size.
    pub por_pagina: u32,
}

impl Default for Paginacion {
    fn default() -> Self {
        Self {
            pagina: 1,
            por_pagina: 30,
        }
    }
}

impl Paginacion {
    fn limite(&self) -> i64 {
        i64::from(self.por_pagina.max(1))
    }

    fn offset(&self) -> i64 {
        i64::from(self.pagina.max(1) - 1) * self.limite()
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Pagina<T> {
    /// Requested page number.
    pub pagina: u32,
    /// Requested page size.
    pub por_pagina: u32,
    /// Total matching rows.
    pub total: i64,
    /// Total pages for this size.
    pub total_paginas: i64,
    /// The page's rows.
    pub items: Vec<T>,
}

impl<T> Pagina<T> {
    fn nueva(pag: Paginacion, total: i64, items: Vec<T>) -> Self {
        let limite = pag.limite();
        Self {
            pagina: pag.pagina.max(1),
            por_pagina: pag.por_pagina.max(1),
            total,
            total_paginas: (total + limite - 1) / limite,
            items,
        }
    }
}

/// Filters for the guía report.
#[derive(Debug, Clone, Default)]
pub struct FiltroGuias {
    /// Substring of the document number.
    pub numero: Option<String>,
    /// Substring of the holder name.
    pub titular: Option<String>,
    /// Emission date lower bound, inclusive.
    pub desde: Option<NaiveDate>,
    /// Emission date upper bound, inclusive.
    pub hasta: Option<NaiveDate>,
}

/// Filters for the remito report.
#[derive(Debug, Clone, Default)]
pub struct FiltroRemitos {
    /// Substring of the document number.
    pub numero: Option<String>,
    /// Substring of the linked guía number.
    pub guia: Option<String>,
    /// Load date lower bound, inclusive.
    pub desde: Option<NaiveDate>,
    /// Load date upper bound, inclusive.
    pub hasta: Option<NaiveDate>,
}

/// A guía with its report detail.
#[derive(Debug, Clone, Serialize)]
pub struct GuiaConDetalle {
    /// The guía row.
    #[serde(flatten)]
    pub guia: Guia,
    /// Relative paths of the attached images, oldest first.
    pub imagenes: Vec<String>,
    /// Remitos associated by document number, under the same visibility.
    pub remitos_asociados: Vec<Remito>,
}

fn empujar_filtros_guias(qb: &mut QueryBuilder<'_, Sqlite>, filtro: &FiltroGuias) {
    if let Some(numero) = &filtro.numero {
        qb.push(" AND numero LIKE ").push_bind(format!("%{numero}%"));
    }
    if let Some(titular) = &filtro.titular {
        qb.push(" AND titular LIKE ").push_bind(format!("%{titular}%"));
    }
    if let Some(desde) = filtro.desde {
        qb.push(" AND fecha_emision >= ").push_bind(desde);
    }
    if let Some(hasta) = filtro.hasta {
        qb.push(" AND fecha_emision <= ").push_bind(hasta);
    }
}

/// The guía side of the control-general report.
pub async fn control_guias(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    filtro: &FiltroGuias,
    pag: Paginacion,
) -> Result<Pagina<GuiaConDetalle>> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM guias WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    empujar_filtros_guias(&mut qb, filtro);
    let total: i64 = qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM guias WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    empujar_filtros_guias(&mut qb, filtro);
    qb.push(" ORDER BY fecha_carga ASC LIMIT ")
        .push_bind(pag.limite())
        .push(" OFFSET ")
        .push_bind(pag.offset());
    let guias = qb.build_query_as::<Guia>().fetch_all(pool).await?;

    let mut items = Vec::with_capacity(guias.len());
    for guia in guias {
        let imagenes: Vec<String> = sqlx::query_scalar(
            "SELECT path FROM guias_imagenes WHERE documento_id = ? ORDER BY creada_el ASC, id ASC",
        )
        .bind(guia.id)
        .fetch_all(pool)
        .await?;

        let mut qb = QueryBuilder::new("SELECT * FROM remitos WHERE guia_numero = ");
        qb.push_bind(guia.numero.clone());
        empujar_visibilidad(&mut qb, scope);
        qb.push(" ORDER BY fecha_carga ASC");
        let remitos_asociados = qb.build_query_as::<Remito>().fetch_all(pool).await?;

        items.push(GuiaConDetalle {
            guia,
            imagenes,
            remitos_asociados,
        });
    }

    Ok(Pagina::nueva(pag, total, items))
}

fn empujar_filtros_remitos(qb: &mut QueryBuilder<'_, Sqlite>, filtro: &FiltroRemitos) {
    if let Some(numero) = &filtro.numero {
        qb.push(" AND numero LIKE ").push_bind(format!("%{numero}%"));
    }
    if let Some(guia) = &filtro.guia {
        qb.push(" AND guia_numero LIKE ").push_bind(format!("%{guia}%"));
    }
    if let Some(desde) = filtro.desde {
        qb.push(" AND fecha_carga >= ").push_bind(desde);
    }
    if let Some(hasta) = filtro.hasta {
        // fecha_carga is a timestamp; include the whole upper-bound day
        qb.push(" AND fecha_carga < ")
            .push_bind(hasta.succ_opt().unwrap_or(hasta));
    }
}

/// The remito side of the control-general report.
pub async fn control_remitos(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    filtro: &FiltroRemitos,
    pag: Paginacion,
) -> Result<Pagina<Remito>> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM remitos WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    empujar_filtros_remitos(&mut qb, filtro);
    let total: i64 = qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM remitos WHERE 1 = 1");
    empujar_visibilidad(&mut qb, scope);
    empujar_filtros_remitos(&mut qb, filtro);
    qb.push(" ORDER BY fecha_carga ASC LIMIT ")
        .push_bind(pag.limite())
        .push(" OFFSET ")
        .push_bind(pag.offset());
    let items = qb.build_query_as::<Remito>().fetch_all(pool).await?;

    Ok(Pagina::nueva(pag, total, items))
}
