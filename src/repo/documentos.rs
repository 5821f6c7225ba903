//! Unified document listing across both document types.

use sqlx::{QueryBuilder, SqlitePool};

use crate::error::Result;
use crate::model::DocumentoResumen;
use crate::scope::ScopeCtx;

use super::empujar_visibilidad;

/// Lists guías and remitos as one stream, under the caller's visibility.
pub async fn listar(pool: &SqlitePool, scope: &ScopeCtx) -> Result<Vec<DocumentoResumen>> {
    let mut qb = QueryBuilder::new(
        "SELECT 'guia' AS tipo, id, numero, fecha_carga, devuelta AS devuelto, \
         destino AS relacion FROM guias WHERE 1 = 1",
    );
    empujar_visibilidad(&mut qb, scope);
    qb.push(
        " UNION ALL SELECT 'remito' AS tipo, id, numero, fecha_carga, devuelto AS devuelto, \
         guia_numero AS relacion FROM remitos WHERE 1 = 1",
    );
    empujar_visibilidad(&mut qb, scope);
    qb.push(" ORDER BY fecha_carga ASC");

    let filas = qb
        .build_query_as::<DocumentoResumen>()
        .fetch_all(pool)
        .await?;
    Ok(filas)
}
