//! Delivery batches: handing number ranges of blank documents to an office.
//!
//! Inventory creation is transactional; the notification to the receiving
//! office happens after commit and its outcome travels in the receipt.
//! A failed send never rolls the inventory back — and it is never swallowed
//! either: the caller sees `Fallida` with the reason next to the counts it
//! was credited.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::fields::{GuiaDraft, RemitoDraft};
use crate::notify::{Notifier, ResumenEntrega};
use crate::repo::{delegaciones, guias, remitos};

/// A delivery order: which delegation receives which number ranges.
#[derive(Debug, Clone)]
pub struct OrdenEntrega {
    /// Receiving delegation.
    pub delegacion_id: i64,
    /// Inclusive guía number range, when guías are included.
    pub guias: Option<(i64, i64)>,
    /// Inclusive remito number range, when remitos are included.
    pub remitos: Option<(i64, i64)>,
}

/// Outcome of the post-commit notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResultadoNotificacion {
    /// The summary reached the delegation's contact address.
    Enviada,
    /// The send failed; inventory was already committed.
    Fallida(String),
}

/// Receipt for a processed delivery order.
#[derive(Debug, Clone, Serialize)]
pub struct Entrega {
    /// Numbers of the guías created, bound to the delegation.
    pub guias: Vec<String>,
    /// Numbers of the remitos created. Remitos are delivered unassigned and
    /// claimed by the office on first use.
    pub remitos: Vec<String>,
    /// Previously delivered guías of this delegation still without an
    /// emission date.
    pub previas_sin_emitir: i64,
    /// Whether the office was notified.
    pub notificacion: ResultadoNotificacion,
}

/// Processes a delivery order.
///
/// All inserts share one transaction: a duplicate number anywhere in either
/// range rolls the whole batch back with [`Error::Conflicto`]. Guías are
/// bound to the delegation (bridge rows included); remitos are created
/// orphaned, matching how offices receive and later claim them.
pub async fn entregar_talonarios(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    orden: OrdenEntrega,
) -> Result<Entrega> {
    if orden.guias.is_none() && orden.remitos.is_none() {
        return Err(Error::validacion("faltan datos requeridos"));
    }
    for (desde, hasta) in [orden.guias, orden.remitos].into_iter().flatten() {
        if desde > hasta || desde < 1 {
            return Err(Error::validacion("rango de números inválido"));
        }
    }

    let delegacion = delegaciones::por_id(pool, orden.delegacion_id).await?;

    let mut tx = pool.begin().await?;

    let previas_sin_emitir: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM guias g \
         JOIN guias_delegaciones gd ON gd.guia_id = g.id \
         WHERE gd.delegacion_id = ? AND g.fecha_emision IS NULL",
    )
    .bind(orden.delegacion_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut guias_creadas = Vec::new();
    if let Some((desde, hasta)) = orden.guias {
        for numero in desde..=hasta {
            let draft = GuiaDraft {
                numero: Some(numero.to_string()),
                ..Default::default()
            };
            guias::insertar(&mut tx, Some(orden.delegacion_id), &draft).await?;
            guias_creadas.push(numero.to_string());
        }
    }

    let mut remitos_creados = Vec::new();
    if let Some((desde, hasta)) = orden.remitos {
        for numero in desde..=hasta {
            let draft = RemitoDraft {
                numero: Some(numero.to_string()),
                ..Default::default()
            };
            remitos::insertar(&mut tx, None, &draft).await?;
            remitos_creados.push(numero.to_string());
        }
    }

    tx.commit().await?;

    let resumen = ResumenEntrega {
        delegacion: delegacion.nombre.clone(),
        guias: guias_creadas.clone(),
        remitos: remitos_creados.clone(),
        previas_sin_emitir,
    };
    let notificacion = match notifier.notificar(&delegacion.email, &resumen).await {
        Ok(()) => ResultadoNotificacion::Enviada,
        Err(err) => {
            tracing::error!(
                delegacion = %delegacion.nombre,
                error = %err,
                "entrega registrada pero la notificación falló"
            );
            ResultadoNotificacion::Fallida(err.to_string())
        }
    };

    Ok(Entrega {
        guias: guias_creadas,
        remitos: remitos_creados,
        previas_sin_emitir,
        notificacion,
    })
}
