//! Delivery-batch notification behind a narrow seam.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

/// Structured summary of a delivery batch, sent to the receiving office.
#[derive(Debug, Clone, Serialize)]
pub struct ResumenEntrega {
    /// Receiving delegation's name.
    pub delegacion: String,
    /// Numbers of the guías delivered in this batch.
    pub guias: Vec<String>,
    /// Numbers of the remitos delivered in this batch.
    pub remitos: Vec<String>,
    /// Previously delivered guías still without an emission date.
    pub previas_sin_emitir: i64,
}

/// Notification failure. Carries a reason for the receipt; it is never
/// mapped to a request error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Sends a delivery summary to a delegation's contact address.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the summary. Implementations decide the medium (the
    /// deployment uses email).
    async fn notificar(&self, destinatario: &str, resumen: &ResumenEntrega)
        -> Result<(), NotifyError>;
}

/// Notifier that only logs the summary. Default wiring for development.
#[derive(Debug, Default)]
pub struct NotifierTracing;

#[async_trait]
impl Notifier for NotifierTracing {
    async fn notificar(
        &self,
        destinatario: &str,
        resumen: &ResumenEntrega,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            destinatario,
            delegacion = %resumen.delegacion,
            guias = resumen.guias.len(),
            remitos = resumen.remitos.len(),
            "entrega notificada"
        );
        Ok(())
    }
}

/// Recording notifier for tests: captures every send and can be told to
/// fail, so the receipt's notification outcome is observable.
#[derive(Debug, Default)]
pub struct NotifierRegistrador {
    envios: Mutex<Vec<(String, ResumenEntrega)>>,
    fallar: bool,
}

impl NotifierRegistrador {
    /// Notifier that accepts every send.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that rejects every send.
    pub fn fallando() -> Self {
        Self {
            envios: Mutex::new(Vec::new()),
            fallar: true,
        }
    }

    /// Captured sends, in order.
    pub fn envios(&self) -> Vec<(String, ResumenEntrega)> {
        self.envios.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for NotifierRegistrador {
    async fn notificar(
        &self,
        destinatario: &str,
        resumen: &ResumenEntrega,
    ) -> Result<(), NotifyError> {
        if self.fallar {
            return Err(NotifyError("smtp rechazado".to_string()));
        }
        self.envios
            .lock()
            .unwrap()
            .push((destinatario.to_string(), resumen.clone()));
        Ok(())
    }
}
