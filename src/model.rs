//! Persisted domain rows.
//!
//! Row structs map 1:1 onto datastore columns via `sqlx::FromRow`. They are
//! plain data: every rule about who may see or mutate them lives in
//! [`crate::policy`] and [`crate::repo`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

/// Lifecycle state of a guía, persisted as its numeric code.
///
/// The derived-state rule is fixed here and nowhere else: a returned guía is
/// [`EstadoGuia::NoVigente`], otherwise [`EstadoGuia::Vigente`]. Both the
/// create and the update path call [`EstadoGuia::por_devolucion`]; neither
/// hardcodes a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstadoGuia {
    /// Active/current document (code 3).
    Vigente,
    /// Returned/no-longer-current document (code 4).
    NoVigente,
}

impl EstadoGuia {
    /// The persisted numeric code.
    pub fn codigo(self) -> i64 {
        match self {
            EstadoGuia::Vigente => 3,
            EstadoGuia::NoVigente => 4,
        }
    }

    /// Derives the state from the returned flag.
    pub fn por_devolucion(devuelta: bool) -> Self {
        if devuelta {
            EstadoGuia::NoVigente
        } else {
            EstadoGuia::Vigente
        }
    }
}

/// A numbered shipping/authorization document tracked per delegation.
///
/// `(numero, delegacion_id)` is unique; `delegacion_id = NULL` marks an
/// orphan and forms its own uniqueness bucket (one orphan per numero).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Guia {
    /// Row id.
    pub id: i64,
    /// Document number, unique within its owning delegation.
    pub numero: String,
    /// Emission date, null while the talonario is unused.
    pub fecha_emision: Option<NaiveDate>,
    /// Expiry date.
    pub fecha_vencimiento: Option<NaiveDate>,
    /// Load timestamp.
    pub fecha_carga: NaiveDateTime,
    /// Hand-over date.
    pub fecha_entrega: Option<NaiveDate>,
    /// Deposit flag.
    pub en_deposito: bool,
    /// Returned flag; drives [`EstadoGuia`].
    pub devuelta: bool,
    /// Reported-to-head-office flag.
    pub informada: bool,
    /// Free-text holder name.
    pub titular: Option<String>,
    /// Free-text destination.
    pub destino: Option<String>,
    /// Holder reference.
    pub titular_id: Option<i64>,
    /// Owning delegation; null = orphan.
    pub delegacion_id: Option<i64>,
    /// Persisted [`EstadoGuia`] code.
    pub estado: i64,
}

/// A numbered delivery receipt, optionally linked to a guía.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Remito {
    /// Row id.
    pub id: i64,
    /// Document number, unique within its owning delegation.
    pub numero: String,
    /// Expiry date.
    pub fecha_vencimiento: Option<NaiveDate>,
    /// Denormalized numero of the linked guía. Re-derived from the guía row
    /// at link time, never caller-supplied.
    pub guia_numero: Option<String>,
    /// Load timestamp.
    pub fecha_carga: NaiveDateTime,
    /// Return date.
    pub fecha_devolucion: Option<NaiveDate>,
    /// Returned flag.
    pub devuelto: bool,
    /// Owning delegation; null = orphan.
    pub delegacion_id: Option<i64>,
    /// Linked guía row id.
    pub guia_id: Option<i64>,
}

/// A regional office; the ownership boundary for documents.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Delegacion {
    /// Row id.
    pub id: i64,
    /// Office name.
    pub nombre: String,
    /// Notification address.
    pub email: String,
}

/// A document holder.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Titular {
    /// Row id.
    pub id: i64,
    /// Company name.
    pub razon_social: Option<String>,
    /// Tax id.
    pub cuit: Option<String>,
    /// First name.
    pub nombre: Option<String>,
    /// Last name.
    pub apellido: Option<String>,
}

/// A free-text note attached to a guía.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Observacion {
    /// Row id.
    pub id: i64,
    /// Parent guía.
    pub guia_id: i64,
    /// Authoring user, when the credential carried one.
    pub usuario_id: Option<i64>,
    /// Note text.
    pub texto: String,
    /// Creation timestamp.
    pub fecha: NaiveDateTime,
}

/// An image attached to a guía or remito.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Imagen {
    /// Row id.
    pub id: i64,
    /// Parent document id (guía or remito depending on the table).
    pub documento_id: i64,
    /// Stable relative path in the file store.
    pub path: String,
    /// Stored file name.
    pub nombre: String,
    /// MIME type.
    pub mime: Option<String>,
    /// Size in bytes.
    pub tamano: Option<i64>,
    /// GPS latitude, normalized to 8 decimals.
    pub gps_lat: Option<f64>,
    /// GPS longitude, normalized to 8 decimals.
    pub gps_lng: Option<f64>,
    /// GPS altitude, normalized to 2 decimals.
    pub gps_alt: Option<f64>,
    /// Creation timestamp.
    pub creada_el: NaiveDateTime,
}

/// One entry of the unified document listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentoResumen {
    /// `"guia"` or `"remito"`.
    pub tipo: String,
    /// Row id within its own table.
    pub id: i64,
    /// Document number.
    pub numero: String,
    /// Load timestamp.
    pub fecha_carga: NaiveDateTime,
    /// Returned flag.
    pub devuelto: bool,
    /// Destination (guías) or linked guía numero (remitos).
    pub relacion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estado_derivation_is_fixed() {
        assert_eq!(EstadoGuia::por_devolucion(true), EstadoGuia::NoVigente);
        assert_eq!(EstadoGuia::por_devolucion(false), EstadoGuia::Vigente);
        assert_eq!(EstadoGuia::Vigente.codigo(), 3);
        assert_eq!(EstadoGuia::NoVigente.codigo(), 4);
    }
}
