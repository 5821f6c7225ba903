//! Typed create/patch payloads.
//!
//! Each payload struct IS the write allow-list for its document type: a key
//! that is not a field here is silently dropped at deserialization, so no
//! handler can be mass-assigned into columns it never meant to expose.
//! Coercions the wire format needs are encoded once, in deserializers:
//!
//! - date fields accept `""` and `null` as "no date";
//! - flag fields accept the truthy variants `true`, `1` and `"1"` (anything
//!   else is false);
//! - patch fields distinguish "absent" (leave untouched) from "present but
//!   null/empty" (clear the column) with a double `Option`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Create payload for a guía.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuiaDraft {
    /// Document number; required, validated at create.
    pub numero: Option<String>,
    /// Emission date.
    #[serde(default, deserialize_with = "fecha_flexible")]
    pub fecha_emision: Option<NaiveDate>,
    /// Expiry date.
    #[serde(default, deserialize_with = "fecha_flexible")]
    pub fecha_vencimiento: Option<NaiveDate>,
    /// Hand-over date.
    #[serde(default, deserialize_with = "fecha_flexible")]
    pub fecha_entrega: Option<NaiveDate>,
    /// Load timestamp; defaults to now at insert.
    #[serde(default)]
    pub fecha_carga: Option<NaiveDateTime>,
    /// Deposit flag.
    #[serde(default, deserialize_with = "flag")]
    pub en_deposito: bool,
    /// Returned flag.
    #[serde(default, deserialize_with = "flag")]
    pub devuelta: bool,
    /// Reported flag.
    #[serde(default, deserialize_with = "flag")]
    pub informada: bool,
    /// Free-text holder.
    #[serde(default)]
    pub titular: Option<String>,
    /// Free-text destination.
    #[serde(default)]
    pub destino: Option<String>,
    /// Holder reference.
    #[serde(default)]
    pub titular_id: Option<i64>,
    /// Explicit target delegation; honored only for callers that may
    /// redirect (see [`crate::ScopeCtx::destino`]).
    #[serde(default)]
    pub delegacion_id: Option<i64>,
    /// Explicit estado code; derived from `devuelta` when absent.
    #[serde(default)]
    pub estado: Option<i64>,
}

/// Partial-update payload for a guía. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuiaPatch {
    /// Emission date; `null`/`""` clears it.
    #[serde(deserialize_with = "fecha_doble")]
    pub fecha_emision: Option<Option<NaiveDate>>,
    /// Expiry date; `null`/`""` clears it.
    #[serde(deserialize_with = "fecha_doble")]
    pub fecha_vencimiento: Option<Option<NaiveDate>>,
    /// Hand-over date; `null`/`""` clears it.
    #[serde(deserialize_with = "fecha_doble")]
    pub fecha_entrega: Option<Option<NaiveDate>>,
    /// Load timestamp override.
    pub fecha_carga: Option<NaiveDateTime>,
    /// Deposit flag.
    #[serde(deserialize_with = "flag_opcional")]
    pub en_deposito: Option<bool>,
    /// Returned flag; derives `estado` when that is absent.
    #[serde(deserialize_with = "flag_opcional")]
    pub devuelta: Option<bool>,
    /// Reported flag.
    #[serde(deserialize_with = "flag_opcional")]
    pub informada: Option<bool>,
    /// Free-text holder.
    pub titular: Option<String>,
    /// Free-text destination.
    pub destino: Option<String>,
    /// Holder reference; `null` clears it.
    #[serde(deserialize_with = "entero_doble")]
    pub titular_id: Option<Option<i64>>,
    /// Explicit target delegation; honored only with redirect permission.
    #[serde(deserialize_with = "entero_doble")]
    pub delegacion_id: Option<Option<i64>>,
    /// Explicit estado code.
    pub estado: Option<i64>,
}

impl GuiaPatch {
    /// True when no field is present.
    pub fn esta_vacio(&self) -> bool {
        self.fecha_emision.is_none()
            && self.fecha_vencimiento.is_none()
            && self.fecha_entrega.is_none()
            && self.fecha_carga.is_none()
            && self.en_deposito.is_none()
            && self.devuelta.is_none()
            && self.informada.is_none()
            && self.titular.is_none()
            && self.destino.is_none()
            && self.titular_id.is_none()
            && self.delegacion_id.is_none()
            && self.estado.is_none()
    }
}

/// Create payload for a remito.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemitoDraft {
    /// Document number; required, validated at create.
    pub numero: Option<String>,
    /// Expiry date.
    #[serde(default, deserialize_with = "fecha_flexible")]
    pub fecha_vencimiento: Option<NaiveDate>,
    /// Guía number noted at load time (pre-link bookkeeping).
    #[serde(default)]
    pub guia_numero: Option<String>,
    /// Load timestamp; defaults to now at insert.
    #[serde(default)]
    pub fecha_carga: Option<NaiveDateTime>,
    /// Return date.
    #[serde(default, deserialize_with = "fecha_flexible")]
    pub fecha_devolucion: Option<NaiveDate>,
    /// Returned flag.
    #[serde(default, deserialize_with = "flag")]
    pub devuelto: bool,
    /// Explicit target delegation; honored only with redirect permission.
    #[serde(default)]
    pub delegacion_id: Option<i64>,
}

/// Partial-update payload for a remito. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemitoPatch {
    /// Expiry date; `null`/`""` clears it.
    #[serde(deserialize_with = "fecha_doble")]
    pub fecha_vencimiento: Option<Option<NaiveDate>>,
    /// Noted guía number; `null`/`""` clears it.
    #[serde(deserialize_with = "texto_doble")]
    pub guia_numero: Option<Option<String>>,
    /// Load timestamp override.
    pub fecha_carga: Option<NaiveDateTime>,
    /// Return date; `null`/`""` clears it.
    #[serde(deserialize_with = "fecha_doble")]
    pub fecha_devolucion: Option<Option<NaiveDate>>,
    /// Returned flag.
    #[serde(deserialize_with = "flag_opcional")]
    pub devuelto: Option<bool>,
    /// Explicit target delegation; honored only with redirect permission.
    #[serde(deserialize_with = "entero_doble")]
    pub delegacion_id: Option<Option<i64>>,
}

impl RemitoPatch {
    /// True when no field is present.
    pub fn esta_vacio(&self) -> bool {
        self.fecha_vencimiento.is_none()
            && self.guia_numero.is_none()
            && self.fecha_carga.is_none()
            && self.fecha_devolucion.is_none()
            && self.devuelto.is_none()
            && self.delegacion_id.is_none()
    }
}

/// Create payload for a titular.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TitularDraft {
    /// Company name.
    pub razon_social: Option<String>,
    /// Tax id.
    pub cuit: Option<String>,
    /// First name.
    pub nombre: Option<String>,
    /// Last name.
    pub apellido: Option<String>,
}

/// Partial-update payload for a titular; `""`/`null` clears a column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TitularPatch {
    /// Company name.
    #[serde(deserialize_with = "texto_doble")]
    pub razon_social: Option<Option<String>>,
    /// Tax id.
    #[serde(deserialize_with = "texto_doble")]
    pub cuit: Option<Option<String>>,
    /// First name.
    #[serde(deserialize_with = "texto_doble")]
    pub nombre: Option<Option<String>>,
    /// Last name.
    #[serde(deserialize_with = "texto_doble")]
    pub apellido: Option<Option<String>>,
}

impl TitularPatch {
    /// True when no field is present.
    pub fn esta_vacio(&self) -> bool {
        self.razon_social.is_none()
            && self.cuit.is_none()
            && self.nombre.is_none()
            && self.apellido.is_none()
    }
}

/// The truthy set for tinyint-style flags: `true`, `1`, `"1"`. Everything
/// else, including `null`, is false.
fn es_veraz(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1",
        _ => false,
    }
}

fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(es_veraz(&v))
}

fn flag_opcional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(Some(es_veraz(&v)))
}

fn parse_fecha<E: serde::de::Error>(v: Value) -> Result<Option<NaiveDate>, E> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| E::custom(format!("fecha inválida: {s}"))),
        otro => Err(E::custom(format!("fecha inválida: {otro}"))),
    }
}

fn fecha_flexible<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    parse_fecha(Value::deserialize(d)?)
}

fn fecha_doble<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<NaiveDate>>, D::Error> {
    parse_fecha(Value::deserialize(d)?).map(Some)
}

fn texto_doble<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<String>>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(Some(None)),
        Value::String(s) if s.is_empty() => Ok(Some(None)),
        Value::String(s) => Ok(Some(Some(s))),
        otro => Err(serde::de::Error::custom(format!("texto inválido: {otro}"))),
    }
}

fn entero_doble<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<i64>>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(Some(None)),
        Value::Number(n) => n
            .as_i64()
            .map(|i| Some(Some(i)))
            .ok_or_else(|| serde::de::Error::custom("id inválido")),
        Value::String(s) => s
            .parse::<i64>()
            .map(|i| Some(Some(i)))
            .map_err(|_| serde::de::Error::custom(format!("id inválido: {s}"))),
        otro => Err(serde::de::Error::custom(format!("id inválido: {otro}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_dropped() {
        let draft: GuiaDraft = serde_json::from_value(json!({
            "numero": "100",
            "id": 999,
            "creada_por": "atacante"
        }))
        .unwrap();
        assert_eq!(draft.numero.as_deref(), Some("100"));
    }

    #[test]
    fn empty_string_dates_become_null() {
        let draft: GuiaDraft = serde_json::from_value(json!({
            "numero": "1",
            "fecha_emision": "",
            "fecha_vencimiento": null
        }))
        .unwrap();
        assert!(draft.fecha_emision.is_none());
        assert!(draft.fecha_vencimiento.is_none());
    }

    #[test]
    fn truthy_variants_normalize() {
        for veraz in [json!(true), json!(1), json!("1")] {
            let draft: GuiaDraft =
                serde_json::from_value(json!({ "numero": "1", "devuelta": veraz })).unwrap();
            assert!(draft.devuelta);
        }
        for falso in [json!(false), json!(0), json!("0"), json!(null), json!("si")] {
            let draft: GuiaDraft =
                serde_json::from_value(json!({ "numero": "1", "devuelta": falso })).unwrap();
            assert!(!draft.devuelta);
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_clear() {
        let patch: GuiaPatch = serde_json::from_value(json!({
            "fecha_emision": "2025-03-01",
            "fecha_vencimiento": ""
        }))
        .unwrap();
        assert_eq!(
            patch.fecha_emision,
            Some(Some(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()))
        );
        assert_eq!(patch.fecha_vencimiento, Some(None)); // clear
        assert_eq!(patch.fecha_entrega, None); // untouched
    }

    #[test]
    fn empty_patch_reports_empty() {
        let patch: GuiaPatch = serde_json::from_value(json!({})).unwrap();
        assert!(patch.esta_vacio());
        let patch: GuiaPatch = serde_json::from_value(json!({ "devuelta": 1 })).unwrap();
        assert!(!patch.esta_vacio());
    }

    #[test]
    fn delegation_override_accepts_string_ids() {
        let patch: RemitoPatch =
            serde_json::from_value(json!({ "delegacion_id": "9" })).unwrap();
        assert_eq!(patch.delegacion_id, Some(Some(9)));
        let patch: RemitoPatch =
            serde_json::from_value(json!({ "delegacion_id": null })).unwrap();
        assert_eq!(patch.delegacion_id, Some(None));
    }

    #[test]
    fn titular_patch_clears_on_empty_string() {
        let patch: TitularPatch = serde_json::from_value(json!({ "cuit": "" })).unwrap();
        assert_eq!(patch.cuit, Some(None));
        assert!(patch.razon_social.is_none());
    }

    #[test]
    fn bad_dates_are_rejected() {
        let r: Result<GuiaDraft, _> =
            serde_json::from_value(json!({ "numero": "1", "fecha_emision": "03/01/2025" }));
        assert!(r.is_err());
    }
}
