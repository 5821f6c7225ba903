//! Image attachments for guías and remitos.
//!
//! Uploads are processed per file: one bad image is reported in the batch
//! result, it does not abort the others. GPS coordinates come from the
//! caller's explicit values first, the image's EXIF second, nothing third,
//! each field independently; stored values are normalized to the column
//! scale (lat/lng 8 decimals, alt 2).

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, SqlitePool};

use crate::error::{Error, Result};
use crate::filestore::{slug_carpeta, FileStore};
use crate::gps::{normalizar_coordenada, Coordenadas, GpsExtractor};
use crate::model::Imagen;
use crate::repo::{empujar_visibilidad, guias, remitos};
use crate::scope::ScopeCtx;

/// Accepted image extensions.
const EXTENSIONES: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Which document type an image hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipoDocumento {
    /// Attached to a guía.
    Guia,
    /// Attached to a remito.
    Remito,
}

impl TipoDocumento {
    fn tabla_imagenes(&self) -> &'static str {
        match self {
            TipoDocumento::Guia => "guias_imagenes",
            TipoDocumento::Remito => "remitos_imagenes",
        }
    }

    fn tabla_padre(&self) -> &'static str {
        match self {
            TipoDocumento::Guia => "guias",
            TipoDocumento::Remito => "remitos",
        }
    }

    fn carpeta(&self) -> &'static str {
        match self {
            TipoDocumento::Guia => "guias",
            TipoDocumento::Remito => "remitos",
        }
    }
}

/// One uploaded file, already read off the wire.
#[derive(Debug, Clone)]
pub struct ArchivoEntrante {
    /// Original file name (extension is taken from here).
    pub nombre: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Declared MIME type.
    pub mime: Option<String>,
    /// Caller-supplied GPS values; each field overrides EXIF independently.
    pub gps_explicito: Coordenadas,
}

/// A successfully stored image.
#[derive(Debug, Clone, Serialize)]
pub struct ImagenSubida {
    /// New row id.
    pub id: i64,
    /// Stable relative path.
    pub path: String,
    /// Stored file name.
    pub nombre: String,
    /// Normalized latitude.
    pub gps_lat: Option<f64>,
    /// Normalized longitude.
    pub gps_lng: Option<f64>,
    /// Normalized altitude.
    pub gps_alt: Option<f64>,
}

/// A per-file failure inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDeArchivo {
    /// Original file name.
    pub archivo: String,
    /// What went wrong.
    pub error: String,
}

/// Batch upload outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Subida {
    /// Stored images.
    pub subidas: Vec<ImagenSubida>,
    /// Files that could not be stored.
    pub errores: Vec<ErrorDeArchivo>,
}

impl Subida {
    /// HTTP status class: 201 all stored, 207 partial, 400 nothing stored.
    pub fn estado(&self) -> u16 {
        match (self.subidas.is_empty(), self.errores.is_empty()) {
            (false, true) => 201,
            (false, false) => 207,
            (true, _) => 400,
        }
    }
}

/// Lists a document's images, oldest first. The parent document must be
/// visible to the caller.
pub async fn listar(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    tipo: TipoDocumento,
    documento_id: i64,
) -> Result<Vec<Imagen>> {
    if !documento_visible(pool, scope, tipo, documento_id).await? {
        return Err(Error::NotFound);
    }
    let filas = sqlx::query_as::<_, Imagen>(&format!(
        "SELECT * FROM {} WHERE documento_id = ? ORDER BY creada_el ASC, id ASC",
        tipo.tabla_imagenes()
    ))
    .bind(documento_id)
    .fetch_all(pool)
    .await?;
    Ok(filas)
}

/// Attaches a batch of images to a visible document.
///
/// `carpeta` names the delegation folder; when absent, a guía's destino is
/// used, then the no-delegation fallback.
pub async fn adjuntar(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    store: &dyn FileStore,
    extractor: &dyn GpsExtractor,
    tipo: TipoDocumento,
    documento_id: i64,
    carpeta: Option<&str>,
    archivos: Vec<ArchivoEntrante>,
) -> Result<Subida> {
    if archivos.is_empty() {
        return Err(Error::validacion("no se enviaron imágenes"));
    }

    let (numero, destino) = match tipo {
        TipoDocumento::Guia => {
            let guia = guias::buscar_por_id(pool, scope, documento_id)
                .await?
                .ok_or(Error::NotFound)?;
            (guia.numero, guia.destino)
        }
        TipoDocumento::Remito => {
            let remito = remitos::buscar_por_id(pool, scope, documento_id)
                .await?
                .ok_or(Error::NotFound)?;
            (remito.numero, None)
        }
    };

    let slug = slug_carpeta(carpeta.or(destino.as_deref()).unwrap_or(""));
    let ahora = Utc::now().naive_utc();
    let sello = ahora.format("%Y-%m-%d_%H-%M-%S");

    let mut subidas = Vec::new();
    let mut errores = Vec::new();

    for (indice, archivo) in archivos.into_iter().enumerate() {
        let extension = match extension_permitida(&archivo.nombre) {
            Some(ext) => ext,
            None => {
                errores.push(ErrorDeArchivo {
                    archivo: archivo.nombre,
                    error: "solo se permiten imágenes (jpg, jpeg, png, webp)".to_string(),
                });
                continue;
            }
        };

        let nombre_final = if indice == 0 {
            format!("{numero}_{sello}.{extension}")
        } else {
            format!("{numero}_{sello}_{indice}.{extension}")
        };
        let sugerida = format!("uploads/{}/{}/{}", tipo.carpeta(), slug, nombre_final);

        let path = match store.guardar(&sugerida, &archivo.bytes).await {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(archivo = %archivo.nombre, error = %err, "imagen no almacenada");
                errores.push(ErrorDeArchivo {
                    archivo: archivo.nombre,
                    error: "no se pudo almacenar el archivo".to_string(),
                });
                continue;
            }
        };

        let exif = extractor.gps(&archivo.bytes).unwrap_or_default();
        let lat = archivo
            .gps_explicito
            .lat
            .or(exif.lat)
            .and_then(|v| normalizar_coordenada(v, 8));
        let lng = archivo
            .gps_explicito
            .lng
            .or(exif.lng)
            .and_then(|v| normalizar_coordenada(v, 8));
        let alt = archivo
            .gps_explicito
            .alt
            .or(exif.alt)
            .and_then(|v| normalizar_coordenada(v, 2));

        let res = sqlx::query(&format!(
            "INSERT INTO {} (documento_id, path, nombre, mime, tamano, gps_lat, gps_lng, \
             gps_alt, creada_el) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            tipo.tabla_imagenes()
        ))
        .bind(documento_id)
        .bind(&path)
        .bind(&nombre_final)
        .bind(archivo.mime.clone())
        .bind(archivo.bytes.len() as i64)
        .bind(lat)
        .bind(lng)
        .bind(alt)
        .bind(ahora)
        .execute(pool)
        .await?;

        subidas.push(ImagenSubida {
            id: res.last_insert_rowid(),
            path,
            nombre: nombre_final,
            gps_lat: lat,
            gps_lng: lng,
            gps_alt: alt,
        });
    }

    Ok(Subida { subidas, errores })
}

/// Deletes an image row, then removes the stored file best-effort: a failed
/// file delete is logged, never surfaced to the caller.
pub async fn eliminar(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    store: &dyn FileStore,
    tipo: TipoDocumento,
    imagen_id: i64,
) -> Result<()> {
    let fila: Option<(String, Option<i64>)> = sqlx::query_as(&format!(
        "SELECT i.path, p.delegacion_id FROM {} i JOIN {} p ON p.id = i.documento_id \
         WHERE i.id = ? LIMIT 1",
        tipo.tabla_imagenes(),
        tipo.tabla_padre()
    ))
    .bind(imagen_id)
    .fetch_optional(pool)
    .await?;

    let (path, delegacion) = fila.ok_or(Error::NotFound)?;
    if !scope.es_visible(delegacion) {
        // Same shape as a missing id: no probing another office's rows.
        return Err(Error::NotFound);
    }

    sqlx::query(&format!(
        "DELETE FROM {} WHERE id = ?",
        tipo.tabla_imagenes()
    ))
    .bind(imagen_id)
    .execute(pool)
    .await?;

    if let Err(err) = store.eliminar(&path).await {
        tracing::warn!(path = %path, error = %err, "archivo de imagen no eliminado");
    }
    Ok(())
}

async fn documento_visible(
    pool: &SqlitePool,
    scope: &ScopeCtx,
    tipo: TipoDocumento,
    documento_id: i64,
) -> Result<bool> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT id FROM {} WHERE id = ",
        tipo.tabla_padre()
    ));
    qb.push_bind(documento_id);
    empujar_visibilidad(&mut qb, scope);
    qb.push(" LIMIT 1");
    let fila: Option<i64> = qb.build_query_scalar().fetch_optional(pool).await?;
    Ok(fila.is_some())
}

fn extension_permitida(nombre: &str) -> Option<String> {
    let ext = nombre.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
    EXTENSIONES.contains(&ext.as_str()).then_some(ext)
}
