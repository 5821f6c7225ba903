//! GPS metadata extraction behind a narrow seam.

/// GPS coordinates attached to an image. Any of the fields may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordenadas {
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lng: Option<f64>,
    /// Altitude in meters.
    pub alt: Option<f64>,
}

/// Extracts GPS coordinates from stored image bytes.
///
/// By contract this never errors toward the caller: any extraction failure
/// is "no metadata", and the image is stored without coordinates.
pub trait GpsExtractor: Send + Sync {
    /// Returns coordinates when the image carries them.
    fn gps(&self, bytes: &[u8]) -> Option<Coordenadas>;
}

/// Extractor that never finds coordinates. The default wiring when no EXIF
/// reader is configured.
#[derive(Debug, Default)]
pub struct SinGps;

impl GpsExtractor for SinGps {
    fn gps(&self, _bytes: &[u8]) -> Option<Coordenadas> {
        None
    }
}

/// Extractor returning a fixed position for every image; the test double.
#[derive(Debug)]
pub struct GpsFijo(pub Coordenadas);

impl GpsExtractor for GpsFijo {
    fn gps(&self, _bytes: &[u8]) -> Option<Coordenadas> {
        Some(self.0)
    }
}

/// Rounds a coordinate to the storage scale (decimal places), rejecting
/// non-finite values. Latitude/longitude use scale 8, altitude scale 2.
pub fn normalizar_coordenada(valor: f64, escala: u32) -> Option<f64> {
    if !valor.is_finite() {
        return None;
    }
    let factor = 10f64.powi(escala as i32);
    Some((valor * factor).round() / factor)
}
