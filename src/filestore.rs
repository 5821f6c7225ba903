//! Image file storage behind a narrow seam.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::roles::sin_acentos;

/// Persists uploaded bytes and serves them back by relative path.
///
/// Implementations return a *stable relative path* for later retrieval;
/// the HTTP layer decides how that path becomes a URL. Deletion is
/// best-effort by contract: callers log a failed delete and move on, they
/// never fail the request over it.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` under the suggested relative path and returns the
    /// stable relative path of the stored file.
    async fn guardar(&self, ruta: &str, bytes: &[u8]) -> Result<String>;

    /// Removes a stored file by its relative path.
    async fn eliminar(&self, ruta: &str) -> Result<()>;
}

/// Folder slug for a delegation name: accents folded, punctuation dropped,
/// whitespace collapsed to `_`. Empty input falls back to `sin-delegacion`.
pub fn slug_carpeta(nombre: &str) -> String {
    let plano = sin_acentos(nombre);
    let limpio: String = plano
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    let slug = limpio
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "sin-delegacion".to_string()
    } else {
        slug
    }
}

/// Disk-backed store rooted at a directory.
#[derive(Debug)]
pub struct DiscoStore {
    raiz: PathBuf,
}

impl DiscoStore {
    /// Creates a store rooted at `raiz`.
    pub fn new(raiz: impl Into<PathBuf>) -> Self {
        Self { raiz: raiz.into() }
    }

    fn absoluta(&self, ruta: &str) -> PathBuf {
        self.raiz.join(ruta.trim_start_matches('/'))
    }
}

#[async_trait]
impl FileStore for DiscoStore {
    async fn guardar(&self, ruta: &str, bytes: &[u8]) -> Result<String> {
        let destino = self.absoluta(ruta);
        if let Some(padre) = destino.parent() {
            std::fs::create_dir_all(padre)?;
        }
        std::fs::write(&destino, bytes)?;
        Ok(normalizar_relativa(ruta))
    }

    async fn eliminar(&self, ruta: &str) -> Result<()> {
        std::fs::remove_file(self.absoluta(ruta))?;
        Ok(())
    }
}

fn normalizar_relativa(ruta: &str) -> String {
    let ruta = ruta.replace('\\', "/");
    if ruta.starts_with('/') {
        ruta
    } else {
        format!("/{ruta}")
    }
}

/// In-memory store that records every write; the test double for the disk
/// store. Also usable to inspect which paths a flow produced.
#[derive(Debug, Default)]
pub struct MemStore {
    archivos: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored paths, in order.
    pub fn rutas(&self) -> Vec<String> {
        self.archivos.lock().unwrap().keys().cloned().collect()
    }

    /// Whether a path is currently stored.
    pub fn contiene(&self, ruta: &str) -> bool {
        self.archivos.lock().unwrap().contains_key(ruta)
    }
}

#[async_trait]
impl FileStore for MemStore {
    async fn guardar(&self, ruta: &str, bytes: &[u8]) -> Result<String> {
        let ruta = normalizar_relativa(ruta);
        self.archivos
            .lock()
            .unwrap()
            .insert(ruta.clone(), bytes.to_vec());
        Ok(ruta)
    }

    async fn eliminar(&self, ruta: &str) -> Result<()> {
        let quitado = self.archivos.lock().unwrap().remove(ruta);
        if quitado.is_none() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                Path::new(ruta).display().to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_folds_accents_and_spaces() {
        assert_eq!(slug_carpeta("San Vicente"), "San_Vicente");
        assert_eq!(slug_carpeta("Delegación Río Grande"), "Delegacion_Rio_Grande");
        assert_eq!(slug_carpeta(""), "sin-delegacion");
        assert_eq!(slug_carpeta("  ¡!  "), "sin-delegacion");
    }

    #[tokio::test]
    async fn mem_store_round_trips() {
        let store = MemStore::new();
        let ruta = store.guardar("guias/X/1.jpg", b"bytes").await.unwrap();
        assert_eq!(ruta, "/guias/X/1.jpg");
        assert!(store.contiene("/guias/X/1.jpg"));
        store.eliminar("/guias/X/1.jpg").await.unwrap();
        assert!(!store.contiene("/guias/X/1.jpg"));
    }

    #[tokio::test]
    async fn mem_store_delete_of_missing_path_errors() {
        let store = MemStore::new();
        assert!(store.eliminar("/no-existe.jpg").await.is_err());
    }
}
