//! Datastore schema.
//!
//! The unique indexes on `(numero, delegacion_id)` — one for owned rows, one
//! for the orphan bucket — are the authoritative guarantee behind the
//! repository's create pre-checks. The pre-check only exists to produce a
//! friendly conflict before the insert; the index is what holds under
//! concurrent writers.

use sqlx::SqlitePool;

use crate::error::Result;

/// Full DDL, idempotent.
pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS delegaciones (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre       TEXT NOT NULL,
    email        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS titulares (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    razon_social TEXT,
    cuit         TEXT,
    nombre       TEXT,
    apellido     TEXT
);

CREATE TABLE IF NOT EXISTS guias (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    numero            TEXT NOT NULL,
    fecha_emision     TEXT,
    fecha_vencimiento TEXT,
    fecha_carga       TEXT NOT NULL,
    fecha_entrega     TEXT,
    en_deposito       INTEGER NOT NULL DEFAULT 0,
    devuelta          INTEGER NOT NULL DEFAULT 0,
    informada         INTEGER NOT NULL DEFAULT 0,
    titular           TEXT,
    destino           TEXT,
    titular_id        INTEGER REFERENCES titulares(id),
    delegacion_id     INTEGER REFERENCES delegaciones(id),
    estado            INTEGER NOT NULL DEFAULT 3
);

CREATE UNIQUE INDEX IF NOT EXISTS guias_numero_por_delegacion
    ON guias (numero, delegacion_id) WHERE delegacion_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS guias_numero_huerfano
    ON guias (numero) WHERE delegacion_id IS NULL;

CREATE TABLE IF NOT EXISTS remitos (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    numero            TEXT NOT NULL,
    fecha_vencimiento TEXT,
    guia_numero       TEXT,
    fecha_carga       TEXT NOT NULL,
    fecha_devolucion  TEXT,
    devuelto          INTEGER NOT NULL DEFAULT 0,
    delegacion_id     INTEGER REFERENCES delegaciones(id),
    guia_id           INTEGER REFERENCES guias(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS remitos_numero_por_delegacion
    ON remitos (numero, delegacion_id) WHERE delegacion_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS remitos_numero_huerfano
    ON remitos (numero) WHERE delegacion_id IS NULL;

CREATE TABLE IF NOT EXISTS guias_delegaciones (
    guia_id       INTEGER NOT NULL REFERENCES guias(id),
    delegacion_id INTEGER NOT NULL REFERENCES delegaciones(id),
    PRIMARY KEY (guia_id, delegacion_id)
);

CREATE TABLE IF NOT EXISTS guias_imagenes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    documento_id INTEGER NOT NULL REFERENCES guias(id),
    path         TEXT NOT NULL,
    nombre       TEXT NOT NULL,
    mime         TEXT,
    tamano       INTEGER,
    gps_lat      REAL,
    gps_lng      REAL,
    gps_alt      REAL,
    creada_el    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS remitos_imagenes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    documento_id INTEGER NOT NULL REFERENCES remitos(id),
    path         TEXT NOT NULL,
    nombre       TEXT NOT NULL,
    mime         TEXT,
    tamano       INTEGER,
    gps_lat      REAL,
    gps_lng      REAL,
    gps_alt      REAL,
    creada_el    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS guias_observaciones (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    guia_id    INTEGER NOT NULL REFERENCES guias(id),
    usuario_id INTEGER,
    texto      TEXT NOT NULL,
    fecha      TEXT NOT NULL
);
"#;

/// Applies the schema to a pool. Safe to call repeatedly.
pub async fn aplicar(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(DDL).execute(pool).await?;
    Ok(())
}
