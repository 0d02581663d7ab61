use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::constants::SPILL_PREFIX;
use crate::error::{CoordError, Result};

/// Lo que viaja por el KVS: el dato en sí, la ruta a un archivo de spill,
/// o la marca de "sin datos".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staged<T> {
    Inline(T),
    Spilled(PathBuf),
    Empty,
}

impl<T> Staged<T> {
    pub fn spill_path(&self) -> Option<&Path> {
        match self {
            Staged::Spilled(p) => Some(p),
            _ => None,
        }
    }
}

/// Prepara `value` para el KVS: directo si no hay directorio de spill,
/// o escrito a un archivo nuevo dentro de `spill_dir`.
pub fn stage<T: Serialize>(value: T, spill_dir: Option<&Path>) -> Result<Staged<T>> {
    match spill_dir {
        None => Ok(Staged::Inline(value)),
        Some(dir) => Ok(Staged::Spilled(write_spill(dir, &value)?)),
    }
}

/// Recupera el dato. Con `remove = true` borra el archivo después de leerlo.
/// `Empty` devuelve `None`.
pub fn unstage<T: DeserializeOwned>(staged: Staged<T>, remove: bool) -> Result<Option<T>> {
    match staged {
        Staged::Inline(v) => Ok(Some(v)),
        Staged::Empty => Ok(None),
        Staged::Spilled(path) => {
            let value = read_spill(&path)?;
            if remove {
                remove_spill(&path)?;
            }
            Ok(Some(value))
        }
    }
}

/// Escribe `value` como JSON en un archivo `kvs-<uuid>.json` nuevo.
pub fn write_spill<T: Serialize + ?Sized>(dir: &Path, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| CoordError::io(dir, e))?;

    let filename = format!("{}-{}.json", SPILL_PREFIX, uuid::Uuid::new_v4());
    let path = dir.join(filename);

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| CoordError::io(&path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(|e| CoordError::io(&path, e))?;

    debug!("spill escrito en {}", path.display());
    Ok(path)
}

pub fn read_spill<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| CoordError::io(path, e))?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

pub fn remove_spill(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| CoordError::io(path, e))?;
    debug!("spill borrado: {}", path.display());
    Ok(())
}
