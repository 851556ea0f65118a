use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn to_json<T: Serialize>(obj: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(obj)?)
}

pub fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

pub fn slurp_file<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs_err::read_to_string(path.as_ref())?)
}

/// Writes the entire string at once, creating parent directories as needed.
pub fn write_string<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }
    fs_err::write(path, contents)?;
    Ok(())
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, obj: &T) -> Result<()> {
    let path = path.as_ref();
    write_string(path, &to_json(obj)?)?;
    info!("Wrote {}", path.display());
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
    let path = path.as_ref();
    let raw = slurp_file(path)?;
    from_json(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// The file name without its directory or extension.
pub fn basename<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_default()
}
