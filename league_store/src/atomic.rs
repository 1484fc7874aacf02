//! Write-temp-then-rename atomic file replacement (spec §4.5).
//!
//! A reader that opens the path at any point sees either the old complete
//! contents or the new complete contents, never a partial write — `rename`
//! within the same filesystem is atomic on the platforms this runs on.

use std::fs;
use std::path::Path;

use crate::error::StoreError;

pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("store");
    let tmp_path = dir.join(format!(".{file_name}.tmp-{}", std::process::id()));
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&path, &Sample { value: 42 }).unwrap();
        let back: Sample = read_json(&path).unwrap();
        assert_eq!(back, Sample { value: 42 });
    }

    #[test]
    fn write_atomic_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&path, &Sample { value: 1 }).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn read_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let result: Result<Sample, StoreError> = read_json(&path);
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn overwrite_replaces_contents_fully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json(&path, &Sample { value: 1 }).unwrap();
        write_json(&path, &Sample { value: 2 }).unwrap();
        let back: Sample = read_json(&path).unwrap();
        assert_eq!(back, Sample { value: 2 });
    }
}
