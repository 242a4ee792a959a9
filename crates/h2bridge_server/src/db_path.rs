//! Splitting an H2 database file path into base directory and database name.
//!
//! H2 is started with `-baseDir <dir>` and clients connect with
//! `dbname=<name>`, so `/data/genes.mv.db` becomes (`/data`, `genes`).

use crate::error::{H2Error, Result};
use std::path::{Path, PathBuf};

/// Suffix of H2 MVStore database files.
pub const DB_FILE_SUFFIX: &str = ".mv.db";

/// Split `path` into (directory, database name) without touching the file system.
///
/// A trailing [`DB_FILE_SUFFIX`] is stripped first. A bare file name gets
/// directory `.`.
pub fn split_db_file_name(path: &Path) -> (PathBuf, String) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = file_name
        .strip_suffix(DB_FILE_SUFFIX)
        .unwrap_or(&file_name)
        .to_string();

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    (dir, name)
}

/// Check that `path` is an existing file, then split it.
pub fn split_db_path(path: &Path) -> Result<(PathBuf, String)> {
    if !path.is_file() {
        return Err(H2Error::InvalidDatabasePath(path.to_path_buf()));
    }
    Ok(split_db_file_name(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_strips_suffix() {
        let (dir, name) = split_db_file_name(Path::new("/d/f.mv.db"));
        assert_eq!(dir, PathBuf::from("/d"));
        assert_eq!(name, "f");
    }

    #[test]
    fn test_split_without_suffix() {
        let (dir, name) = split_db_file_name(Path::new("/d/f"));
        assert_eq!(dir, PathBuf::from("/d"));
        assert_eq!(name, "f");
    }

    #[test]
    fn test_split_only_strips_full_suffix() {
        let (_, name) = split_db_file_name(Path::new("/d/f.db"));
        assert_eq!(name, "f.db");
        let (_, name) = split_db_file_name(Path::new("/d/f.mv.db.bak"));
        assert_eq!(name, "f.mv.db.bak");
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, name) = split_db_file_name(Path::new("genes.mv.db"));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "genes");
    }

    #[test]
    fn test_split_db_path_existing_file() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("hg19_sv_database.mv.db");
        std::fs::write(&db, b"").unwrap();

        let (dir, name) = split_db_path(&db).unwrap();
        assert_eq!(dir, tmp.path());
        assert_eq!(name, "hg19_sv_database");
    }

    #[test]
    fn test_split_db_path_missing_file() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("missing.mv.db");

        let err = split_db_path(&db).unwrap_err();
        assert!(matches!(err, H2Error::InvalidDatabasePath(p) if p == db));
        assert!(!db.exists());
    }

    #[test]
    fn test_split_db_path_rejects_directory() {
        let tmp = TempDir::new().unwrap();
        let err = split_db_path(tmp.path()).unwrap_err();
        assert!(matches!(err, H2Error::InvalidDatabasePath(_)));
    }
}
