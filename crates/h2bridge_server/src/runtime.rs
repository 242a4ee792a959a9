//! Java runtime discovery.

use crate::error::{H2Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locate the Java executable.
///
/// An explicit path must exist. Otherwise `java` is looked up on `PATH`,
/// then under `$JAVA_HOME/bin`.
pub fn find_java(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(H2Error::runtime_not_found(format!(
            "{} does not exist",
            path.display()
        )));
    }

    if let Ok(path) = which::which("java") {
        debug!("Found java on PATH: {}", path.display());
        return Ok(path);
    }

    if let Some(path) = java_home_candidate(std::env::var_os("JAVA_HOME").map(PathBuf::from)) {
        debug!("Found java under JAVA_HOME: {}", path.display());
        return Ok(path);
    }

    Err(H2Error::runtime_not_found(
        "`java` is not on PATH and JAVA_HOME is not set to a JDK/JRE",
    ))
}

/// Check if a Java runtime can be found.
pub fn is_java_available() -> bool {
    find_java(None).is_ok()
}

fn java_home_candidate(java_home: Option<PathBuf>) -> Option<PathBuf> {
    let bin = java_home?.join("bin");
    [bin.join("java"), bin.join("java.exe")]
        .into_iter()
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_java_must_exist() {
        let tmp = TempDir::new().unwrap();
        let err = find_java(Some(&tmp.path().join("java"))).unwrap_err();
        assert!(matches!(err, H2Error::RuntimeNotFound(_)));
    }

    #[test]
    fn test_explicit_java_is_used() {
        let tmp = TempDir::new().unwrap();
        let java = tmp.path().join("java");
        std::fs::write(&java, b"").unwrap();
        assert_eq!(find_java(Some(&java)).unwrap(), java);
    }

    #[test]
    fn test_java_home_candidate() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(java_home_candidate(Some(tmp.path().to_path_buf())), None);

        std::fs::create_dir(tmp.path().join("bin")).unwrap();
        let java = tmp.path().join("bin").join("java");
        std::fs::write(&java, b"").unwrap();
        assert_eq!(java_home_candidate(Some(tmp.path().to_path_buf())), Some(java));
        assert_eq!(java_home_candidate(None), None);
    }
}
