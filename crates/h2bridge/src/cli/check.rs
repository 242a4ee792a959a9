//! `h2bridge check`: environment report.

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use h2bridge_server::version::default_jar_dir;
use h2bridge_server::{discover_jars, find_java, H2Version};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct CheckReport {
    java: Option<PathBuf>,
    java_error: Option<String>,
    jar_dir: PathBuf,
    versions: Vec<VersionStatus>,
    /// Jars in the directory that are not in the allow-list
    unsupported_jars: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VersionStatus {
    version: &'static str,
    default: bool,
    present: bool,
}

impl CheckReport {
    fn ready(&self) -> bool {
        self.java.is_some()
            && self
                .versions
                .iter()
                .any(|v| v.default && v.present)
    }
}

pub fn run(java: Option<PathBuf>, jar_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let jar_dir = jar_dir.unwrap_or_else(default_jar_dir);
    let report = build_report(java.as_deref(), jar_dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.ready() {
        bail!("environment is not ready to run the default H2 version");
    }
    Ok(())
}

fn build_report(java: Option<&Path>, jar_dir: PathBuf) -> CheckReport {
    let (java, java_error) = match find_java(java) {
        Ok(path) => (Some(path), None),
        Err(e) => (None, Some(e.to_string())),
    };

    // A missing directory just means no jars are installed yet.
    let jars = discover_jars(&jar_dir).unwrap_or_default();

    let versions = H2Version::ALL
        .iter()
        .map(|v| VersionStatus {
            version: v.as_str(),
            default: *v == H2Version::DEFAULT,
            present: jars.iter().any(|j| j.supported == Some(*v)),
        })
        .collect();

    let unsupported_jars = jars
        .iter()
        .filter(|j| j.supported.is_none())
        .map(|j| j.version.clone())
        .collect();

    CheckReport {
        java,
        java_error,
        jar_dir,
        versions,
        unsupported_jars,
    }
}

fn print_report(report: &CheckReport) {
    match (&report.java, &report.java_error) {
        (Some(path), _) => println!("java:    {}", path.display()),
        (None, Some(err)) => println!("java:    not found ({})", err),
        (None, None) => println!("java:    not found"),
    }
    println!("jar dir: {}", report.jar_dir.display());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Version", "Default", "Jar"]);
    for status in &report.versions {
        table.add_row(vec![
            status.version,
            if status.default { "yes" } else { "" },
            if status.present { "present" } else { "missing" },
        ]);
    }
    println!("{table}");

    if !report.unsupported_jars.is_empty() {
        println!(
            "Ignoring unsupported jars: {}",
            report.unsupported_jars.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_with_default_jar() {
        let tmp = TempDir::new().unwrap();
        let java = tmp.path().join("java");
        std::fs::write(&java, b"").unwrap();
        std::fs::write(tmp.path().join("h2-1.4.200.jar"), b"").unwrap();
        std::fs::write(tmp.path().join("h2-1.3.176.jar"), b"").unwrap();

        let report = build_report(Some(&java), tmp.path().to_path_buf());
        assert_eq!(report.java, Some(java));
        assert!(report.ready());
        assert_eq!(report.unsupported_jars, vec!["1.3.176".to_string()]);

        let present: Vec<_> = report
            .versions
            .iter()
            .filter(|v| v.present)
            .map(|v| v.version)
            .collect();
        assert_eq!(present, ["1.4.200"]);
    }

    #[test]
    fn test_report_without_java_is_not_ready() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("h2-1.4.200.jar"), b"").unwrap();

        let report = build_report(Some(&tmp.path().join("no-java")), tmp.path().to_path_buf());
        assert!(report.java.is_none());
        assert!(report.java_error.is_some());
        assert!(!report.ready());
    }

    #[test]
    fn test_report_missing_jar_dir() {
        let tmp = TempDir::new().unwrap();
        let java = tmp.path().join("java");
        std::fs::write(&java, b"").unwrap();

        let report = build_report(Some(&java), tmp.path().join("absent"));
        assert!(report.versions.iter().all(|v| !v.present));
        assert!(!report.ready());
    }
}
