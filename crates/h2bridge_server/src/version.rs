//! Supported H2 engine versions and the bundled jar layout.

use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable that overrides the jar directory.
pub const JAR_DIR_ENV: &str = "H2BRIDGE_JAR_DIR";

/// Bundled H2 server release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum H2Version {
    V1_4_199,
    V1_4_200,
    V2_1_212,
    V2_1_214,
}

impl H2Version {
    /// Version used when the requested one is not supported.
    pub const DEFAULT: H2Version = H2Version::V1_4_200;

    /// Every supported version, oldest first.
    pub const ALL: [H2Version; 4] = [
        H2Version::V1_4_199,
        H2Version::V1_4_200,
        H2Version::V2_1_212,
        H2Version::V2_1_214,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            H2Version::V1_4_199 => "1.4.199",
            H2Version::V1_4_200 => "1.4.200",
            H2Version::V2_1_212 => "2.1.212",
            H2Version::V2_1_214 => "2.1.214",
        }
    }

    /// Exact match against the allow-list.
    pub fn parse(s: &str) -> Option<H2Version> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }

    /// File name of the bundled jar, e.g. `h2-1.4.200.jar`.
    pub fn jar_file_name(&self) -> String {
        format!("h2-{}.jar", self.as_str())
    }

    /// Path of the jar for this version inside `jar_dir`.
    pub fn jar_path(&self, jar_dir: &Path) -> PathBuf {
        jar_dir.join(self.jar_file_name())
    }
}

impl Default for H2Version {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for H2Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching a requested version string against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionResolution {
    pub version: H2Version,
    /// True when the request was not supported and `version` is the default.
    pub fell_back: bool,
}

/// Resolve a requested version string.
///
/// Unsupported strings are not an error: they resolve to
/// [`H2Version::DEFAULT`] with `fell_back` set. Callers decide whether to log.
pub fn resolve_version(requested: &str) -> VersionResolution {
    match H2Version::parse(requested) {
        Some(version) => VersionResolution {
            version,
            fell_back: false,
        },
        None => VersionResolution {
            version: H2Version::DEFAULT,
            fell_back: true,
        },
    }
}

/// Default jar directory: `$H2BRIDGE_JAR_DIR`, else `~/.h2bridge/jar`.
pub fn default_jar_dir() -> PathBuf {
    match std::env::var_os(JAR_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => h2bridge_logging::jar_dir(),
    }
}

/// A jar file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredJar {
    /// Version string taken from the file name
    pub version: String,
    pub path: PathBuf,
    /// Parsed version, `None` if the file is not in the allow-list
    pub supported: Option<H2Version>,
}

fn jar_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^h2-(?P<version>\d\.\d\.\d{3})\.jar$").expect("static jar regex is valid")
    })
}

/// List H2 jars in `dir`, sorted by version string.
pub fn discover_jars(dir: &Path) -> io::Result<Vec<DiscoveredJar>> {
    let re = jar_name_regex();
    let mut jars = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = re.captures(name) {
            let version = caps["version"].to_string();
            jars.push(DiscoveredJar {
                supported: H2Version::parse(&version),
                version,
                path: entry.path(),
            });
        }
    }

    jars.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(jars)
}
