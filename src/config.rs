//! Engine configuration.
//!
//! Every field has a default, so an empty TOML file is a valid
//! configuration:
//!
//! ```toml
//! database_path = "/var/lib/scanward/scanward.db"
//! quarantine_dir = "/var/lib/scanward/quarantine"
//! cloud_enabled = true
//! cloud_timeout = 10000   # milliseconds
//!
//! [logging]
//! level = "debug"
//! directory = "/var/log/scanward"
//! ```

use crate::core::error::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions examined by a quick scan.
pub const QUICK_EXTENSIONS: [&str; 4] = [".exe", ".doc", ".pdf", ".zip"];

/// Extensions examined by full and custom scans.
pub const FULL_EXTENSIONS: [&str; 5] = [".exe", ".doc", ".pdf", ".zip", ".rar"];

/// Lower-cases an extension and gives it a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

fn default_quick_roots() -> Vec<PathBuf> {
    match directories::UserDirs::new() {
        Some(user) => {
            let home = user.home_dir().to_path_buf();
            vec![
                user.download_dir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| home.join("Downloads")),
                user.desktop_dir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| home.join("Desktop")),
                user.document_dir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| home.join("Documents")),
            ]
        }
        None => Vec::new(),
    }
}

fn default_full_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![PathBuf::from("C:/"), PathBuf::from("D:/")]
    } else {
        vec![PathBuf::from("/")]
    }
}

fn to_strings(exts: &[&str]) -> Vec<String> {
    exts.iter().map(|e| e.to_string()).collect()
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated log files; stderr only when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Configuration for the [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Quarantine area. Must be on the same volume as scanned files.
    pub quarantine_dir: PathBuf,

    /// Optional signature file loaded on top of the built-in signatures.
    pub signature_file: Option<PathBuf>,

    /// Roots walked by a quick scan.
    pub quick_scan_roots: Vec<PathBuf>,

    /// Roots walked by a full scan.
    pub full_scan_roots: Vec<PathBuf>,

    /// Extensions examined by a quick scan.
    pub quick_extensions: Vec<String>,

    /// Extensions examined by full and custom scans.
    pub extensions: Vec<String>,

    /// Whether files are also submitted to the cloud service.
    pub cloud_enabled: bool,

    /// Upper bound on one cloud submission.
    #[serde(with = "duration_ms")]
    pub cloud_timeout: Duration,

    /// Read buffer size for fingerprinting.
    pub hash_chunk_size: usize,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("scanward.db"),
            quarantine_dir: PathBuf::from("quarantine"),
            signature_file: None,
            quick_scan_roots: default_quick_roots(),
            full_scan_roots: default_full_roots(),
            quick_extensions: to_strings(&QUICK_EXTENSIONS),
            extensions: to_strings(&FULL_EXTENSIONS),
            cloud_enabled: false,
            cloud_timeout: Duration::from_secs(30),
            hash_chunk_size: crate::core::hasher::DEFAULT_CHUNK_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that keeps all state under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::default()
            .with_database_path(dir.join("scanward.db"))
            .with_quarantine_dir(dir.join("quarantine"))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Sets the database path.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sets the quarantine area.
    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = dir.into();
        self
    }

    /// Sets the signature file.
    pub fn with_signature_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.signature_file = Some(path.into());
        self
    }

    /// Sets the quick scan roots.
    pub fn with_quick_scan_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.quick_scan_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the full scan roots.
    pub fn with_full_scan_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.full_scan_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the extensions examined by full and custom scans.
    pub fn with_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = exts.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        self
    }

    /// Sets the extensions examined by a quick scan.
    pub fn with_quick_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.quick_extensions = exts.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        self
    }

    /// Enables or disables cloud detection.
    pub fn with_cloud_enabled(mut self, enabled: bool) -> Self {
        self.cloud_enabled = enabled;
        self
    }

    /// Sets the cloud submission timeout.
    pub fn with_cloud_timeout(mut self, timeout: Duration) -> Self {
        self.cloud_timeout = timeout;
        self
    }

    /// Sets the fingerprint read buffer size.
    pub fn with_hash_chunk_size(mut self, size: usize) -> Self {
        self.hash_chunk_size = size;
        self
    }

    /// Sets the logging configuration.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Lower-cases extensions and adds missing leading dots.
    pub fn normalize(&mut self) {
        for exts in [&mut self.quick_extensions, &mut self.extensions] {
            for ext in exts.iter_mut() {
                *ext = normalize_extension(ext);
            }
            exts.sort();
            exts.dedup();
        }
    }

    /// Checks that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "hash_chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cloud_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "cloud_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.quarantine_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "quarantine_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.database_path, PathBuf::from("scanward.db"));
        assert_eq!(config.hash_chunk_size, 4096);
        assert_eq!(config.cloud_timeout, Duration::from_secs(30));
        assert!(!config.cloud_enabled);
        assert_eq!(config.quick_extensions, vec![".exe", ".doc", ".pdf", ".zip"]);
        assert!(config.extensions.contains(&".rar".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.database_path, PathBuf::from("scanward.db"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_toml_overrides_and_normalises() {
        let config = EngineConfig::from_toml_str(
            r#"
            quarantine_dir = "/tmp/q"
            extensions = ["EXE", ".Pdf", "exe"]
            cloud_enabled = true
            cloud_timeout = 1500

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.quarantine_dir, PathBuf::from("/tmp/q"));
        assert_eq!(config.extensions, vec![".exe", ".pdf"]);
        assert!(config.cloud_enabled);
        assert_eq!(config.cloud_timeout, Duration::from_millis(1500));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = EngineConfig::from_toml_str("hash_chunk_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "hash_chunk_size",
                ..
            }
        ));

        let err = EngineConfig::from_toml_str("cloud_timeout = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "cloud_timeout", .. }));

        let err = EngineConfig::from_toml_str("quarantine_dir = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "quarantine_dir", .. }));
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        let err = EngineConfig::from_toml_str("cloud_enabled = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanward.toml");
        std::fs::write(&path, "signature_file = \"sigs.txt\"\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.signature_file, Some(PathBuf::from("sigs.txt")));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("EXE"), ".exe");
        assert_eq!(normalize_extension(".Zip"), ".zip");
        assert_eq!(normalize_extension(" pdf "), ".pdf");
    }

    #[test]
    fn test_in_dir() {
        let config = EngineConfig::in_dir("/data");
        assert_eq!(config.database_path, PathBuf::from("/data/scanward.db"));
        assert_eq!(config.quarantine_dir, PathBuf::from("/data/quarantine"));
    }
}
