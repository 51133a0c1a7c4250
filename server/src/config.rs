//! Server configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PRINT_DPI: u32 = 300;
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_FIELD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 2;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 250;

/// Room for multipart boundaries and part headers on top of the payload limits.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Rendered artifacts root, served at `/output`.
    pub output_dir: PathBuf,
    /// Template and material backgrounds.
    pub asset_dir: PathBuf,
    /// Root for QR images referenced by path.
    pub qr_asset_dir: PathBuf,
    pub font_dir: PathBuf,
    pub print_dpi: u32,
    pub max_file_bytes: usize,
    pub max_field_bytes: usize,
    pub max_files: usize,
    pub flush_interval_ms: u64,
}

impl ServerConfig {
    /// Defaults for everything except the database URL.
    #[must_use]
    pub fn with_defaults(database_url: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: database_url.into(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            output_dir: PathBuf::from("./output"),
            asset_dir: PathBuf::from("./assets"),
            qr_asset_dir: PathBuf::from("./assets/qr"),
            font_dir: PathBuf::from("./assets/fonts"),
            print_dpi: DEFAULT_PRINT_DPI,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            max_files: DEFAULT_MAX_FILES,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
        }
    }

    /// Build typed config from environment variables.
    ///
    /// Required: `DATABASE_URL`. Everything else falls back to its default
    /// when absent or unparsable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `DATABASE_URL` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let d = Self::with_defaults(database_url);
        Ok(Self {
            port: env_parse("PORT", d.port),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", d.db_max_connections),
            output_dir: env_path("OUTPUT_DIR", d.output_dir),
            asset_dir: env_path("ASSET_DIR", d.asset_dir),
            qr_asset_dir: env_path("QR_ASSET_DIR", d.qr_asset_dir),
            font_dir: env_path("FONT_DIR", d.font_dir),
            print_dpi: env_parse("PRINT_DPI", d.print_dpi).max(1),
            max_file_bytes: env_parse("MAX_FILE_BYTES", d.max_file_bytes),
            max_field_bytes: env_parse("MAX_FIELD_BYTES", d.max_field_bytes),
            max_files: env_parse("MAX_FILES", d.max_files),
            flush_interval_ms: env_parse("DESIGN_FLUSH_INTERVAL_MS", d.flush_interval_ms),
            database_url: d.database_url,
        })
    }

    /// Request body ceiling for a submission: the text field, every allowed
    /// file, and multipart framing.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.max_field_bytes
            .saturating_add(self.max_files.saturating_mul(self.max_file_bytes))
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(key).map_or(default, PathBuf::from)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
