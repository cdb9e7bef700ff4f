// File-backed configuration source
// reason: config crate for layered TOML + environment loading
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

use hive_core::domain::MasterConfig;
use hive_core::port::ConfigSource;
use hive_core::{AppError, Result};

/// Prefix of environment overrides, e.g. `HIVE__MANAGER__PORT=16502`
const ENV_PREFIX: &str = "HIVE";
const ENV_SEPARATOR: &str = "__";

/// Reloadable configuration read from a TOML file
///
/// ```toml
/// worker_command = ["my-worker", "--verbose"]
/// max_load = 4
///
/// [workers]
/// web1 = "3*default,@local"
///
/// [manager]
/// host = "10.0.0.5"
/// port = 16501
/// ```
pub struct FileConfigSource {
    path: PathBuf,
    active: RwLock<MasterConfig>,
}

impl FileConfigSource {
    /// Load the configuration file
    ///
    /// # Errors
    /// - AppError::Config if the file is missing or malformed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load(&path)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(Self {
            path,
            active: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Result<MasterConfig> {
    Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize::<MasterConfig>())
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
}

impl ConfigSource for FileConfigSource {
    fn current(&self) -> MasterConfig {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn supports_reload(&self) -> bool {
        true
    }

    fn reload(&self) -> Result<()> {
        let config = load(&self.path)?;
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = config;
        info!(path = %self.path.display(), "Configuration reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(file: &tempfile::NamedTempFile, body: &str) {
        std::fs::write(file.path(), body).unwrap();
    }

    fn toml_file(body: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write_config(&file, body);
        file
    }

    #[test]
    fn test_loads_workers_and_manager() {
        let file = toml_file(
            r#"
            worker_command = ["my-worker", "-v"]
            max_load = 3

            [workers]
            web1 = "2*a,@b"

            [manager]
            host = "10.0.0.5"
            port = 17000
            "#,
        );

        let source = FileConfigSource::open(file.path()).unwrap();
        let config = source.current();

        assert_eq!(config.queues_for_host("web1"), Some("2*a,@b"));
        assert_eq!(config.manager.host, "10.0.0.5");
        assert_eq!(config.manager.port, 17000);
        assert_eq!(config.max_load, Some(3));
        assert_eq!(config.worker_command, vec!["my-worker", "-v"]);
        assert!(source.supports_reload());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let file = toml_file("worker_command = [\"w\"]\n");

        let config = FileConfigSource::open(file.path()).unwrap().current();

        assert!(config.workers.is_empty());
        assert_eq!(config.manager.port, 16501);
        assert_eq!(config.max_load, None);
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let file = toml_file("[workers]\nweb1 = \"a\"\n");
        let source = FileConfigSource::open(file.path()).unwrap();

        write_config(&file, "[workers]\nweb1 = \"b,c\"\n");
        tokio_test::assert_ok!(source.reload());

        assert_eq!(source.current().queues_for_host("web1"), Some("b,c"));
    }

    #[test]
    fn test_failed_reload_keeps_previous_config() {
        let file = toml_file("[workers]\nweb1 = \"a\"\n");
        let source = FileConfigSource::open(file.path()).unwrap();

        write_config(&file, "[workers\n");
        let result = source.reload();

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(source.current().queues_for_host("web1"), Some("a"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = FileConfigSource::open("/nonexistent/hive/config.toml");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
