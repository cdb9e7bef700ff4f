// Configuration Source Port

use crate::domain::MasterConfig;
use crate::error::{AppError, Result};

/// Configuration source port
///
/// Implementations:
/// - StaticConfigSource: in-memory, not reloadable
/// - FileConfigSource: TOML file + environment (infra-system), reloadable
pub trait ConfigSource: Send + Sync {
    /// Snapshot of the active configuration
    fn current(&self) -> MasterConfig;

    /// Whether `reload` can re-read a backing source
    fn supports_reload(&self) -> bool;

    /// Re-read the backing source and replace the active configuration
    ///
    /// # Errors
    /// - AppError::ReloadUnsupported when there is no backing source
    /// - AppError::Config when the source cannot be read or parsed
    fn reload(&self) -> Result<()>;
}

/// In-memory configuration without a backing source
pub struct StaticConfigSource {
    config: MasterConfig,
}

impl StaticConfigSource {
    pub fn new(config: MasterConfig) -> Self {
        Self { config }
    }
}

impl ConfigSource for StaticConfigSource {
    fn current(&self) -> MasterConfig {
        self.config.clone()
    }

    fn supports_reload(&self) -> bool {
        false
    }

    fn reload(&self) -> Result<()> {
        Err(AppError::ReloadUnsupported)
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Reloadable config whose "backing source" is set by the test
    pub struct MockReloadableConfig {
        active: Mutex<MasterConfig>,
        source: Mutex<MasterConfig>,
        reloads: Mutex<usize>,
    }

    impl MockReloadableConfig {
        pub fn new(config: MasterConfig) -> Self {
            Self {
                active: Mutex::new(config.clone()),
                source: Mutex::new(config),
                reloads: Mutex::new(0),
            }
        }

        /// Change the backing source; visible after the next reload
        pub fn set_source(&self, config: MasterConfig) {
            *self.source.lock().unwrap() = config;
        }

        pub fn reload_count(&self) -> usize {
            *self.reloads.lock().unwrap()
        }
    }

    impl ConfigSource for MockReloadableConfig {
        fn current(&self) -> MasterConfig {
            self.active.lock().unwrap().clone()
        }

        fn supports_reload(&self) -> bool {
            true
        }

        fn reload(&self) -> Result<()> {
            let source = self.source.lock().unwrap().clone();
            *self.active.lock().unwrap() = source;
            *self.reloads.lock().unwrap() += 1;
            Ok(())
        }
    }
}
