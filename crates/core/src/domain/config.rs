// Master Configuration Model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_MANAGER_HOST: &str = "127.0.0.1";
const DEFAULT_MANAGER_PORT: u16 = 16501;

/// Remote manager address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for ManagerEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_MANAGER_HOST.to_string(),
            port: DEFAULT_MANAGER_PORT,
        }
    }
}

impl std::fmt::Display for ManagerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Configuration consumed by the master
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// hostname -> queue spec
    pub workers: HashMap<String, String>,
    pub manager: ManagerEndpoint,
    /// Max load hint for workers (None = host CPU count)
    pub max_load: Option<usize>,
    /// Program and arguments of the external worker process
    pub worker_command: Vec<String>,
}

impl MasterConfig {
    /// Queue spec assigned to a host, if any
    pub fn queues_for_host(&self, hostname: &str) -> Option<&str> {
        self.workers.get(hostname).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MasterConfig::default();
        assert!(config.workers.is_empty());
        assert_eq!(config.manager.to_string(), "127.0.0.1:16501");
        assert_eq!(config.max_load, None);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: MasterConfig =
            serde_json::from_value(serde_json::json!({"workers": {"web1": "a,b"}})).unwrap();
        assert_eq!(config.queues_for_host("web1"), Some("a,b"));
        assert_eq!(config.queues_for_host("web2"), None);
        assert_eq!(config.manager, ManagerEndpoint::default());
    }
}
