// Control-plane Messages (master <-> manager)

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Outbound status report sent to the manager on every link iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub hostname: String,
    pub uptime: i64, // seconds
}

/// Inbound command as it arrives on the wire
///
/// Only a name and loosely typed arguments; must be converted into a
/// [`ManagerCommand`] before anything is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default)]
    pub kwargs: serde_json::Map<String, serde_json::Value>,
}

/// Closed set of operations the manager may invoke on the master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerCommand {
    /// `reload`
    Reload,
    /// `stop_workers(kill=false)`
    StopWorkers { kill: bool },
    /// `warm_shutdown`
    WarmShutdown,
    /// `cold_shutdown`
    ColdShutdown,
}

impl RawCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            kwargs: serde_json::Map::new(),
        }
    }

    /// Look up a boolean argument by keyword or position
    fn bool_arg(&self, name: &str, position: usize) -> Result<Option<bool>> {
        let value = self.kwargs.get(name).or_else(|| self.args.get(position));
        match value {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(DomainError::InvalidCommandArgs {
                command: self.command.clone(),
                reason: format!("{} must be a boolean, got {}", name, other),
            }),
        }
    }

    fn expect_no_args(&self) -> Result<()> {
        if self.args.is_empty() && self.kwargs.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidCommandArgs {
                command: self.command.clone(),
                reason: "takes no arguments".to_string(),
            })
        }
    }
}

impl TryFrom<&RawCommand> for ManagerCommand {
    type Error = DomainError;

    fn try_from(raw: &RawCommand) -> Result<Self> {
        match raw.command.as_str() {
            "reload" => raw.expect_no_args().map(|_| ManagerCommand::Reload),
            "stop_workers" => Ok(ManagerCommand::StopWorkers {
                kill: raw.bool_arg("kill", 0)?.unwrap_or(false),
            }),
            "warm_shutdown" => raw.expect_no_args().map(|_| ManagerCommand::WarmShutdown),
            "cold_shutdown" => raw.expect_no_args().map(|_| ManagerCommand::ColdShutdown),
            other => Err(DomainError::UnknownCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for ManagerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerCommand::Reload => write!(f, "reload"),
            ManagerCommand::StopWorkers { kill } => write!(f, "stop_workers(kill={})", kill),
            ManagerCommand::WarmShutdown => write!(f, "warm_shutdown"),
            ManagerCommand::ColdShutdown => write!(f, "cold_shutdown"),
        }
    }
}
