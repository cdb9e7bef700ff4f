// Host probe implementation
// reason: sysinfo for cross-platform host information
use sysinfo::System;
use tracing::debug;

use hive_core::port::HostProbe;

const UNKNOWN_HOSTNAME: &str = "localhost";

/// Host probe implementation using sysinfo
///
/// Values are read once at construction; hostname and CPU count do not
/// change for the lifetime of the master.
pub struct SystemHostProbe {
    hostname: String,
    cpu_count: usize,
}

impl SystemHostProbe {
    /// Create a new host probe
    ///
    /// # Example
    /// ```ignore
    /// let probe = SystemHostProbe::new();
    /// ```
    pub fn new() -> Self {
        let hostname = System::host_name().unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string());

        let mut sys = System::new();
        sys.refresh_cpu();
        let cpu_count = sys.cpus().len().max(1);

        debug!(hostname = %hostname, cpu_count = %cpu_count, "Host probed");

        Self {
            hostname,
            cpu_count,
        }
    }
}

impl Default for SystemHostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SystemHostProbe {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn cpu_count(&self) -> usize {
        self.cpu_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reports_host() {
        let probe = SystemHostProbe::new();

        assert!(!probe.hostname().is_empty());
        assert!(probe.cpu_count() >= 1);
    }
}
