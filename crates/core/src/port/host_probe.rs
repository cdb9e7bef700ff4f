// Host probe port (hostname and CPU information)

/// Host probe port
///
/// Hostname drives per-host queue assignment and `@name` scoping; the CPU
/// count is the default max-load hint.
pub trait HostProbe: Send + Sync {
    /// Hostname of the local machine
    fn hostname(&self) -> String;

    /// Number of logical CPUs
    fn cpu_count(&self) -> usize;
}

pub mod mocks {
    use super::*;

    /// Fixed host identity for testing
    pub struct MockHostProbe {
        hostname: String,
        cpu_count: usize,
    }

    impl MockHostProbe {
        pub fn new(hostname: impl Into<String>, cpu_count: usize) -> Self {
            Self {
                hostname: hostname.into(),
                cpu_count,
            }
        }
    }

    impl HostProbe for MockHostProbe {
        fn hostname(&self) -> String {
            self.hostname.clone()
        }
        fn cpu_count(&self) -> usize {
            self.cpu_count
        }
    }
}
