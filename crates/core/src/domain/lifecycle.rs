// Master Lifecycle State Machine

/// Supervisor-wide lifecycle state
///
/// `Running` is initial. Both shutdown states keep shutdown pending forever;
/// a new master process is required to resume service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Running,
    WarmShutdown,
    ColdShutdown,
}

/// OS-level signals the master reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGQUIT
    Quit,
    /// SIGHUP
    HangUp,
}

/// Work the master must perform after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Send graceful termination to all workers
    StopGracefully,
    /// Kill all workers immediately
    KillAll,
    /// Reload configuration and restart the worker set
    Reload,
    Ignore,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Running => write!(f, "RUNNING"),
            LifecycleState::WarmShutdown => write!(f, "WARM_SHUTDOWN"),
            LifecycleState::ColdShutdown => write!(f, "COLD_SHUTDOWN"),
        }
    }
}

impl std::fmt::Display for MasterSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterSignal::Interrupt => write!(f, "SIGINT"),
            MasterSignal::Terminate => write!(f, "SIGTERM"),
            MasterSignal::Quit => write!(f, "SIGQUIT"),
            MasterSignal::HangUp => write!(f, "SIGHUP"),
        }
    }
}

impl LifecycleState {
    pub fn is_shutdown_pending(&self) -> bool {
        !matches!(self, LifecycleState::Running)
    }

    /// Compute the next state and the action to perform for a signal
    ///
    /// `interactive` tells whether the master's stdin is a terminal. An
    /// interrupt is a warm shutdown only when interactive and still running;
    /// otherwise it escalates straight to a cold shutdown.
    pub fn on_signal(self, signal: MasterSignal, interactive: bool) -> (Self, LifecycleAction) {
        use LifecycleAction::*;
        use LifecycleState::*;

        match (self, signal) {
            (ColdShutdown, _) => (ColdShutdown, Ignore),

            (Running, MasterSignal::Interrupt) if interactive => (WarmShutdown, StopGracefully),
            (_, MasterSignal::Interrupt) => (ColdShutdown, KillAll),

            (_, MasterSignal::Terminate) => (WarmShutdown, StopGracefully),
            (_, MasterSignal::Quit) => (ColdShutdown, KillAll),

            (Running, MasterSignal::HangUp) => (Running, Reload),
            (WarmShutdown, MasterSignal::HangUp) => (WarmShutdown, Ignore),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_starts_warm_shutdown() {
        let (state, action) = LifecycleState::Running.on_signal(MasterSignal::Terminate, false);
        assert_eq!(state, LifecycleState::WarmShutdown);
        assert_eq!(action, LifecycleAction::StopGracefully);
        assert!(state.is_shutdown_pending());
    }

    #[test]
    fn test_quit_is_cold_from_any_live_state() {
        for from in [LifecycleState::Running, LifecycleState::WarmShutdown] {
            let (state, action) = from.on_signal(MasterSignal::Quit, true);
            assert_eq!(state, LifecycleState::ColdShutdown);
            assert_eq!(action, LifecycleAction::KillAll);
        }
    }

    #[test]
    fn test_double_interrupt_in_terminal_escalates() {
        let (state, action) = LifecycleState::Running.on_signal(MasterSignal::Interrupt, true);
        assert_eq!(state, LifecycleState::WarmShutdown);
        assert_eq!(action, LifecycleAction::StopGracefully);

        let (state, action) = state.on_signal(MasterSignal::Interrupt, true);
        assert_eq!(state, LifecycleState::ColdShutdown);
        assert_eq!(action, LifecycleAction::KillAll);
    }

    #[test]
    fn test_non_interactive_interrupt_is_cold() {
        let (state, action) = LifecycleState::Running.on_signal(MasterSignal::Interrupt, false);
        assert_eq!(state, LifecycleState::ColdShutdown);
        assert_eq!(action, LifecycleAction::KillAll);
    }

    #[test]
    fn test_hangup_reloads_only_while_running() {
        assert_eq!(
            LifecycleState::Running.on_signal(MasterSignal::HangUp, false),
            (LifecycleState::Running, LifecycleAction::Reload)
        );
        assert_eq!(
            LifecycleState::WarmShutdown.on_signal(MasterSignal::HangUp, false),
            (LifecycleState::WarmShutdown, LifecycleAction::Ignore)
        );
    }

    #[test]
    fn test_cold_shutdown_is_terminal() {
        for signal in [
            MasterSignal::Interrupt,
            MasterSignal::Terminate,
            MasterSignal::Quit,
            MasterSignal::HangUp,
        ] {
            let (state, action) = LifecycleState::ColdShutdown.on_signal(signal, true);
            assert_eq!(state, LifecycleState::ColdShutdown);
            assert_eq!(action, LifecycleAction::Ignore);
        }
    }
}
