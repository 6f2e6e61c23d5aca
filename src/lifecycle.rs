//! Worker lifecycle state machine.

use std::fmt;

use crate::error::{Error, Result};

/// Lifecycle state of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    Failed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninstalled => "uninstalled",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Mutable lifecycle bookkeeping guarded by the synchronizer.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: WorkerState,
    /// Reported to the host, which decides whether to wait for older
    /// clients. Activation never blocks on it.
    skip_waiting: bool,
    claimed: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Creates a lifecycle in the `Uninstalled` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: WorkerState::Uninstalled,
            skip_waiting: false,
            claimed: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> WorkerState {
        self.state
    }

    /// Whether this worker may take over without waiting for older clients.
    ///
    /// Informational: the synchronizer logs it on activation but never
    /// waits either way.
    #[must_use]
    pub const fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    /// Whether this worker controls all open clients.
    #[must_use]
    pub const fn claimed(&self) -> bool {
        self.claimed
    }

    pub const fn request_skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub const fn claim(&mut self) {
        self.claimed = true;
    }

    /// Enters `Installing`. Allowed from `Uninstalled` or after a failed install.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] from any other state.
    pub fn begin_install(&mut self) -> Result<()> {
        match self.state {
            WorkerState::Uninstalled | WorkerState::Failed => {
                self.state = WorkerState::Installing;
                self.skip_waiting = true;
                Ok(())
            }
            state => Err(Error::InvalidState {
                operation: "install",
                state,
            }),
        }
    }

    /// Settles an install attempt.
    pub const fn finish_install(&mut self, success: bool) {
        self.state = if success {
            WorkerState::Installed
        } else {
            WorkerState::Failed
        };
    }

    /// Enters `Activating`. Only an installed worker can activate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the worker is not `Installed`.
    pub fn begin_activate(&mut self) -> Result<()> {
        match self.state {
            WorkerState::Installed => {
                self.state = WorkerState::Activating;
                Ok(())
            }
            state => Err(Error::InvalidState {
                operation: "activate",
                state,
            }),
        }
    }

    /// Activation always completes, even after a reset.
    pub const fn finish_activate(&mut self) {
        self.state = WorkerState::Active;
    }

    /// Marks a worker that was activated in an earlier process as active again.
    pub const fn resume_active(&mut self) {
        self.state = WorkerState::Active;
        self.claimed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.state(), WorkerState::Uninstalled);

        lc.begin_install().unwrap();
        assert_eq!(lc.state(), WorkerState::Installing);
        assert!(lc.skip_waiting());

        lc.finish_install(true);
        assert_eq!(lc.state(), WorkerState::Installed);

        lc.begin_activate().unwrap();
        assert_eq!(lc.state(), WorkerState::Activating);

        lc.finish_activate();
        assert_eq!(lc.state(), WorkerState::Active);
        assert!(!lc.claimed());
    }

    #[test]
    fn failed_install_blocks_activation_but_allows_retry() {
        let mut lc = Lifecycle::new();
        lc.begin_install().unwrap();
        lc.finish_install(false);
        assert_eq!(lc.state(), WorkerState::Failed);

        assert!(matches!(
            lc.begin_activate(),
            Err(Error::InvalidState {
                operation: "activate",
                state: WorkerState::Failed
            })
        ));
        assert!(lc.begin_install().is_ok());
    }

    #[test]
    fn install_rejected_once_active() {
        let mut lc = Lifecycle::new();
        lc.resume_active();
        assert!(lc.claimed());
        assert!(lc.begin_install().is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(WorkerState::Activating.to_string(), "activating");
        assert_eq!(WorkerState::Failed.to_string(), "failed");
    }
}
