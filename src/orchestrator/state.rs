//! Orchestrator lifecycle states

use std::fmt;

use crate::{Error, Result};

/// Lifecycle of an orchestrator. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrchestratorState {
    /// Constructed, nothing resolved yet.
    Created,
    /// Plugins instantiated and experiments registered.
    Initialized,
    /// The benchmark matrix is being (or has been) executed.
    Running,
    /// Reports written and deployments torn down.
    Finalized,
}

impl OrchestratorState {
    /// Lower-case state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Finalized => "finalized",
        }
    }

    /// Move from `from` to `to`, failing if the current state is not `from`.
    pub(crate) fn advance(&mut self, from: Self, to: Self) -> Result<()> {
        if *self != from {
            return Err(Error::InvalidState {
                expected: from.name(),
                actual: self.name(),
            });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
