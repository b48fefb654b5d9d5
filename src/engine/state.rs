use serde::{Deserialize, Serialize};

/// Stage lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageState {
    #[default]
    NotStarted,
    Running,
    Stopping,
    Stopped,
    Failed { error_msg: String },
}

impl StageState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &StageState) -> bool {
        use StageState::*;

        matches!(
            (self, target),
            (NotStarted, Running) |
            // never started, stopped directly
            (NotStarted, Stopped) |

            (Running, Stopping) |
            // drained on its own
            (Running, Stopped) |
            (Running, Failed { .. }) |

            (Stopping, Stopped) |
            (Stopping, Failed { .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed { .. })
    }

    /// Get human-readable state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed { .. } => "Failed",
        }
    }
}
