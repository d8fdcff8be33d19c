use std::fmt;

use crate::LoadError;

/// Where the lifecycle is in its scan → open → ready pipeline
#[derive(Debug, Clone, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Scanning,
    Loading,
    Ready,
    Failed(LoadError),
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LifecycleState::Failed(_))
    }

    /// True while a prepare is scanning or opening
    pub fn is_busy(&self) -> bool {
        matches!(self, LifecycleState::Scanning | LifecycleState::Loading)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LifecycleState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Scanning => write!(f, "scanning"),
            LifecycleState::Loading => write!(f, "loading"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}
