//! Task status

use serde::{Deserialize, Serialize};

use crate::Error;

/// Status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Solved,
    Failed,
}

impl TaskStatus {
    /// Solved and failed tasks need no further work
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Solved | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Solved => write!(f, "solved"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "0" => Ok(Self::Pending),
            "solved" | "1" => Ok(Self::Solved),
            "failed" | "-1" => Ok(Self::Failed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}
