use serde::{Deserialize, Serialize};

/// Information about a committed unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Number of state keys written
    pub state_keys_written: usize,

    /// Number of state keys deleted
    pub state_keys_deleted: usize,
}

impl CommitInfo {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.state_keys_written == 0 && self.state_keys_deleted == 0
    }
}
