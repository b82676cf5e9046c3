use serde::{Deserialize, Serialize};

/// Current on-disk record layout
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata about the state store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Schema version of the stored records
    pub schema_version: u32,

    /// Creation timestamp (ISO 8601)
    pub created_at: String,

    /// Last commit timestamp (ISO 8601)
    pub updated_at: String,
}

impl StoreMeta {
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self::new()
    }
}
