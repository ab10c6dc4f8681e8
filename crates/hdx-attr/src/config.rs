use serde::{Deserialize, Serialize};

/// Configuration for the safe overwrite protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwriteConfig {
    /// Prefix of temporary attribute names.
    pub temp_prefix: String,
    /// Random names drawn before giving up on finding a free one.
    pub max_attempts: u32,
}

impl Default for OverwriteConfig {
    fn default() -> Self {
        Self {
            temp_prefix: ".hdx-tmp-".into(),
            max_attempts: 16,
        }
    }
}
