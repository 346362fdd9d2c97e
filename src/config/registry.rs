use serde::{Deserialize, Serialize};

/// Settings for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of the callback-failure broadcast channel. Slow failure
    /// consumers skip the oldest entries once it is exceeded.
    pub failure_channel_capacity: usize,

    /// Whether caught callback panics are published on the failure channel.
    /// They are always logged.
    pub report_callback_failures: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failure_channel_capacity: 64,
            report_callback_failures: true,
        }
    }
}
