use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeConfig {
    #[serde(default = "default_realtime")]
    pub realtime: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            start_at: None,
        }
    }
}

fn default_realtime() -> bool {
    true
}

#[derive(Clone, Debug)]
pub struct ArtificialClockConfig {
    pub start_at: DateTime<Utc>,
}

impl ArtificialClockConfig {
    /// A manual clock parked at the current wall time.
    pub fn manual() -> Self {
        Self {
            start_at: Utc::now(),
        }
    }
}
