//! Campaign creation defaults.

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Defaults applied when a campaign draft leaves a field unspecified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Timezone used when the draft does not name one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Default start of the daily sending window (HH:MM).
    #[serde(default = "default_window_start")]
    pub default_window_start: String,

    /// Default end of the daily sending window (HH:MM).
    #[serde(default = "default_window_end")]
    pub default_window_end: String,

    /// Upstream payload shapes, tried in order until one is accepted.
    #[serde(default = "default_payload_shapes")]
    pub payload_shapes: Vec<PayloadShape>,
}

/// A versioned layout of the upstream create-campaign body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// `campaign_schedule.schedules[]` with a `"0".."6"` day map.
    Schedules,
    /// Single flat schedule object with a list of day numbers.
    FlatSchedule,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::Schedules => "schedules",
            PayloadShape::FlatSchedule => "flat_schedule",
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            default_window_start: default_window_start(),
            default_window_end: default_window_end(),
            payload_shapes: default_payload_shapes(),
        }
    }
}

impl CampaignConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.payload_shapes.is_empty() {
            return Err(ConfigError::Config(
                "campaign.payload_shapes must list at least one shape".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

fn default_window_start() -> String {
    "09:00".to_string()
}

fn default_window_end() -> String {
    "17:00".to_string()
}

fn default_payload_shapes() -> Vec<PayloadShape> {
    vec![PayloadShape::Schedules]
}
