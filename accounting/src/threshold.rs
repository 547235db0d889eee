use serde::{Deserialize, Serialize};
use std::fmt;

pub const BYTES_PER_GB: u64 = 1 << 30;

/// How inbound and outbound totals combine into the figure compared
/// against the warning threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficMode {
    In,
    Out,
    Max,
    #[default]
    Both,
    /// Any mode name the monitor does not know. Never triggers a warning.
    #[serde(other)]
    Unrecognized,
}

impl TrafficMode {
    pub fn effective_traffic(self, accumulated_in: u64, accumulated_out: u64) -> u64 {
        match self {
            TrafficMode::In => accumulated_in,
            TrafficMode::Out => accumulated_out,
            TrafficMode::Max => accumulated_in.max(accumulated_out),
            TrafficMode::Both => accumulated_in.saturating_add(accumulated_out),
            // Fail safe: an unknown mode must not produce a spurious warning.
            TrafficMode::Unrecognized => 0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TrafficMode::In => "inbound only",
            TrafficMode::Out => "outbound only",
            TrafficMode::Max => "larger of inbound and outbound",
            TrafficMode::Both => "inbound plus outbound",
            TrafficMode::Unrecognized => "unknown mode",
        }
    }
}

impl fmt::Display for TrafficMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrafficMode::In => "in",
            TrafficMode::Out => "out",
            TrafficMode::Max => "max",
            TrafficMode::Both => "both",
            TrafficMode::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// Threshold settings the engine evaluates each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub mode: TrafficMode,
    pub threshold_gb: f64,
}

impl ThresholdPolicy {
    pub fn new(mode: TrafficMode, threshold_gb: f64) -> Self {
        Self { mode, threshold_gb }
    }

    /// Threshold in bytes. Negative or NaN thresholds become 0 and huge ones
    /// saturate at `u64::MAX`.
    pub fn threshold_bytes(&self) -> u64 {
        (self.threshold_gb * BYTES_PER_GB as f64) as u64
    }

    pub fn is_exceeded(&self, accumulated_in: u64, accumulated_out: u64) -> Option<u64> {
        let effective = self.mode.effective_traffic(accumulated_in, accumulated_out);
        if self.mode != TrafficMode::Unrecognized && effective >= self.threshold_bytes() {
            Some(effective)
        } else {
            None
        }
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB as f64
}
