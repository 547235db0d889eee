use crate::schedule::{next_reset_after, period_label};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Persisted accounting state for the current monthly period.
///
/// Field names on disk follow the `traffic_stats.json` layout so that state
/// files written by earlier versions of the monitor keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficState {
    /// "YYYY-MM" of the active period. Informational only.
    #[serde(rename = "current_month")]
    pub current_period_label: String,

    #[serde(rename = "last_reset_time")]
    pub period_start: DateTime<Local>,

    #[serde(rename = "next_reset_time")]
    pub next_reset_at: DateTime<Local>,

    #[serde(rename = "bytes_in")]
    pub accumulated_in: u64,

    #[serde(rename = "bytes_out")]
    pub accumulated_out: u64,

    /// Raw counter values from the last successful sample.
    #[serde(rename = "last_bytes_in")]
    pub last_sample_in: u64,

    #[serde(rename = "last_bytes_out")]
    pub last_sample_out: u64,

    #[serde(rename = "warnings_sent_this_month")]
    pub warning_sent_this_period: bool,
}

impl TrafficState {
    /// Fresh state for a first run: the live counters become the baseline and
    /// nothing is attributed to the period yet.
    pub fn seed(now: DateTime<Local>, reset_day: i32, raw_in: u64, raw_out: u64) -> Self {
        Self {
            current_period_label: period_label(&now),
            period_start: now,
            next_reset_at: next_reset_after(&now, reset_day),
            accumulated_in: 0,
            accumulated_out: 0,
            last_sample_in: raw_in,
            last_sample_out: raw_out,
            warning_sent_this_period: false,
        }
    }

    /// Starts a new period at `now`. Baseline counters are left alone.
    pub(crate) fn begin_period(&mut self, now: DateTime<Local>, reset_day: i32) {
        self.current_period_label = period_label(&now);
        self.period_start = now;
        self.next_reset_at = next_reset_after(&now, reset_day);
        self.accumulated_in = 0;
        self.accumulated_out = 0;
        self.warning_sent_this_period = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_state() -> TrafficState {
        let now = Local.with_ymd_and_hms(2024, 5, 17, 13, 45, 12).unwrap();
        let mut state = TrafficState::seed(now, 3, 1_000, 2_000);
        state.accumulated_in = 123_456_789_012;
        state.accumulated_out = 987_654_321;
        state.warning_sent_this_period = true;
        state
    }

    #[test]
    fn seed_has_baseline_only() {
        let now = Local.with_ymd_and_hms(2024, 5, 17, 13, 0, 0).unwrap();
        let state = TrafficState::seed(now, 3, 10, 20);

        assert_eq!(state.current_period_label, "2024-05");
        assert_eq!(state.period_start, now);
        assert!(state.next_reset_at > state.period_start);
        assert_eq!((state.accumulated_in, state.accumulated_out), (0, 0));
        assert_eq!((state.last_sample_in, state.last_sample_out), (10, 20));
        assert!(!state.warning_sent_this_period);
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = sample_state();
        let json = serde_json::to_string_pretty(&state).unwrap();
        let restored: TrafficState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn state_uses_stats_file_field_names() {
        let value = serde_json::to_value(sample_state()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "bytes_in",
                "bytes_out",
                "current_month",
                "last_bytes_in",
                "last_bytes_out",
                "last_reset_time",
                "next_reset_time",
                "warnings_sent_this_month",
            ]
        );
    }

    #[test]
    fn begin_period_zeroes_totals_and_keeps_baseline() {
        let mut state = sample_state();
        let now = Local.with_ymd_and_hms(2024, 6, 3, 0, 0, 5).unwrap();
        state.begin_period(now, 3);

        assert_eq!(state.current_period_label, "2024-06");
        assert_eq!(state.period_start, now);
        assert!(state.next_reset_at > now);
        assert_eq!((state.accumulated_in, state.accumulated_out), (0, 0));
        assert_eq!((state.last_sample_in, state.last_sample_out), (1_000, 2_000));
        assert!(!state.warning_sent_this_period);
    }
}
