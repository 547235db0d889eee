use crate::error::{AccountingError, Result};
use crate::schedule::is_reset_due;
use crate::state::TrafficState;
use crate::threshold::{ThresholdPolicy, TrafficMode};
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

/// Outcome of folding one raw counter sample into the period totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub delta_in: u64,
    pub delta_out: u64,
    pub accumulated_in: u64,
    pub accumulated_out: u64,
}

/// Raised once per period when effective traffic reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBreach {
    pub effective_bytes: u64,
    pub threshold_gb: f64,
}

/// Totals of a period that has just been closed by a reset.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub period_label: String,
    pub period_start: DateTime<Local>,
    pub accumulated_in: u64,
    pub accumulated_out: u64,
    pub effective_bytes: u64,
    pub mode: TrafficMode,
    pub next_reset_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountingPolicy {
    pub reset_day: i32,
    pub threshold: ThresholdPolicy,
}

/// Owns the single mutable [`TrafficState`] and applies every accounting rule
/// to it. Callers are expected to hold one lock around an `Accountant` for the
/// duration of a sample/evaluate/persist sequence.
#[derive(Debug)]
pub struct Accountant {
    state: TrafficState,
    policy: AccountingPolicy,
}

impl Accountant {
    pub fn new(state: TrafficState, policy: AccountingPolicy) -> Result<Self> {
        if state.next_reset_at <= state.period_start {
            return Err(AccountingError::InconsistentState(format!(
                "next reset {} is not after period start {}",
                state.next_reset_at, state.period_start
            )));
        }
        Ok(Self { state, policy })
    }

    pub fn state(&self) -> &TrafficState {
        &self.state
    }

    pub fn effective_traffic(&self) -> u64 {
        self.policy
            .threshold
            .mode
            .effective_traffic(self.state.accumulated_in, self.state.accumulated_out)
    }

    pub fn apply_sample(&mut self, raw_in: u64, raw_out: u64) -> UpdateResult {
        let delta_in = counter_delta(raw_in, self.state.last_sample_in);
        let delta_out = counter_delta(raw_out, self.state.last_sample_out);

        self.state.last_sample_in = raw_in;
        self.state.last_sample_out = raw_out;
        self.state.accumulated_in = self.state.accumulated_in.saturating_add(delta_in);
        self.state.accumulated_out = self.state.accumulated_out.saturating_add(delta_out);

        debug!(
            delta_in,
            delta_out,
            accumulated_in = self.state.accumulated_in,
            accumulated_out = self.state.accumulated_out,
            "Applied counter sample"
        );

        UpdateResult {
            delta_in,
            delta_out,
            accumulated_in: self.state.accumulated_in,
            accumulated_out: self.state.accumulated_out,
        }
    }

    /// Returns a breach the first time the threshold is reached in a period
    /// and marks the period as warned. Later calls in the same period return
    /// `None` no matter how far traffic climbs.
    pub fn check_threshold(&mut self) -> Option<ThresholdBreach> {
        if self.state.warning_sent_this_period {
            return None;
        }

        let threshold = self.policy.threshold;
        let effective_bytes =
            threshold.is_exceeded(self.state.accumulated_in, self.state.accumulated_out)?;

        self.state.warning_sent_this_period = true;
        warn!(
            effective_bytes,
            threshold_gb = threshold.threshold_gb,
            mode = %threshold.mode,
            "Traffic threshold reached"
        );

        Some(ThresholdBreach {
            effective_bytes,
            threshold_gb: threshold.threshold_gb,
        })
    }

    /// Closes the current period if its reset instant has passed. The summary
    /// carries the pre-reset totals and the newly scheduled reset.
    pub fn reset_if_due(&mut self, now: DateTime<Local>) -> Option<PeriodSummary> {
        if !is_reset_due(&now, &self.state.next_reset_at) {
            return None;
        }

        let closed_label = self.state.current_period_label.clone();
        let closed_start = self.state.period_start;
        let (accumulated_in, accumulated_out) =
            (self.state.accumulated_in, self.state.accumulated_out);
        let effective_bytes = self.effective_traffic();

        self.state.begin_period(now, self.policy.reset_day);

        info!(
            period = %closed_label,
            accumulated_in,
            accumulated_out,
            next_reset_at = %self.state.next_reset_at,
            "Monthly traffic period reset"
        );

        Some(PeriodSummary {
            period_label: closed_label,
            period_start: closed_start,
            accumulated_in,
            accumulated_out,
            effective_bytes,
            mode: self.policy.threshold.mode,
            next_reset_at: self.state.next_reset_at,
        })
    }

    /// Replaces the baseline counters without attributing any traffic.
    pub fn rebaseline(&mut self, raw_in: u64, raw_out: u64) {
        self.state.last_sample_in = raw_in;
        self.state.last_sample_out = raw_out;
    }
}

/// Bytes transferred since `baseline`.
///
/// A raw value below the baseline means the counter restarted (interface
/// re-created, host counter overflow). The whole raw value is then counted as
/// the delta instead of letting the subtraction wrap.
fn counter_delta(raw: u64, baseline: u64) -> u64 {
    if raw >= baseline { raw - baseline } else { raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::BYTES_PER_GB;
    use chrono::{Duration, TimeZone};

    const GIB: u64 = BYTES_PER_GB;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn accountant(mode: TrafficMode, threshold_gb: f64, raw_in: u64, raw_out: u64) -> Accountant {
        let policy = AccountingPolicy {
            reset_day: 1,
            threshold: ThresholdPolicy::new(mode, threshold_gb),
        };
        Accountant::new(TrafficState::seed(start(), 1, raw_in, raw_out), policy).unwrap()
    }

    #[test]
    fn accumulates_true_deltas_of_increasing_samples() {
        let mut acc = accountant(TrafficMode::Both, 1000.0, 5_000, 7_000);
        let samples = [(5_500, 7_000), (6_000, 9_100), (6_000, 9_100), (10_123, 12_000)];

        let mut sum_in = 0;
        for (raw_in, raw_out) in samples {
            let update = acc.apply_sample(raw_in, raw_out);
            sum_in += update.delta_in;
            assert_eq!(update.accumulated_in, sum_in);
        }

        assert_eq!(acc.state().accumulated_in, 10_123 - 5_000);
        assert_eq!(acc.state().accumulated_out, 12_000 - 7_000);
        assert_eq!(acc.state().last_sample_in, 10_123);
        assert_eq!(acc.state().last_sample_out, 12_000);
    }

    #[test]
    fn counter_discontinuity_counts_raw_value_as_delta() {
        let mut acc = accountant(TrafficMode::Both, 1000.0, 900_000, 800_000);
        acc.apply_sample(1_000_000, 850_000);

        let update = acc.apply_sample(4_096, 850_100);
        assert_eq!(update.delta_in, 4_096);
        assert_eq!(update.delta_out, 100);
        assert_eq!(update.accumulated_in, 100_000 + 4_096);
        assert_eq!(acc.state().last_sample_in, 4_096);
    }

    #[test]
    fn counter_delta_never_wraps() {
        assert_eq!(counter_delta(10, 10), 0);
        assert_eq!(counter_delta(15, 10), 5);
        assert_eq!(counter_delta(3, u64::MAX), 3);
        assert_eq!(counter_delta(0, 1), 0);
    }

    #[test]
    fn warning_fires_once_per_period() {
        let mut acc = accountant(TrafficMode::Both, 1000.0, 0, 0);

        acc.apply_sample(600 * GIB, 450 * GIB);
        let breach = acc.check_threshold().unwrap();
        assert_eq!(breach.effective_bytes, 1050 * GIB);
        assert!(acc.state().warning_sent_this_period);

        acc.apply_sample(600 * GIB, 460 * GIB);
        assert!(acc.check_threshold().is_none());
        acc.apply_sample(5_000 * GIB, 5_000 * GIB);
        assert!(acc.check_threshold().is_none());
    }

    #[test]
    fn below_threshold_leaves_flag_clear() {
        let mut acc = accountant(TrafficMode::Max, 1000.0, 0, 0);
        acc.apply_sample(200 * GIB, 900 * GIB);

        assert_eq!(acc.effective_traffic(), 900 * GIB);
        assert!(acc.check_threshold().is_none());
        assert!(!acc.state().warning_sent_this_period);
    }

    #[test]
    fn reset_not_due_before_scheduled_instant() {
        let mut acc = accountant(TrafficMode::Both, 1.0, 0, 0);
        let scheduled = acc.state().next_reset_at;
        assert!(acc.reset_if_due(scheduled).is_none());
        assert!(acc.reset_if_due(start() + Duration::days(5)).is_none());
    }

    #[test]
    fn reset_reports_previous_totals_and_starts_new_period() {
        let mut acc = accountant(TrafficMode::Both, 1.0, 0, 0);
        acc.apply_sample(2 * GIB, GIB);
        assert!(acc.check_threshold().is_some());

        let now = acc.state().next_reset_at + Duration::minutes(3);
        let summary = acc.reset_if_due(now).unwrap();

        assert_eq!(summary.period_label, "2024-03");
        assert_eq!(summary.accumulated_in, 2 * GIB);
        assert_eq!(summary.accumulated_out, GIB);
        assert_eq!(summary.effective_bytes, 3 * GIB);
        assert_eq!(summary.next_reset_at, acc.state().next_reset_at);

        let state = acc.state();
        assert_eq!(state.current_period_label, "2024-04");
        assert_eq!(state.period_start, now);
        assert!(state.next_reset_at > now);
        assert_eq!((state.accumulated_in, state.accumulated_out), (0, 0));
        assert!(!state.warning_sent_this_period);
        assert_eq!((state.last_sample_in, state.last_sample_out), (2 * GIB, GIB));
    }

    #[test]
    fn warning_can_fire_again_after_reset() {
        let mut acc = accountant(TrafficMode::In, 1.0, 0, 0);
        acc.apply_sample(2 * GIB, 0);
        assert!(acc.check_threshold().is_some());

        let now = acc.state().next_reset_at + Duration::seconds(1);
        acc.reset_if_due(now).unwrap();

        acc.apply_sample(4 * GIB, 0);
        assert!(acc.check_threshold().is_some());
        assert!(acc.check_threshold().is_none());
    }

    #[test]
    fn rebaseline_does_not_touch_totals() {
        let mut acc = accountant(TrafficMode::Both, 1.0, 100, 100);
        acc.apply_sample(300, 400);
        acc.rebaseline(7, 9);

        assert_eq!(acc.state().accumulated_in, 200);
        assert_eq!(acc.state().accumulated_out, 300);
        let update = acc.apply_sample(10, 9);
        assert_eq!((update.delta_in, update.delta_out), (3, 0));
    }

    #[test]
    fn rejects_state_with_reset_before_start() {
        let mut state = TrafficState::seed(start(), 1, 0, 0);
        state.next_reset_at = state.period_start;
        let policy = AccountingPolicy {
            reset_day: 1,
            threshold: ThresholdPolicy::new(TrafficMode::Both, 1.0),
        };
        assert!(matches!(
            Accountant::new(state, policy),
            Err(AccountingError::InconsistentState(_))
        ));
    }
}
