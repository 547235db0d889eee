//! Notification message bodies.

use crate::engine::{PeriodSummary, ThresholdBreach};
use crate::threshold::bytes_to_gb;

pub fn warning_message(server_name: &str, breach: &ThresholdBreach) -> String {
    format!(
        "🚨 [{}] Traffic warning: {:.2} GB used this month, exceeding the warning threshold of {:.2} GB",
        server_name,
        bytes_to_gb(breach.effective_bytes),
        breach.threshold_gb
    )
}

pub fn shutdown_message(server_name: &str, grace_secs: u64) -> String {
    format!(
        "🛑 [{}] Traffic threshold reached, powering off in {} seconds",
        server_name, grace_secs
    )
}

pub fn monthly_report(server_name: &str, summary: &PeriodSummary) -> String {
    format!(
        "📊 [{}] Monthly traffic report ({})\n\n\
         Period start: {}\n\
         - Inbound: {:.2} GB\n\
         - Outbound: {:.2} GB\n\
         - Total: {:.2} GB\n\n\
         Counting mode: {}\n\
         Next reset: {}",
        server_name,
        summary.period_label,
        summary.period_start.format("%Y-%m-%d"),
        bytes_to_gb(summary.accumulated_in),
        bytes_to_gb(summary.accumulated_out),
        bytes_to_gb(summary.effective_bytes),
        summary.mode.description(),
        summary.next_reset_at.format("%Y-%m-%d"),
    )
}
