//! Monthly traffic accounting: counter deltas, reset scheduling, threshold
//! evaluation and the persisted state they operate on.

pub mod engine;
pub mod error;
pub mod report;
pub mod schedule;
pub mod state;
pub mod store;
pub mod threshold;

pub use engine::{Accountant, AccountingPolicy, PeriodSummary, ThresholdBreach, UpdateResult};
pub use error::{AccountingError, Result};
pub use state::TrafficState;
pub use store::StateStore;
pub use threshold::{BYTES_PER_GB, ThresholdPolicy, TrafficMode};
