use crate::config::MonitorConfig;
use crate::error::Result;
use crate::notifier::{Notifier, broadcast};
use crate::power::{PowerControl, SHUTDOWN_GRACE};
use crate::sampler::CounterSampler;
use accounting::report::{monthly_report, shutdown_message, warning_message};
use accounting::{
    Accountant, PeriodSummary, StateStore, ThresholdBreach, TrafficState, UpdateResult,
};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// What a single successful tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub update: UpdateResult,
    pub warned: bool,
    pub reset: bool,
    pub persisted: bool,
}

/// The accounting state together with its backing store. Only ever touched
/// through the monitor's lock, so every save sees a consistent snapshot.
struct Ledger {
    accountant: Accountant,
    store: StateStore,
}

impl Ledger {
    fn persist(&self) -> bool {
        match self.store.save(self.accountant.state()) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %self.store.path().display(), "Failed to save traffic state: {}", e);
                false
            }
        }
    }
}

pub struct TrafficMonitor {
    config: Arc<MonitorConfig>,
    ledger: Mutex<Ledger>,
    sampler: Arc<dyn CounterSampler>,
    notifier: Arc<dyn Notifier>,
    power: Arc<dyn PowerControl>,
    status: parking_lot::Mutex<RuntimeStatus>,
}

impl TrafficMonitor {
    /// Restores the persisted state, or seeds a new one from a live sample on
    /// first run. A period that ended while the monitor was down is closed
    /// here, with a fresh baseline since the stored one is stale.
    pub async fn open(
        config: Arc<MonitorConfig>,
        store: StateStore,
        sampler: Arc<dyn CounterSampler>,
        notifier: Arc<dyn Notifier>,
        power: Arc<dyn PowerControl>,
    ) -> Result<Self> {
        Self::open_at(config, store, sampler, notifier, power, Local::now()).await
    }

    async fn open_at(
        config: Arc<MonitorConfig>,
        store: StateStore,
        sampler: Arc<dyn CounterSampler>,
        notifier: Arc<dyn Notifier>,
        power: Arc<dyn PowerControl>,
        now: DateTime<Local>,
    ) -> Result<Self> {
        let policy = config.accounting_policy();

        let (accountant, startup_reset) = match store.load()? {
            Some(state) => {
                let mut accountant = Accountant::new(state, policy)?;
                info!(
                    period = %accountant.state().current_period_label,
                    accumulated_in = accountant.state().accumulated_in,
                    accumulated_out = accountant.state().accumulated_out,
                    "Restored traffic state from {}",
                    store.path().display()
                );

                let mut startup_reset = None;
                if accountant.state().next_reset_at < now {
                    let (raw_in, raw_out) = sampler.read(&config.network_interface)?;
                    startup_reset = accountant.reset_if_due(now);
                    if startup_reset.is_some() {
                        accountant.rebaseline(raw_in, raw_out);
                    }
                }
                (accountant, startup_reset)
            }
            None => {
                let (raw_in, raw_out) = sampler.read(&config.network_interface)?;
                let state = TrafficState::seed(now, policy.reset_day, raw_in, raw_out);
                info!(
                    interface = %config.network_interface,
                    raw_in,
                    raw_out,
                    "Initialized traffic state from live counters"
                );
                (Accountant::new(state, policy)?, None)
            }
        };

        let monitor = Self {
            config,
            ledger: Mutex::new(Ledger { accountant, store }),
            sampler,
            notifier,
            power,
            status: parking_lot::Mutex::new(RuntimeStatus::Idle),
        };

        {
            let ledger = monitor.ledger.lock().await;
            if let Some(summary) = &startup_reset {
                monitor.send_monthly_report(summary).await;
            }
            ledger.persist();
        }

        Ok(monitor)
    }

    pub fn status(&self) -> RuntimeStatus {
        *self.status.lock()
    }

    fn set_status(&self, status: RuntimeStatus) {
        *self.status.lock() = status;
        info!(?status, "Traffic monitor status changed");
    }

    pub async fn snapshot(&self) -> TrafficState {
        self.ledger.lock().await.accountant.state().clone()
    }

    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Local::now()).await
    }

    /// One accounting cycle: sample, accumulate, evaluate the threshold,
    /// check for a monthly reset and persist, all under the ledger lock. A
    /// failed counter read returns before anything is mutated or written.
    async fn tick_at(&self, now: DateTime<Local>) -> Result<TickReport> {
        let mut ledger = self.ledger.lock().await;

        let (raw_in, raw_out) = self.sampler.read(&self.config.network_interface)?;
        let update = ledger.accountant.apply_sample(raw_in, raw_out);

        let breach = ledger.accountant.check_threshold();
        if let Some(breach) = &breach {
            self.send_warning(breach).await;
        }

        let summary = ledger.accountant.reset_if_due(now);
        if let Some(summary) = &summary {
            self.send_monthly_report(summary).await;
        }

        let persisted = ledger.persist();

        Ok(TickReport {
            update,
            warned: breach.is_some(),
            reset: summary.is_some(),
            persisted,
        })
    }

    async fn run_tick(&self) {
        match self.tick().await {
            Ok(report) => debug!(
                delta_in = report.update.delta_in,
                delta_out = report.update.delta_out,
                warned = report.warned,
                reset = report.reset,
                persisted = report.persisted,
                "Traffic stats updated"
            ),
            Err(e) => error!(
                interface = %self.config.network_interface,
                "Failed to update traffic stats: {}",
                e
            ),
        }
    }

    /// Samples every check interval until `shutdown` fires, then runs one last
    /// tick to flush the latest counters. The signal is only observed between
    /// ticks; a tick in progress always completes.
    pub async fn run(&self, shutdown: CancellationToken) {
        self.set_status(RuntimeStatus::Running);

        let period = self.config.check_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interface = %self.config.network_interface,
            "Monitoring traffic every {:?}",
            period
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.run_tick().await,
            }
        }

        self.set_status(RuntimeStatus::Stopping);
        self.run_tick().await;
        self.set_status(RuntimeStatus::Stopped);
    }

    async fn send_warning(&self, breach: &ThresholdBreach) {
        let recipients = &self.config.telegram_chat_ids;
        let message = warning_message(&self.config.server_name, breach);
        let delivered = broadcast(self.notifier.as_ref(), recipients, &message).await;
        info!(
            delivered,
            recipients = recipients.len(),
            effective_bytes = breach.effective_bytes,
            "Sent traffic warning"
        );

        if self.config.shutdown_on_warning {
            warn!("Traffic threshold reached, preparing to power off");
            let message = shutdown_message(&self.config.server_name, SHUTDOWN_GRACE.as_secs());
            broadcast(self.notifier.as_ref(), recipients, &message).await;
            self.power.schedule_power_off(SHUTDOWN_GRACE);
        }
    }

    async fn send_monthly_report(&self, summary: &PeriodSummary) {
        let recipients = &self.config.telegram_chat_ids;
        let message = monthly_report(&self.config.server_name, summary);
        let delivered = broadcast(self.notifier.as_ref(), recipients, &message).await;
        info!(
            period = %summary.period_label,
            delivered,
            recipients = recipients.len(),
            "Sent monthly traffic report"
        );
    }
}
