use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Grace window between the shutdown notification and powering off.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub trait PowerControl: Send + Sync {
    /// Schedules a host power-off after `grace`. Must not block the caller.
    fn schedule_power_off(&self, grace: Duration);
}

/// Powers the host off by running an external command.
pub struct CommandPowerControl {
    command: Vec<String>,
}

impl CommandPowerControl {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl PowerControl for CommandPowerControl {
    fn schedule_power_off(&self, grace: Duration) {
        let command = self.command.clone();
        warn!(?command, "Host power-off scheduled in {:?}", grace);

        // Detached on purpose: the task is never joined or cancelled, and it
        // races freely with the monitor's own shutdown.
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let Some((program, args)) = command.split_first() else {
                error!("Power-off command is empty");
                return;
            };

            info!("Powering off host: {:?}", command);
            match Command::new(program).args(args).status().await {
                Ok(status) if status.success() => info!("Power-off command accepted"),
                Ok(status) => error!("Power-off command exited with {}", status),
                Err(e) => error!("Failed to run power-off command: {}", e),
            }
        });
    }
}
