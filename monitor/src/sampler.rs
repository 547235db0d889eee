use crate::error::SampleError;
use parking_lot::Mutex;
use sysinfo::Networks;

/// Source of absolute cumulative byte counters for a network interface.
pub trait CounterSampler: Send + Sync {
    /// Returns `(bytes_in, bytes_out)` as reported by the OS.
    fn read(&self, interface: &str) -> Result<(u64, u64), SampleError>;
}

/// Reads interface counters through `sysinfo`.
pub struct SysinfoSampler {
    networks: Mutex<Networks>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSampler for SysinfoSampler {
    fn read(&self, interface: &str) -> Result<(u64, u64), SampleError> {
        let mut networks = self.networks.lock();
        // Picks up interfaces that appeared or were re-created since the last read.
        networks.refresh(true);

        networks
            .iter()
            .find(|(name, _)| name.as_str() == interface)
            .map(|(_, data)| (data.total_received(), data.total_transmitted()))
            .ok_or_else(|| SampleError::InterfaceNotFound(interface.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_interface_is_reported_as_not_found() {
        let sampler = SysinfoSampler::new();
        let result = sampler.read("trafficwatch-does-not-exist0");
        assert!(matches!(
            result,
            Err(SampleError::InterfaceNotFound(name)) if name == "trafficwatch-does-not-exist0"
        ));
    }
}
