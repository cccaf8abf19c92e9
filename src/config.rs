//! Session resource configuration.
//!
//! The session normalizes this configuration before handing it to the
//! backend at `init()`; the one normalization it performs is defaulting an
//! unset machine count from the backend's environment machine list. It never
//! interprets the other resource flags.

use serde::{Deserialize, Serialize};

/// Resource configuration consumed by `Session::init`.
///
/// A `machine_count` of zero means "unset"; it is filled in from the
/// environment machine list during init, before the backend sees the
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of machines participating in the run; 0 = derive from the
    /// environment.
    pub machine_count: u32,
    /// GPU devices per machine.
    pub gpu_device_count: u32,
    /// CPU devices per machine.
    pub cpu_device_count: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            machine_count: 0,
            gpu_device_count: 1,
            cpu_device_count: 1,
        }
    }
}

impl SessionConfig {
    /// Defaults overlaid with `JOBFLOW_MACHINE_NUM`, `JOBFLOW_GPU_DEVICE_NUM`
    /// and `JOBFLOW_CPU_DEVICE_NUM` from the environment (a `.env` file is
    /// honored when present). Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            machine_count: env_u32("JOBFLOW_MACHINE_NUM").unwrap_or(defaults.machine_count),
            gpu_device_count: env_u32("JOBFLOW_GPU_DEVICE_NUM").unwrap_or(defaults.gpu_device_count),
            cpu_device_count: env_u32("JOBFLOW_CPU_DEVICE_NUM").unwrap_or(defaults.cpu_device_count),
        }
    }

    #[must_use]
    pub fn with_machine_count(mut self, machine_count: u32) -> Self {
        self.machine_count = machine_count;
        self
    }

    #[must_use]
    pub fn with_gpu_device_count(mut self, gpu_device_count: u32) -> Self {
        self.gpu_device_count = gpu_device_count;
        self
    }

    /// Fill in unset values from the environment machine list. Must run
    /// before the configuration is handed to the backend.
    pub fn normalize(&mut self, environment_machines: &[String]) {
        if self.machine_count == 0 {
            self.machine_count = environment_machines.len() as u32;
            tracing::debug!(
                machine_count = self.machine_count,
                "machine count defaulted from environment machine list"
            );
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
