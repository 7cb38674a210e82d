//! System Profile Module
//!
//! Provides cached system information and live memory readings for the
//! memory-aware batch size strategies. Hardware values are computed once on
//! first access and cached for the program lifetime; memory pressure is read
//! through a [`MemoryProbe`] every time a strategy asks for it.

use anyhow::{Result, bail};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

lazy_static! {
    /// System profile information cached for the entire program lifetime
    pub static ref SYSTEM: Arc<SystemProfile> = Arc::new(SystemProfile::detect());
}

/// System profile containing hardware and resource information
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// Total CPU cores (including hyperthreading)
    pub cpu_count: usize,

    /// Physical CPU cores (excluding hyperthreading)
    pub physical_cpu_count: usize,

    /// Total system memory in bytes
    pub total_memory: u64,

    /// Available system memory in bytes at startup
    pub available_memory: u64,
}

impl SystemProfile {
    /// Detect system profile (called once via lazy_static)
    fn detect() -> Self {
        let cpu_count = num_cpus::get();
        let physical_cpu_count = num_cpus::get_physical();

        let mut sys = sysinfo::System::new_with_specifics(
            sysinfo::RefreshKind::new().with_memory(sysinfo::MemoryRefreshKind::everything()),
        );
        sys.refresh_memory();

        Self {
            cpu_count,
            physical_cpu_count,
            total_memory: sys.total_memory(),
            available_memory: sys.available_memory(),
        }
    }

    /// Get the global system profile instance
    pub fn get() -> Arc<SystemProfile> {
        SYSTEM.clone()
    }

    /// Get a human-readable summary of system resources
    pub fn summary(&self) -> String {
        format!(
            "CPUs: {} ({} physical)\n\
             Memory: {:.2} GB ({:.2} GB available)",
            self.cpu_count,
            self.physical_cpu_count,
            self.total_memory as f64 / (1024.0 * 1024.0 * 1024.0),
            self.available_memory as f64 / (1024.0 * 1024.0 * 1024.0),
        )
    }
}

/// A point-in-time reading of memory, in bytes.
///
/// Mirrors the managed-heap triple the batch size strategies were designed
/// around: `max` is the ceiling, `used` is what is currently taken, and `free`
/// is what can still be handed out without growing past the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub max: u64,
    pub used: u64,
    pub free: u64,
}

impl MemorySnapshot {
    pub fn new(max: u64, used: u64, free: u64) -> Self {
        Self { max, used, free }
    }

    /// Ratio of used to maximum memory, between 0 and 1
    pub fn load_factor(&self) -> Result<f64> {
        if self.max == 0 {
            bail!("memory snapshot reports a zero maximum");
        }
        Ok((self.used as f64 / self.max as f64).clamp(0.0, 1.0))
    }

    /// Memory left before hitting `max`
    pub fn headroom(&self) -> u64 {
        self.max.saturating_sub(self.used)
    }
}

/// Source of live memory readings.
pub trait MemoryProbe: Send + Sync + fmt::Debug {
    fn snapshot(&self) -> Result<MemorySnapshot>;
}

/// Reads memory from the operating system on every call.
pub struct SystemMemoryProbe {
    sys: Mutex<sysinfo::System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        let sys = sysinfo::System::new_with_specifics(
            sysinfo::RefreshKind::new().with_memory(sysinfo::MemoryRefreshKind::everything()),
        );
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemMemoryProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemMemoryProbe").finish_non_exhaustive()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn snapshot(&self) -> Result<MemorySnapshot> {
        let mut sys = self.sys.lock();
        sys.refresh_memory();

        let max = sys.total_memory();
        if max == 0 {
            bail!("memory detection unavailable: total memory reported as 0");
        }

        Ok(MemorySnapshot {
            max,
            used: sys.used_memory().min(max),
            free: sys.available_memory().min(max),
        })
    }
}

/// Always reports the same snapshot. Used for reproducible runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub MemorySnapshot);

impl FixedMemoryProbe {
    pub fn new(max: u64, used: u64, free: u64) -> Self {
        Self(MemorySnapshot::new(max, used, free))
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn snapshot(&self) -> Result<MemorySnapshot> {
        if self.0.max == 0 {
            bail!("memory snapshot reports a zero maximum");
        }
        Ok(self.0)
    }
}
