//! Process CPU utilization via `sysinfo`.
//!
//! `sysinfo` derives a process's CPU usage from the CPU time it consumed
//! relative to the global CPU time elapsed between two refreshes, so both
//! the process table and the global CPU counters are refreshed on attach and
//! again after the interval of interest. Values are fractions of one core: a
//! process saturating two cores reports `2.0`.

use std::time::Duration;

use sysinfo::{Pid, System};

/// A process whose CPU usage is being tracked.
pub struct CpuSampler {
    sys: System,
    pid: Pid,
}

impl CpuSampler {
    /// Start tracking `pid`. Returns `None` if the process does not exist.
    pub fn attach(pid: u32) -> Option<Self> {
        let pid = Pid::from_u32(pid);
        let sys = System::new_all();
        sys.process(pid)?;
        Some(Self { sys, pid })
    }

    /// Track the calling process.
    pub fn current() -> Option<Self> {
        Self::attach(std::process::id())
    }

    /// Usage since the previous refresh, or `None` once the process is gone.
    pub fn usage(&mut self) -> Option<f64> {
        self.sys.refresh_all();
        self.sys
            .process(self.pid)
            .map(|p| f64::from(p.cpu_usage()) / 100.0)
    }
}

/// Sample `pid` over `window`, blocking the caller for that long.
pub fn sample_process_cpu(pid: u32, window: Duration) -> Option<f64> {
    let mut sampler = CpuSampler::attach(pid)?;
    std::thread::sleep(window);
    sampler.usage()
}
