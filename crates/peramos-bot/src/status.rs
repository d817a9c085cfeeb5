//! Resident memory of the running bot, for /status and report footers.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Reads this process's resident memory
pub struct MemoryProbe {
    system: Mutex<System>,
    pid: Pid,
}

impl MemoryProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    /// Resident set size in MiB, or `None` if the process table has no entry.
    pub fn resident_mb(&self) -> Option<f64> {
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]));
        system
            .process(self.pid)
            .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
    }

    /// Suffix appended to the last line of a served report.
    pub fn annotation(&self) -> Option<String> {
        self.resident_mb().map(|mb| format!(" | RAM: {:.1}MB", mb))
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_own_memory() {
        let probe = MemoryProbe::new();
        let mb = probe.resident_mb().unwrap();
        assert!(mb > 0.0);
    }

    #[test]
    fn test_annotation_format() {
        let annotation = MemoryProbe::new().annotation().unwrap();
        assert!(annotation.starts_with(" | RAM: "));
        assert!(annotation.ends_with("MB"));
    }
}
