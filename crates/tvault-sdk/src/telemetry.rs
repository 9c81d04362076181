use std::time::{Duration, Instant};

use serde::Serialize;

/// Wall clock and process CPU times at one instant.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    wall: Instant,
    user: Duration,
    system: Duration,
}

impl Snapshot {
    pub fn now() -> Self {
        let (user, system) = cpu_times();
        Self {
            wall: Instant::now(),
            user,
            system,
        }
    }

    /// Measure from this snapshot until now.
    pub fn finish(&self, bytes: u64) -> Measurement {
        Measurement::between(self, &Snapshot::now(), bytes)
    }
}

/// Resources spent between two snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Measurement {
    pub wall_secs: f64,
    pub user_secs: f64,
    pub system_secs: f64,
    pub bytes: u64,
}

impl Measurement {
    pub fn between(start: &Snapshot, end: &Snapshot, bytes: u64) -> Self {
        Self {
            wall_secs: end.wall.duration_since(start.wall).as_secs_f64(),
            user_secs: end.user.saturating_sub(start.user).as_secs_f64(),
            system_secs: end.system.saturating_sub(start.system).as_secs_f64(),
            bytes,
        }
    }

    pub fn cpu_secs(&self) -> f64 {
        self.user_secs + self.system_secs
    }

    /// CPU time as a share of wall time, in percent.
    pub fn cpu_percent(&self) -> f64 {
        if self.wall_secs > 0.0 {
            self.cpu_secs() / self.wall_secs * 100.0
        } else {
            0.0
        }
    }

    pub fn throughput_mib_s(&self) -> f64 {
        if self.wall_secs > 0.0 {
            self.bytes as f64 / (1024.0 * 1024.0) / self.wall_secs
        } else {
            0.0
        }
    }
}

#[cfg(unix)]
fn cpu_times() -> (Duration, Duration) {
    use nix::sys::resource::{getrusage, UsageWho};
    use nix::sys::time::TimeVal;

    fn to_duration(tv: TimeVal) -> Duration {
        Duration::from_secs(tv.tv_sec().max(0) as u64)
            + Duration::from_micros(tv.tv_usec().max(0) as u64)
    }

    match getrusage(UsageWho::RUSAGE_SELF) {
        Ok(usage) => (to_duration(usage.user_time()), to_duration(usage.system_time())),
        Err(errno) => {
            tracing::warn!(error = %errno, "getrusage failed");
            (Duration::ZERO, Duration::ZERO)
        }
    }
}

#[cfg(not(unix))]
fn cpu_times() -> (Duration, Duration) {
    (Duration::ZERO, Duration::ZERO)
}
