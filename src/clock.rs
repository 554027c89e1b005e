use std::time::{SystemTime, UNIX_EPOCH};

/// Capability for "now", injected rather than read from a process-global
/// wall clock (spec §9 Design Notes). `WhisperFile::write`/`read` take a
/// `&dyn Clock` so tests can pin `now` exactly as the reference source's
/// testing hook does.
pub trait Clock {
    fn now(&self) -> u64;
}

/// The real clock: wall-clock seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = FixedClock(1000);
        assert_eq!(clock.now(), 1000);
        assert_eq!(clock.now(), 1000);
    }

    #[test]
    fn system_clock_is_plausible() {
        let now = SystemClock.now();
        assert!(now > 1_700_000_000);
    }
}
