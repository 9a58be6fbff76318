use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, SystemTime},
};

/// Source of the current instant. Every timing decision reads from it.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Drop sub-millisecond precision, the finest resolution the document store keeps.
///
/// Instants before the Unix epoch are returned unchanged.
pub fn truncate_to_millis(instant: SystemTime) -> SystemTime {
    match instant.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since_epoch) => {
            let millis = Duration::new(
                since_epoch.as_secs(),
                since_epoch.subsec_millis() * 1_000_000,
            );
            SystemTime::UNIX_EPOCH + millis
        }
        Err(_) => instant,
    }
}

/// Wall clock of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: SystemTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now(), start + Duration::from_secs(30));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn sub_millisecond_precision_is_dropped() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let precise = base + Duration::from_nanos(123_456_789);
        assert_eq!(
            truncate_to_millis(precise),
            base + Duration::from_millis(123)
        );
        assert_eq!(truncate_to_millis(base), base);
    }
}
