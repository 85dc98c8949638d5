use std::{
    fmt,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};

use crate::{PipelineError, Result};

/// Source of wall-clock time for a session.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the host clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant, so a test can keep
/// one handle while the session owns another.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward. Negative deltas are ignored; a delta that
    /// leaves the representable range is rejected and the clock is unchanged.
    pub fn advance(&self, delta: Duration) -> Result<()> {
        if delta <= Duration::zero() {
            return Ok(());
        }

        let mut now = self.slot();
        *now = now.checked_add_signed(delta).ok_or_else(|| {
            PipelineError::invalid_input(format!("cannot advance clock by {delta}"))
        })?;
        Ok(())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // The guarded value is a plain timestamp; a poisoned lock still holds
        // a usable instant.
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.slot()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock").field("now", &self.now()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::starting_at(start);
        let handle = clock.clone();

        handle.advance(Duration::hours(2)).unwrap();
        assert_eq!(clock.now(), start + Duration::hours(2));

        handle.advance(Duration::hours(-5)).unwrap();
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn overflowing_advance_is_rejected() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::starting_at(start);

        let err = clock.advance(Duration::MAX).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn system_clock_is_recent() {
        assert!(SystemClock.now().timestamp() > 946_684_800);
    }
}
