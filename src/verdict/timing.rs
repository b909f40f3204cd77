/// Wall-clock ceilings for test bodies
///
/// Timing is asserted after the fact: a body that returns an error propagates that
/// error untouched and no ceiling check happens. A hung body cannot be aborted.
use crate::config::types::{HarnessError, Result};
use std::time::{Duration, Instant};

/// A completed timed run
#[derive(Clone, Copy, Debug)]
pub struct TimedExecution {
    pub started: Instant,
    pub finished: Instant,
    pub ceiling: Duration,
}

impl TimedExecution {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_duration_since(self.started)
    }

    /// Fail when the run exceeded its ceiling
    pub fn check(&self) -> Result<Duration> {
        let elapsed = self.elapsed();
        if elapsed > self.ceiling {
            return Err(HarnessError::TimeCeilingExceeded {
                elapsed,
                ceiling: self.ceiling,
            });
        }
        Ok(elapsed)
    }
}

/// Ceiling from fractional seconds; negative or non-finite input is a config error
pub fn ceiling_secs(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| HarnessError::Config(format!("invalid ceiling {}: {}", seconds, e)))
}

/// Run `body` and fail if it took longer than `ceiling`
pub fn at_most<T, F>(ceiling: Duration, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let started = Instant::now();
    let value = body()?;
    let timed = TimedExecution {
        started,
        finished: Instant::now(),
        ceiling,
    };

    let elapsed = timed.check()?;
    log::debug!(
        "Completed in {:.3}s (ceiling {:.3}s)",
        elapsed.as_secs_f64(),
        ceiling.as_secs_f64()
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_body_passes() {
        let value = at_most(Duration::from_secs(5), || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_slow_body_fails() {
        let err = at_most(Duration::from_millis(10), || {
            std::thread::sleep(Duration::from_millis(60));
            Ok(())
        })
        .unwrap_err();
        match err {
            HarnessError::TimeCeilingExceeded { elapsed, ceiling } => {
                assert!(elapsed >= Duration::from_millis(60));
                assert_eq!(ceiling, Duration::from_millis(10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_body_error_skips_timing() {
        let err = at_most(Duration::from_millis(1), || -> Result<()> {
            std::thread::sleep(Duration::from_millis(20));
            Err(HarnessError::Assertion("body failed".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, HarnessError::Assertion(_)));
    }

    #[test]
    fn test_ceiling_secs() {
        assert_eq!(ceiling_secs(0.5).unwrap(), Duration::from_millis(500));
        assert!(ceiling_secs(-1.0).is_err());
        assert!(ceiling_secs(f64::NAN).is_err());
    }
}
