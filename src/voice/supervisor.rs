//! Restart-on-end supervision of the transcript source
//!
//! Recognizers end their streams on their own (session limits, silence).
//! While voice is enabled the supervisor restarts the source, backing off
//! when restarts follow each other without any recognition activity.

use std::time::Duration;

use tracing::{info, warn};

use super::transcript::{SourceError, TranscriptSource};

/// Backoff limits for restarting an ended stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Consecutive restarts allowed without activity
    pub max_attempts: u32,
    /// Delay before the second consecutive restart
    pub base_delay: Duration,
    /// Upper bound for any restart delay
    pub max_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RestartPolicy {
    /// Delay before restart number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// What to do after the stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Voice is disabled, stay stopped
    Suppressed,
    /// Restart after the given delay
    Restart { delay: Duration },
    /// Too many restarts without activity, voice is now disabled
    GiveUp { attempts: u32 },
}

/// Owns the transcript source and its enabled flag
pub struct RecognitionSupervisor<S> {
    source: S,
    policy: RestartPolicy,
    enabled: bool,
    consecutive_restarts: u32,
}

impl<S: TranscriptSource> RecognitionSupervisor<S> {
    pub fn new(source: S, policy: RestartPolicy) -> Self {
        Self {
            source,
            policy,
            enabled: false,
            consecutive_restarts: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start the source and allow automatic restarts
    pub fn enable(&mut self) -> Result<(), SourceError> {
        self.source.start()?;
        self.enabled = true;
        self.consecutive_restarts = 0;
        info!("voice recognition enabled");
        Ok(())
    }

    /// Stop the source and suppress automatic restarts
    pub fn disable(&mut self) {
        self.enabled = false;
        self.source.stop();
        info!("voice recognition disabled");
    }

    /// Recognition produced results, so the stream is healthy
    pub fn on_activity(&mut self) {
        self.consecutive_restarts = 0;
    }

    /// Decide how to react to the stream ending
    pub fn on_ended(&mut self) -> RestartDecision {
        if !self.enabled {
            return RestartDecision::Suppressed;
        }

        if self.consecutive_restarts >= self.policy.max_attempts {
            let attempts = self.consecutive_restarts;
            warn!(attempts, "transcript source keeps ending, giving up");
            self.disable();
            return RestartDecision::GiveUp { attempts };
        }

        let delay = self.policy.delay_for(self.consecutive_restarts);
        self.consecutive_restarts += 1;
        info!(
            attempt = self.consecutive_restarts,
            delay_ms = delay.as_millis() as u64,
            "scheduling transcript source restart"
        );
        RestartDecision::Restart { delay }
    }

    /// Restart the source if voice is still enabled
    ///
    /// Returns `Ok(false)` when voice was disabled while the restart was
    /// pending.
    pub fn restart(&mut self) -> Result<bool, SourceError> {
        if !self.enabled {
            return Ok(false);
        }
        self.source.start()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeSource {
        starts: u32,
        stops: u32,
        fail: bool,
    }

    impl TranscriptSource for FakeSource {
        fn start(&mut self) -> Result<(), SourceError> {
            if self.fail {
                return Err(SourceError::Unavailable("offline".to_string()));
            }
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    fn policy() -> RestartPolicy {
        RestartPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(150),
        }
    }

    #[test]
    fn test_backoff_delays() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(150));
        assert_eq!(policy.delay_for(40), Duration::from_millis(150));
    }

    #[test]
    fn test_restart_while_enabled() {
        let mut sup = RecognitionSupervisor::new(FakeSource::default(), policy());
        sup.enable().unwrap();

        assert_eq!(
            sup.on_ended(),
            RestartDecision::Restart {
                delay: Duration::ZERO
            }
        );
        assert_eq!(sup.restart(), Ok(true));
        assert_eq!(sup.source.starts, 2);
    }

    #[test]
    fn test_disable_suppresses_restart() {
        let mut sup = RecognitionSupervisor::new(FakeSource::default(), policy());
        sup.enable().unwrap();
        sup.disable();

        assert_eq!(sup.on_ended(), RestartDecision::Suppressed);
        assert_eq!(sup.restart(), Ok(false));
        assert_eq!(sup.source.stops, 1);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut sup = RecognitionSupervisor::new(FakeSource::default(), policy());
        sup.enable().unwrap();

        for _ in 0..3 {
            assert!(matches!(sup.on_ended(), RestartDecision::Restart { .. }));
        }
        assert_eq!(sup.on_ended(), RestartDecision::GiveUp { attempts: 3 });
        assert!(!sup.is_enabled());
        assert_eq!(sup.on_ended(), RestartDecision::Suppressed);
    }

    #[test]
    fn test_activity_resets_backoff() {
        let mut sup = RecognitionSupervisor::new(FakeSource::default(), policy());
        sup.enable().unwrap();

        sup.on_ended();
        assert_eq!(
            sup.on_ended(),
            RestartDecision::Restart {
                delay: Duration::from_millis(100)
            }
        );

        sup.on_activity();
        assert_eq!(
            sup.on_ended(),
            RestartDecision::Restart {
                delay: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_enable_failure_leaves_disabled() {
        let source = FakeSource {
            fail: true,
            ..FakeSource::default()
        };
        let mut sup = RecognitionSupervisor::new(source, policy());

        assert!(sup.enable().is_err());
        assert!(!sup.is_enabled());
    }
}
