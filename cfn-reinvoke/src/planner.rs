//! Deciding between an in-process wait and a scheduled reinvocation.
//!
//! The scheduling service cannot fire sooner than a minute out. A handler
//! asking to be called back in a few seconds is cheaper to serve by waiting
//! inside the current invocation, as long as there is enough time left
//! before the invocation deadline. Everything else goes through a one-shot
//! trigger rounded up to whole minutes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;

/// How a requested callback delay should be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReschedulePlan {
    /// Wait in-process, then invoke the handler again directly.
    Local {
        /// How long to wait
        wait: Duration,
    },
    /// Create a trigger pair firing this many minutes from now.
    Remote {
        /// Delay to pass to the schedule builder
        delay_minutes: i64,
    },
}

impl ReschedulePlan {
    /// Returns true if the callback is served in-process.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Plans a callback `delay_seconds` from now given the time left in the
/// current invocation.
///
/// Negative delays are treated as zero.
pub fn plan_reschedule(
    delay_seconds: i64,
    remaining_time: Duration,
    config: &SchedulerConfig,
) -> ReschedulePlan {
    let delay = Duration::from_secs(delay_seconds.max(0).unsigned_abs());

    let required = Duration::try_from_secs_f64(
        delay.as_secs_f64() * config.deadline_buffer_ratio.max(0.0),
    )
    .unwrap_or(Duration::MAX);
    if delay < config.local_wait_threshold && remaining_time > required {
        return ReschedulePlan::Local { wait: delay };
    }

    let minutes = i64::try_from(delay.as_secs().div_ceil(60)).unwrap_or(i64::MAX);
    ReschedulePlan::Remote {
        delay_minutes: minutes.max(config.minimum_remote_delay_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_short_delay_with_time_left_runs_locally() {
        let plan = plan_reschedule(15, secs(1000), &SchedulerConfig::default());
        assert_eq!(plan, ReschedulePlan::Local { wait: secs(15) });
        assert!(plan.is_local());
    }

    #[test]
    fn test_short_delay_near_deadline_goes_remote() {
        // 15s * 1.2 = 18s of headroom needed, only 16s left.
        let plan = plan_reschedule(15, secs(16), &SchedulerConfig::default());
        assert_eq!(plan, ReschedulePlan::Remote { delay_minutes: 1 });
    }

    #[test]
    fn test_long_delay_is_rounded_up_to_minutes() {
        let config = SchedulerConfig::default();
        assert_eq!(
            plan_reschedule(60, secs(10_000), &config),
            ReschedulePlan::Remote { delay_minutes: 1 }
        );
        assert_eq!(
            plan_reschedule(61, secs(10_000), &config),
            ReschedulePlan::Remote { delay_minutes: 2 }
        );
        assert_eq!(
            plan_reschedule(300, secs(10), &config),
            ReschedulePlan::Remote { delay_minutes: 5 }
        );
    }

    #[test]
    fn test_non_positive_delay_is_normalized() {
        let config = SchedulerConfig::default();
        assert_eq!(
            plan_reschedule(-87, secs(100), &config),
            ReschedulePlan::Local { wait: Duration::ZERO }
        );
        assert_eq!(
            plan_reschedule(0, Duration::ZERO, &config),
            ReschedulePlan::Remote { delay_minutes: 1 }
        );
    }

    #[test]
    fn test_minimum_remote_delay_is_configurable() {
        let config = SchedulerConfig::default().with_minimum_remote_delay_minutes(3);
        assert_eq!(
            plan_reschedule(30, secs(1), &config),
            ReschedulePlan::Remote { delay_minutes: 3 }
        );
    }

    #[test]
    fn test_zero_threshold_disables_local_waits() {
        let config = SchedulerConfig::default().with_local_wait_threshold(Duration::ZERO);
        assert_eq!(
            plan_reschedule(5, secs(10_000), &config),
            ReschedulePlan::Remote { delay_minutes: 1 }
        );
    }
}
