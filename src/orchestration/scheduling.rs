//! # Step Scheduling
//!
//! Computes the delay and priority for the next queued step from what the
//! finished step produced. Tool traffic pushes the next step out a little
//! to let external effects settle; error events apply capped exponential
//! backoff so a flapping step does not hammer the executor.

use std::time::Duration;

use crate::config::SchedulingSettings;
use crate::messaging::MessagePriority;
use crate::models::{Operation, OperationStatus, StepResult};

/// Delay and priority for the next step message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePlan {
    pub delay: Duration,
    pub priority: MessagePriority,
}

/// Derives schedule plans from step outcomes.
#[derive(Debug, Clone)]
pub struct SchedulePlanner {
    settings: SchedulingSettings,
}

impl SchedulePlanner {
    pub fn new(settings: SchedulingSettings) -> Self {
        Self { settings }
    }

    /// Plan the follow-up step for a state and the step result that produced it.
    pub fn from_events(&self, state: &Operation, step_result: &StepResult) -> SchedulePlan {
        let mut delay = self.settings.base_step_delay;

        if step_result.has_tool_traffic() {
            delay += self.settings.tool_call_delay;
        }

        let error_events = step_result.error_event_count();
        if error_events > 0 {
            delay = delay.max(self.error_backoff(error_events));
        }

        let priority = if state.status == OperationStatus::WaitingForHuman {
            MessagePriority::High
        } else {
            MessagePriority::Normal
        };

        SchedulePlan { delay, priority }
    }

    /// Capped exponential backoff keyed to the error event count.
    fn error_backoff(&self, error_events: u32) -> Duration {
        let attempt = error_events.saturating_sub(1);
        let multiplier = self.settings.backoff_multiplier;
        let max_delay = self.settings.backoff_max;

        let delay = self.settings.backoff_base.mul_f64(multiplier.powi(attempt as i32));
        let delay = delay.min(max_delay);

        if self.settings.backoff_jitter {
            let jitter = fastrand::f64() * 0.1; // 10% jitter
            delay.mul_f64(1.0 + jitter).min(max_delay)
        } else {
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OperationMetadata, StepEvent, StepEventKind};
    use serde_json::json;
    use uuid::Uuid;

    fn settings() -> SchedulingSettings {
        SchedulingSettings {
            base_step_delay: Duration::from_millis(100),
            tool_call_delay: Duration::from_millis(500),
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            backoff_jitter: false,
        }
    }

    fn operation() -> Operation {
        Operation::new(Uuid::new_v4(), OperationMetadata::default())
    }

    fn result_with_events(kinds: &[StepEventKind]) -> StepResult {
        let mut result = StepResult::new(operation());
        for kind in kinds {
            result = result.with_event(StepEvent::new(*kind, json!({})));
        }
        result
    }

    #[test]
    fn test_plain_step_uses_base_delay() {
        let planner = SchedulePlanner::new(settings());
        let plan = planner.from_events(&operation(), &result_with_events(&[]));
        assert_eq!(plan.delay, Duration::from_millis(100));
        assert_eq!(plan.priority, MessagePriority::Normal);
    }

    #[test]
    fn test_tool_traffic_adds_delay() {
        let planner = SchedulePlanner::new(settings());
        let plan = planner.from_events(
            &operation(),
            &result_with_events(&[StepEventKind::ToolCall, StepEventKind::ToolResult]),
        );
        assert_eq!(plan.delay, Duration::from_millis(600));
    }

    #[test]
    fn test_error_backoff_grows_and_caps() {
        let planner = SchedulePlanner::new(settings());

        let one = planner.from_events(&operation(), &result_with_events(&[StepEventKind::Error]));
        assert_eq!(one.delay, Duration::from_secs(2));

        let three = planner.from_events(
            &operation(),
            &result_with_events(&[
                StepEventKind::Error,
                StepEventKind::Error,
                StepEventKind::Error,
            ]),
        );
        assert_eq!(three.delay, Duration::from_secs(8));

        let many: Vec<StepEventKind> = std::iter::repeat(StepEventKind::Error).take(12).collect();
        let capped = planner.from_events(&operation(), &result_with_events(&many));
        assert_eq!(capped.delay, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_dominates_but_never_shrinks_delay() {
        let mut generous = settings();
        generous.base_step_delay = Duration::from_secs(30);
        let planner = SchedulePlanner::new(generous);

        // One error would yield 2s; the base delay is larger and wins.
        let plan = planner.from_events(&operation(), &result_with_events(&[StepEventKind::Error]));
        assert_eq!(plan.delay, Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut with_jitter = settings();
        with_jitter.backoff_jitter = true;
        let planner = SchedulePlanner::new(with_jitter);

        for _ in 0..50 {
            let plan =
                planner.from_events(&operation(), &result_with_events(&[StepEventKind::Error]));
            assert!(plan.delay >= Duration::from_secs(2));
            assert!(plan.delay <= Duration::from_millis(2200));
        }
    }

    #[test]
    fn test_waiting_state_is_high_priority() {
        let planner = SchedulePlanner::new(settings());
        let mut waiting = operation();
        waiting.status = OperationStatus::WaitingForHuman;
        let plan = planner.from_events(&waiting, &result_with_events(&[]));
        assert_eq!(plan.priority, MessagePriority::High);
    }
}
