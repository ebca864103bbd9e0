#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::Just;
use std::time::Duration;
use uuid::Uuid;

use agentrun_core::config::SchedulingSettings;
use agentrun_core::models::{
    CostLimit, CostLimitAction, Operation, OperationMetadata, OperationStatus, StepEvent,
    StepEventKind, StepResult,
};

/// Strategy for generating any operation status
pub fn operation_status_strategy() -> impl Strategy<Value = OperationStatus> {
    prop_oneof![
        Just(OperationStatus::Idle),
        Just(OperationStatus::Running),
        Just(OperationStatus::WaitingForHuman),
        Just(OperationStatus::Done),
        Just(OperationStatus::Error),
        Just(OperationStatus::Interrupted),
    ]
}

/// Strategy for generating terminal statuses only
pub fn terminal_status_strategy() -> impl Strategy<Value = OperationStatus> {
    prop_oneof![
        Just(OperationStatus::Done),
        Just(OperationStatus::Error),
        Just(OperationStatus::Interrupted),
    ]
}

/// Strategy for generating cost limit actions
pub fn cost_limit_action_strategy() -> impl Strategy<Value = CostLimitAction> {
    prop_oneof![Just(CostLimitAction::Stop), Just(CostLimitAction::Warn)]
}

/// Strategy for generating optional cost limits
pub fn cost_limit_strategy() -> impl Strategy<Value = Option<CostLimit>> {
    prop::option::of((0.01f64..10.0, cost_limit_action_strategy()).prop_map(
        |(max_cost, on_exceeded)| CostLimit {
            max_cost,
            on_exceeded,
        },
    ))
}

/// Strategy for generating operations across the whole lifecycle
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    (
        operation_status_strategy(),
        0u32..100,                    // step_count
        prop::option::of(1u32..100),  // max_steps
        cost_limit_strategy(),
        0.0f64..20.0,                 // accumulated cost
    )
        .prop_map(|(status, step_count, max_steps, cost_limit, cost)| {
            let mut operation = Operation::new(Uuid::new_v4(), OperationMetadata::default());
            operation.status = status;
            operation.step_count = step_count;
            operation.max_steps = max_steps;
            operation.cost_limit = cost_limit;
            operation.usage.cost = cost;
            operation
        })
}

/// Strategy for generating step event kinds
pub fn step_event_kind_strategy() -> impl Strategy<Value = StepEventKind> {
    prop_oneof![
        Just(StepEventKind::LlmResult),
        Just(StepEventKind::ToolCall),
        Just(StepEventKind::ToolResult),
        Just(StepEventKind::Done),
        Just(StepEventKind::Error),
    ]
}

/// Strategy for generating event sequences a step might produce
pub fn step_events_strategy() -> impl Strategy<Value = Vec<StepEventKind>> {
    prop::collection::vec(step_event_kind_strategy(), 0..8)
}

/// Strategy for generating error counts fed into backoff planning
pub fn error_count_strategy() -> impl Strategy<Value = u32> {
    0u32..10
}

/// Strategy for generating valid scheduling settings
pub fn scheduling_settings_strategy() -> impl Strategy<Value = SchedulingSettings> {
    (
        0u64..50,     // base_step_delay ms
        0u64..50,     // tool_call_delay ms
        1u64..100,    // backoff_base ms
        1.0f64..3.0,  // backoff_multiplier
        any::<bool>(),
    )
        .prop_map(|(base, tool, backoff_base, multiplier, jitter)| SchedulingSettings {
            base_step_delay: Duration::from_millis(base),
            tool_call_delay: Duration::from_millis(tool),
            backoff_base: Duration::from_millis(backoff_base),
            backoff_max: Duration::from_millis(backoff_base * 20),
            backoff_multiplier: multiplier,
            backoff_jitter: jitter,
        })
}

/// Build a step result carrying the given event kinds over a fresh state.
pub fn step_result_with_events(state: Operation, kinds: &[StepEventKind]) -> StepResult {
    kinds.iter().fold(StepResult::new(state), |acc, kind| {
        acc.with_event(StepEvent::new(*kind, serde_json::json!({})))
    })
}

/// Build a step result reporting `count` error events.
pub fn step_result_with_errors(state: Operation, count: u32) -> StepResult {
    let kinds = vec![StepEventKind::Error; count as usize];
    step_result_with_events(state, &kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_operation_strategy_produces_consistent_state(operation in operation_strategy()) {
            prop_assert!(operation.step_count < 100);
            if let Some(max) = operation.max_steps {
                prop_assert!(max >= 1);
            }
            prop_assert!(operation.usage.cost >= 0.0);
        }

        #[test]
        fn test_scheduling_settings_strategy_is_valid(settings in scheduling_settings_strategy()) {
            prop_assert!(settings.backoff_multiplier >= 1.0);
            prop_assert!(settings.backoff_max >= settings.backoff_base);
        }
    }

    #[test]
    fn test_step_result_error_builder() {
        let state = Operation::new(Uuid::new_v4(), OperationMetadata::default());
        let result = step_result_with_errors(state, 3);
        assert_eq!(result.error_event_count(), 3);
        assert!(!result.has_tool_traffic());
    }
}
