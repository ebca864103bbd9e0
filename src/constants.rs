//! # System Constants
//!
//! Event names and queue defaults shared across the runtime. Event name
//! constants are the single source of truth for what goes onto the
//! observability stream; the typed records in [`crate::events::stream`] map to them.

/// Default queue the runtime schedules step messages onto.
pub const DEFAULT_STEP_QUEUE: &str = "agent_operation_steps";

/// Lifecycle events published to the observability stream.
pub mod events {
    // Operation lifecycle events
    pub const OPERATION_CREATED: &str = "operation.created";
    pub const OPERATION_INTERRUPTED: &str = "operation.interrupted";
    pub const OPERATION_COMPLETED: &str = "operation.completed";
    pub const OPERATION_ERROR: &str = "operation.error";

    // Step lifecycle events
    pub const STEP_STARTED: &str = "operation.step_started";
    pub const STEP_COMPLETED: &str = "operation.step_completed";
    pub const STEP_EVENT: &str = "operation.step_event";
}

/// System-wide constants
pub mod system {
    /// Version compatibility marker
    pub const AGENTRUN_CORE_VERSION: &str = "0.1.0";

    /// Ceiling on steps a single sync run may drive before handing back control
    pub const MAX_SYNC_STEPS: u32 = 1000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_share_prefix() {
        for name in [
            events::OPERATION_CREATED,
            events::OPERATION_INTERRUPTED,
            events::OPERATION_COMPLETED,
            events::OPERATION_ERROR,
            events::STEP_STARTED,
            events::STEP_COMPLETED,
            events::STEP_EVENT,
        ] {
            assert!(name.starts_with("operation."));
        }
    }
}
