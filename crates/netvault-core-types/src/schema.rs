//! Canonical schema constants for structured logging
//!
//! These constants keep field keys identical across the store, the ingestion
//! worker and the synchronizer.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Archive identifiers
pub const FIELD_IDENTITY: &str = "identity";
pub const FIELD_CLASSIFICATION: &str = "classification";
pub const FIELD_PATH: &str = "path";
pub const FIELD_REVISION: &str = "revision";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_WRITE_AND_COMMIT: &str = "write_and_commit";
pub const OP_COMMIT: &str = "commit";
pub const OP_RESTORE: &str = "restore";
pub const OP_PUSH: &str = "push";
pub const OP_PULL: &str = "pull";
pub const OP_INITIALIZE: &str = "initialize";
pub const OP_CLONE: &str = "clone";
pub const OP_SET_UPSTREAM: &str = "set_upstream";
pub const OP_PERSIST_SNAPSHOT: &str = "persist_snapshot";
pub const OP_SWEEP: &str = "sweep";
pub const OP_SYNC_TICK: &str = "sync_tick";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_store_op_names_are_distinct() {
        let ops = [
            OP_INITIALIZE,
            OP_CLONE,
            OP_SET_UPSTREAM,
            OP_PULL,
            OP_PUSH,
            OP_COMMIT,
            OP_RESTORE,
            OP_WRITE_AND_COMMIT,
        ];
        let unique: std::collections::HashSet<_> = ops.iter().collect();
        assert_eq!(unique.len(), ops.len());
    }
}
