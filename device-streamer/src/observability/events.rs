//! Event-name vocabulary.

pub const DISPATCH_START: &str = "dispatch_start";
pub const DISPATCH_END_OF_STREAM: &str = "dispatch_end_of_stream";
pub const DISPATCH_COMPLETE: &str = "dispatch_complete";
pub const DISPATCH_DEVICE_ADDED: &str = "dispatch_device_added";
pub const DISPATCH_ROUTED: &str = "dispatch_routed";
pub const DISPATCH_DROP_UNKNOWN_DEVICE: &str = "dispatch_drop_unknown_device";
pub const DISPATCH_DROP_PROTOCOL_VIOLATION: &str = "dispatch_drop_protocol_violation";
pub const DISPATCH_DROP_DUPLICATE_DEVICE: &str = "dispatch_drop_duplicate_device";
pub const DISPATCH_DROP_INBOX_CLOSED: &str = "dispatch_drop_inbox_closed";
pub const DISPATCH_TASK_FAILED: &str = "dispatch_task_failed";

pub const REGISTRY_INSERT: &str = "registry_insert";
pub const REGISTRY_REMOVE: &str = "registry_remove";
pub const REGISTRY_REMOVE_MISSING: &str = "registry_remove_missing";

pub const DEVICE_TRANSITION: &str = "device_transition";
pub const DEVICE_SHUTDOWN_REQUESTED: &str = "device_shutdown_requested";

pub const PRODUCER_START: &str = "producer_start";
pub const PRODUCER_ENQUEUE: &str = "producer_enqueue";
pub const PRODUCER_DROP_PROTOCOL_VIOLATION: &str = "producer_drop_protocol_violation";
pub const PRODUCER_END_OF_STREAM: &str = "producer_end_of_stream";
pub const PRODUCER_DISCARD_AFTER_STOP: &str = "producer_discard_after_stop";
pub const PRODUCER_STOPPED: &str = "producer_stopped";

pub const CONSUMER_START: &str = "consumer_start";
pub const CONSUMER_HANDLED: &str = "consumer_handled";
pub const CONSUMER_STOP_OBSERVED: &str = "consumer_stop_observed";
pub const CONSUMER_FINAL_DRAIN: &str = "consumer_final_drain";
pub const CONSUMER_SHUTDOWN_TIMEOUT: &str = "consumer_shutdown_timeout";
pub const CONSUMER_REMOVED: &str = "consumer_removed";
pub const CONSUMER_FAILED: &str = "consumer_failed";
