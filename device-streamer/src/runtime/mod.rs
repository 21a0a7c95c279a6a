//! Runtime integration layer.
//!
//! Isolates task spawning and joining so the rest of the crate never touches
//! `tokio::spawn` or `JoinHandle` directly.

pub(crate) mod device_runtime;
