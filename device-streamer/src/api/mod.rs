//! API facade layer.
//!
//! Free functions over [`crate::Dispatcher`] for callers that prefer a
//! procedural surface to the method one.
//!
//! ```no_run
//! use std::sync::Arc;
//! use device_streamer::{api, Dispatcher, DispatcherConfig, PacketHandler, PacketSource};
//!
//! # async fn example(
//! #     source: Arc<dyn PacketSource>,
//! #     handler: Arc<dyn PacketHandler>,
//! # ) -> Result<(), device_streamer::ConfigError> {
//! let dispatcher = api::dispatcher::new(DispatcherConfig::default(), source, handler)?;
//! let summary = api::dispatcher::dispatcher_run(&dispatcher).await;
//! assert!(api::dispatcher::registry_snapshot(&dispatcher).await.is_empty());
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
