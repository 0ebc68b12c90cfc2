//! Host context: configuration, lifecycle and wiring.
//!
//! The public entry point is [`HostContext`], built with [`HostContextBuilder`].
//!
//! ```text
//! HostContextBuilder::build()
//!   ├─► Bus ──► Telemetry thread ──► SubscriberSet   (only with subscribers)
//!   ├─► Markers ── CREATE_REACT_CONTEXT_START
//!   ├─► QueueConfiguration::create()                 (CREATE_CATALYST_INSTANCE_*)
//!   ├─► LifecycleTracker(ui)
//!   ├─► FallbackBundleLoader(loaders, bus)
//!   └─► Markers ── CREATE_REACT_CONTEXT_END
//! ```
//!
//! Internal modules:
//! - [`lifecycle`]: host resume/pause/destroy state and listener fan-out on the UI queue;
//! - [`telemetry`]: thread bridging the bus to async subscribers;
//! - [`host`]: the context itself and its teardown order;
//! - [`builder`]: assembly.

mod builder;
mod config;
mod host;
mod lifecycle;
mod telemetry;

pub use builder::HostContextBuilder;
pub use config::BridgeConfig;
pub use host::HostContext;
pub use lifecycle::{HostId, LifecycleEventListener, LifecycleState};

pub(crate) use lifecycle::LifecycleTracker;
