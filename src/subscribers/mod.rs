//! # Event subscribers.
//!
//! [`Subscribe`] is the async hook for observing bridge events broadcast
//! through the [`Bus`](crate::Bus); [`SubscriberSet`] fans events out to many
//! subscribers with per-subscriber queues.
//!
//! ```text
//! Bus ──► telemetry thread ──► SubscriberSet ──┬──► LogWriter
//!                                              ├──► Metrics
//!                                              └──► Custom ...
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
