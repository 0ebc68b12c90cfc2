//! Bridge events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the host context, the lifecycle
//! tracker, the bundle loader chain, the headless task registry and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! See `core/mod.rs` for the wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
