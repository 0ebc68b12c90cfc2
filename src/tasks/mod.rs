//! # Headless tasks.
//!
//! - [`HeadlessTaskContext`] registry of running background script tasks
//! - [`HeadlessTaskConfig`] what to run (key, data, timeout, foreground permission)
//! - [`HeadlessTaskEventListener`] start/finish notifications
//! - [`TaskId`] task identifier

mod config;
mod context;
mod id;
mod listener;

pub use config::HeadlessTaskConfig;
pub use context::HeadlessTaskContext;
pub use id::TaskId;
pub use listener::HeadlessTaskEventListener;
