//! Concurrency substrate for the rill editor.
//!
//! The editor runs a cooperative single-threaded main loop. Background
//! work happens on explicit worker threads that never touch editor state:
//! they communicate exclusively by enqueuing callbacks onto the
//! [`work_queue::WorkQueue`], which the main loop drains at well-defined
//! points. Values travel from producers to consumers through one-shot
//! [`future::Value`] channels, and long-running work observes a
//! [`notification::Notification`] to cancel early.

pub mod evaluator;
pub mod future;
pub mod notification;
pub mod reader;
pub mod signal;
pub mod work_queue;
