//! Primitive value types shared across the rill editor.
//!
//! Everything in this crate is a plain value: no I/O, no threads, no
//! editor-specific policy. The higher layers (`rill-lib`, `rill-event`)
//! build buffers, transformations and schedulers on top of these types.

pub mod chars;
pub mod lazy_text;
pub mod position;
pub mod style;
pub mod tree;
