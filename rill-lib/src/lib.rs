//! Editor library for rill.
//!
//! The data model is a persistent sequence of immutable styled lines
//! ([`contents::Contents`]); user intent becomes values of a closed
//! [`transformation::Transformation`] sum whose application returns its own
//! inverse, which is what undo applies. Content mutations broadcast
//! [`cursors::CursorTransformation`] deltas so every named cursor set stays
//! consistent, and the [`parse`] cache keeps a styled syntax tree whose
//! recomputation cost tracks the number of changed lines.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod buffer;
pub mod contents;
pub mod cursors;
pub mod editor;
pub mod history_file;
pub mod line;
pub mod mode;
pub mod modifiers;
pub mod output;
pub mod parse;
pub mod predictor;
pub mod search;
pub mod status;
pub mod structure;
pub mod transformation;
pub mod variables;
pub mod widget;

pub type Tendril = SmartString<LazyCompact>;
