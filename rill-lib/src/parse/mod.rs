//! Incremental, line-keyed syntax trees.
//!
//! A [`parser::LineParser`] scans one line at a time, carrying an explicit
//! state stack between lines and emitting [`parser::Action`]s; replaying
//! the actions on a [`parser::TreeBuilder`] yields a styled
//! [`tree::ParseTree`]. The [`cache::ParseTreeCache`] memoizes per-line
//! results keyed by line content identity and inbound state stack, so
//! recomputation cost tracks the number of changed lines.

pub mod cache;
pub mod classic;
pub mod parser;
pub mod tree;

pub use cache::ParseTreeCache;
pub use classic::ClassicParser;
pub use parser::{
  Action,
  LineParser,
  ParseResults,
  TreeBuilder,
};
pub use tree::ParseTree;
