//! Memoized incremental tree construction.
//!
//! Results are keyed by the line's content identity (the shared line
//! handle) and the inbound state stack, so an edit to one line only
//! reparses that line and whatever lines its outbound stack change
//! invalidates.
//!
//! Entries hold weak references to their lines. Eviction policy: whenever
//! the map grows beyond four times the line count of the buffer being
//! parsed (with a small floor), dead entries are swept out.

use std::{
  collections::HashMap,
  hash::{
    Hash,
    Hasher,
  },
  sync::{
    Arc,
    Weak,
  },
};

use rill_core::position::LineColumn;

use super::{
  parser::{
    LineParser,
    ParseResults,
    ParserState,
    TreeBuilder,
  },
  tree::ParseTree,
};
use crate::{
  contents::Contents,
  line::Line,
};

const SWEEP_FLOOR: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
  line_identity: usize,
  stack_hash:    u64,
}

struct CacheEntry {
  line:    Weak<Line>,
  stack:   Vec<ParserState>,
  results: Arc<ParseResults>,
}

pub struct ParseTreeCache {
  parser: Arc<dyn LineParser>,
  memo:   HashMap<CacheKey, CacheEntry>,
  hits:   u64,
  misses: u64,
}

fn stack_hash(stack: &[ParserState]) -> u64 {
  let mut hasher = std::collections::hash_map::DefaultHasher::new();
  stack.hash(&mut hasher);
  hasher.finish()
}

impl ParseTreeCache {
  pub fn new(parser: Arc<dyn LineParser>) -> Self {
    Self {
      parser,
      memo: HashMap::new(),
      hits: 0,
      misses: 0,
    }
  }

  pub fn hits(&self) -> u64 {
    self.hits
  }

  pub fn misses(&self) -> u64 {
    self.misses
  }

  pub fn cached_lines(&self) -> usize {
    self.memo.len()
  }

  /// Per-line results, memoized on (content identity, inbound stack).
  fn line_results(&mut self, line: &Arc<Line>, stack: &[ParserState]) -> Arc<ParseResults> {
    let key = CacheKey {
      line_identity: Arc::as_ptr(line) as usize,
      stack_hash:    stack_hash(stack),
    };
    if let Some(entry) = self.memo.get(&key) {
      let live = entry
        .line
        .upgrade()
        .map_or(false, |cached| Arc::ptr_eq(&cached, line));
      if live && entry.stack == stack {
        self.hits += 1;
        return entry.results.clone();
      }
    }
    self.misses += 1;
    let results = Arc::new(self.parser.parse_line(line, stack));
    self.memo.insert(key, CacheEntry {
      line:    Arc::downgrade(line),
      stack:   stack.to_vec(),
      results: results.clone(),
    });
    results
  }

  /// Builds the full tree for `contents`, reusing every line whose
  /// contents and inbound stack are unchanged.
  pub fn parse(&mut self, contents: &Contents) -> ParseTree {
    let mut stack = self.parser.initial_stack();
    let mut builder = TreeBuilder::new(LineColumn::zero());
    for line_number in 0..contents.len() {
      let line = contents
        .at(line_number)
        .expect("line_number bounded by len");
      let results = self.line_results(&line, &stack);
      builder.apply_actions(line_number, &results.actions);
      stack = results.state_stack.clone();
    }
    self.maybe_sweep(contents.len());
    builder.finish(LineColumn::new(contents.end_line(), contents.back().len()))
  }

  fn maybe_sweep(&mut self, live_lines: usize) {
    let bound = (live_lines * 4).max(SWEEP_FLOOR);
    if self.memo.len() <= bound {
      return;
    }
    let before = self.memo.len();
    self.memo.retain(|_, entry| entry.line.upgrade().is_some());
    tracing::debug!(
      before,
      after = self.memo.len(),
      "swept dead parse cache entries"
    );
  }
}
