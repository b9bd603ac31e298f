//! The line-parser plugin seam and the action replayer.
//!
//! Parsers scan one line at a time. State that must survive across lines
//! travels in an explicit stack of opaque [`ParserState`] values; styling
//! and structure come out as column-relative [`Action`]s. Replaying a
//! buffer's actions in order on a [`TreeBuilder`] produces the parse tree;
//! unterminated constructs are sealed with synthetic pops at the end.

use rill_core::{
  position::{
    LineColumn,
    Range,
  },
  style::StyleSet,
};

use super::tree::ParseTree;
use crate::line::Line;

pub type ParserState = u64;

/// One step of tree construction, with columns relative to the parsed
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// Opens a child beginning at `column`.
  Push { column: usize, styles: StyleSet },
  /// Closes the innermost open child at `column`.
  Pop { column: usize },
  /// Restyles the first child of the innermost open node.
  SetFirstChildStyles { styles: StyleSet },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResults {
  pub state_stack: Vec<ParserState>,
  pub actions:     Vec<Action>,
}

/// A streaming line scanner. Implementations must be deterministic: for
/// identical line contents and identical input stacks, the output is
/// identical.
pub trait LineParser: Send + Sync {
  /// The stack to use at line 0.
  fn initial_stack(&self) -> Vec<ParserState>;

  /// Scans `line`, starting from `state_stack`, producing the outbound
  /// stack and the actions for this line.
  fn parse_line(&self, line: &Line, state_stack: &[ParserState]) -> ParseResults;
}

/// A parser that never produces structure. Buffers without a syntax use
/// this.
pub struct NullParser;

impl LineParser for NullParser {
  fn initial_stack(&self) -> Vec<ParserState> {
    vec![0]
  }

  fn parse_line(&self, _line: &Line, state_stack: &[ParserState]) -> ParseResults {
    ParseResults {
      state_stack: state_stack.to_vec(),
      actions:     Vec::new(),
    }
  }
}

struct PendingNode {
  begin:    LineColumn,
  styles:   StyleSet,
  children: Vec<ParseTree>,
}

impl PendingNode {
  fn close(self, end: LineColumn) -> ParseTree {
    let mut tree = ParseTree::new(Range::new(self.begin, end));
    tree.set_styles(self.styles);
    for child in self.children {
      tree.push_child(child);
    }
    tree
  }
}

/// Replays actions into a tree. The builder keeps the stack of open nodes;
/// the bottom entry is the root.
pub struct TreeBuilder {
  open: Vec<PendingNode>,
}

impl TreeBuilder {
  pub fn new(begin: LineColumn) -> Self {
    Self {
      open: vec![PendingNode {
        begin,
        styles: StyleSet::empty(),
        children: Vec::new(),
      }],
    }
  }

  /// Number of open nodes, root included.
  pub fn open_nodes(&self) -> usize {
    self.open.len()
  }

  pub fn apply_actions(&mut self, line: usize, actions: &[Action]) {
    for action in actions {
      match action {
        Action::Push { column, styles } => {
          self.open.push(PendingNode {
            begin:    LineColumn::new(line, *column),
            styles:   *styles,
            children: Vec::new(),
          });
        },
        Action::Pop { column } => {
          self.pop_at(LineColumn::new(line, *column));
        },
        Action::SetFirstChildStyles { styles } => {
          let top = self.open.last_mut().expect("root always open");
          if top.children.is_empty() {
            continue;
          }
          let tree = &mut top.children[0];
          tree.set_styles(*styles);
        },
      }
    }
  }

  fn pop_at(&mut self, end: LineColumn) {
    // A pop with only the root open is a parser bug; drop it rather than
    // lose the root.
    if self.open.len() <= 1 {
      return;
    }
    let closed = self.open.pop().expect("checked above").close(end);
    self
      .open
      .last_mut()
      .expect("root remains")
      .children
      .push(closed);
  }

  /// Seals unterminated constructs with synthetic pops and returns the
  /// finished tree rooted at `[begin, end)`.
  pub fn finish(mut self, end: LineColumn) -> ParseTree {
    while self.open.len() > 1 {
      self.pop_at(end);
    }
    self.open.pop().expect("root").close(end)
  }
}

#[cfg(test)]
mod test {
  use rill_core::style::Style;

  use super::*;

  #[test]
  fn replay_builds_nested_children() {
    let mut builder = TreeBuilder::new(LineColumn::zero());
    builder.apply_actions(0, &[
      Action::Push {
        column: 2,
        styles: StyleSet::of(Style::Blue),
      },
      Action::Push {
        column: 4,
        styles: StyleSet::empty(),
      },
      Action::Pop { column: 6 },
    ]);
    builder.apply_actions(1, &[Action::Pop { column: 3 }]);
    let tree = builder.finish(LineColumn::new(2, 0));

    assert_eq!(tree.range(), Range::new(LineColumn::zero(), LineColumn::new(2, 0)));
    assert_eq!(tree.children().len(), 1);
    let outer = &tree.children()[0];
    assert_eq!(
      outer.range(),
      Range::new(LineColumn::new(0, 2), LineColumn::new(1, 3))
    );
    assert_eq!(outer.styles(), StyleSet::of(Style::Blue));
    assert_eq!(outer.children().len(), 1);
    assert_eq!(
      outer.children()[0].range(),
      Range::new(LineColumn::new(0, 4), LineColumn::new(0, 6))
    );
  }

  #[test]
  fn unterminated_nodes_are_sealed() {
    let mut builder = TreeBuilder::new(LineColumn::zero());
    builder.apply_actions(0, &[
      Action::Push {
        column: 0,
        styles: StyleSet::empty(),
      },
      Action::Push {
        column: 1,
        styles: StyleSet::empty(),
      },
    ]);
    let end = LineColumn::new(0, 9);
    let tree = builder.finish(end);
    assert_eq!(tree.children().len(), 1);
    assert_eq!(tree.children()[0].range().end, end);
    assert_eq!(tree.children()[0].children()[0].range().end, end);
  }

  #[test]
  fn set_first_child_styles_restyles() {
    let mut builder = TreeBuilder::new(LineColumn::zero());
    builder.apply_actions(0, &[
      Action::Push {
        column: 0,
        styles: StyleSet::empty(),
      },
      Action::Pop { column: 1 },
      Action::SetFirstChildStyles {
        styles: StyleSet::of(Style::Green),
      },
    ]);
    let tree = builder.finish(LineColumn::new(0, 2));
    assert_eq!(tree.children()[0].styles(), StyleSet::of(Style::Green));
  }

  #[test]
  fn stray_pop_is_ignored() {
    let mut builder = TreeBuilder::new(LineColumn::zero());
    builder.apply_actions(0, &[Action::Pop { column: 1 }]);
    let tree = builder.finish(LineColumn::new(0, 2));
    assert!(tree.children().is_empty());
  }
}
