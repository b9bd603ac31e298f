//! Persistent, snapshot-cheap buffer contents.
//!
//! [`Contents`] is an ordered sequence of shared [`Line`] values backed by
//! the persistent tree in `rill-core`. Snapshots are O(1) and live
//! independently of the source. At least one (possibly empty) line always
//! exists.
//!
//! Every mutation describes the implied cursor remapping as a
//! [`CursorTransformation`] and ships it through the registered listeners;
//! subscribers observe deltas strictly in mutation order. Identity deltas
//! are delivered too, with a single exception: `erase_lines(i, i)` stays
//! silent.

use std::sync::Arc;

use rill_core::{
  lazy_text::LazyText,
  position::{
    LineColumn,
    Range,
  },
  style::StyleSet,
  tree::ConstTree,
};
use thiserror::Error;

use crate::{
  cursors::CursorTransformation,
  line::{
    Line,
    LineBuilder,
  },
};

pub type Result<T> = std::result::Result<T, ContentsError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentsError {
  #[error("line {line} out of range: buffer has {len} lines")]
  LineOutOfRange { line: usize, len: usize },
  #[error("column range [{column}, {column}+{amount}) out of range for line of length {len}")]
  ColumnOutOfRange {
    column: usize,
    amount: usize,
    len:    usize,
  },
}

pub type UpdateListener = Arc<dyn Fn(&CursorTransformation) + Send + Sync>;

/// What `erase_lines` should do to cursors. `Unmodified` is for callers
/// that will emit a better delta themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorsBehavior {
  Adjust,
  Unmodified,
}

#[derive(Clone)]
pub struct Contents {
  lines:     ConstTree<Arc<Line>>,
  listeners: Vec<UpdateListener>,
}

impl Default for Contents {
  fn default() -> Self {
    Self::new()
  }
}

impl Contents {
  pub fn new() -> Self {
    Self {
      lines:     ConstTree::new().push_back(Arc::new(Line::default())),
      listeners: Vec::new(),
    }
  }

  pub fn from_text(text: &str) -> Self {
    let mut contents = Self::new();
    contents.lines = text
      .split('\n')
      .map(|line| Arc::new(Line::from(line)))
      .collect();
    contents
  }

  pub fn from_lines(lines: impl IntoIterator<Item = Line>) -> Self {
    let tree: ConstTree<Arc<Line>> = lines.into_iter().map(Arc::new).collect();
    let mut contents = Self::new();
    if !tree.is_empty() {
      contents.lines = tree;
    }
    contents
  }

  /// Registers a listener for every subsequent mutation delta.
  pub fn add_listener(&mut self, listener: UpdateListener) {
    self.listeners.push(listener);
  }

  /// An O(1) copy with no listeners; its lifetime is independent.
  pub fn snapshot(&self) -> Contents {
    Contents {
      lines:     self.lines.clone(),
      listeners: Vec::new(),
    }
  }

  fn notify(&self, delta: CursorTransformation) {
    for listener in &self.listeners {
      listener(&delta);
    }
  }

  // Read side.
  //

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 1 && self.lines.get(0).is_some_and(|line| line.is_empty())
  }

  pub fn end_line(&self) -> usize {
    self.len() - 1
  }

  pub fn at(&self, line: usize) -> Result<Arc<Line>> {
    self
      .lines
      .get(line)
      .cloned()
      .ok_or(ContentsError::LineOutOfRange {
        line,
        len: self.len(),
      })
  }

  pub fn back(&self) -> Arc<Line> {
    self.at(self.end_line()).expect("at least one line")
  }

  pub fn character_at(&self, position: LineColumn) -> Result<Option<char>> {
    Ok(self.at(position.line)?.get(position.column))
  }

  /// The full extent of the contents.
  pub fn range(&self) -> Range {
    Range::new(
      LineColumn::zero(),
      LineColumn::new(self.end_line(), self.back().len()),
    )
  }

  /// Characters including one separator per line boundary.
  pub fn count_characters(&self) -> usize {
    let mut count = 0;
    self.lines.for_each(|line| count += line.len() + 1);
    count - 1
  }

  /// Runs `callback` over `(line_number, line)` until it returns false.
  /// Returns whether it always returned true.
  pub fn every_line(&self, mut callback: impl FnMut(usize, &Line) -> bool) -> bool {
    let mut line_number = 0;
    self.lines.every(|line| {
      let keep_going = callback(line_number, line);
      line_number += 1;
      keep_going
    })
  }

  pub fn for_each(&self, mut callback: impl FnMut(&Line)) {
    self.every_line(|_, line| {
      callback(line);
      true
    });
  }

  /// First line index for which `pred` returns false; the lines must be
  /// partitioned with the `pred`-true prefix first.
  pub fn partition_point(&self, mut pred: impl FnMut(&Line) -> bool) -> usize {
    self.lines.partition_point(|line| pred(line))
  }

  /// Clamps `position` into the valid range: line to the last line,
  /// column to that line's length.
  pub fn clamp_position(&self, position: LineColumn) -> LineColumn {
    let line = position.line.min(self.end_line());
    let column = position
      .column
      .min(self.at(line).map(|l| l.len()).unwrap_or(0));
    LineColumn::new(line, column)
  }

  /// The position one character forward, counting the line separator as
  /// one character. `None` at the end of the buffer.
  pub fn position_after(&self, position: LineColumn) -> Option<LineColumn> {
    let position = self.clamp_position(position);
    let line_len = self.at(position.line).ok()?.len();
    if position.column < line_len {
      Some(position.with_column(position.column + 1))
    } else if position.line + 1 < self.len() {
      Some(LineColumn::new(position.line + 1, 0))
    } else {
      None
    }
  }

  /// The position one character back. `None` at the beginning.
  pub fn position_before(&self, position: LineColumn) -> Option<LineColumn> {
    let position = self.clamp_position(position);
    if position.column > 0 {
      Some(position.with_column(position.column - 1))
    } else if position.line > 0 {
      let previous = position.line - 1;
      let len = self.at(previous).ok()?.len();
      Some(LineColumn::new(previous, len))
    } else {
      None
    }
  }

  /// Characters in `[begin, end)`, counting one per line separator.
  pub fn characters_in_range(&self, range: Range) -> usize {
    if range.is_empty() {
      return 0;
    }
    let begin = self.clamp_position(range.begin);
    let end = self.clamp_position(range.end);
    if begin.line == end.line {
      return end.column - begin.column;
    }
    let mut count = self
      .at(begin.line)
      .map(|line| line.len() - begin.column + 1)
      .unwrap_or(0);
    for line in begin.line + 1..end.line {
      count += self.at(line).map(|line| line.len() + 1).unwrap_or(0);
    }
    count + end.column
  }

  pub fn to_text(&self) -> String {
    let mut text = String::new();
    self.every_line(|line_number, line| {
      if line_number > 0 {
        text.push('\n');
      }
      text.push_str(&line.to_string());
      true
    });
    text
  }

  // Write side. Every mutation notifies listeners exactly once.
  //

  /// Replaces the line at `position`; auto-appends when `position` is one
  /// past the last line.
  pub fn set_line(&mut self, position: usize, line: Line) -> Result<()> {
    if position == self.len() {
      self.lines = self.lines.push_back(Arc::new(line));
    } else if position < self.len() {
      self.lines = self.lines.replace(position, Arc::new(line));
    } else {
      return Err(ContentsError::LineOutOfRange {
        line: position,
        len:  self.len(),
      });
    }
    self.notify(CursorTransformation::identity());
    Ok(())
  }

  pub fn insert_line(&mut self, position: usize, line: Line) -> Result<()> {
    if position > self.len() {
      return Err(ContentsError::LineOutOfRange {
        line: position,
        len:  self.len(),
      });
    }
    self.lines = self.lines.insert(position, Arc::new(line));
    self.notify(CursorTransformation::Shift {
      from:    LineColumn::new(position, 0),
      lines:   1,
      columns: 0,
    });
    Ok(())
  }

  pub fn push_back(&mut self, line: Line) {
    self.lines = self.lines.push_back(Arc::new(line));
    self.notify(CursorTransformation::identity());
  }

  /// Erases `[first, last)`. Erasing an empty range does nothing and emits
  /// nothing. The final line surviving-invariant is restored by appending
  /// an empty line when everything was erased.
  pub fn erase_lines(&mut self, first: usize, last: usize, cursors: CursorsBehavior) -> Result<()> {
    if first > last || last > self.len() {
      return Err(ContentsError::LineOutOfRange {
        line: last,
        len:  self.len(),
      });
    }
    if first == last {
      return Ok(());
    }
    self.lines = self.lines.erase_range(first, last);
    if self.lines.is_empty() {
      self.lines = self.lines.push_back(Arc::new(Line::default()));
    }
    match cursors {
      CursorsBehavior::Adjust => self.notify(CursorTransformation::EraseLines { first, last }),
      CursorsBehavior::Unmodified => self.notify(CursorTransformation::identity()),
    }
    Ok(())
  }

  /// Splits the line at `position` into `[0, column)` and `[column, end)`.
  pub fn split_line(&mut self, position: LineColumn) -> Result<()> {
    let line = self.at(position.line)?;
    if position.column > line.len() {
      return Err(ContentsError::ColumnOutOfRange {
        column: position.column,
        amount: 0,
        len:    line.len(),
      });
    }

    let mut prefix = LineBuilder::from_line(&line);
    prefix.delete_to_end(position.column);
    let mut suffix = LineBuilder::from_line(&line);
    suffix.delete_range(0, position.column);

    self.lines = self
      .lines
      .replace(position.line, Arc::new(prefix.build()))
      .insert(position.line + 1, Arc::new(suffix.build()));

    self.notify(CursorTransformation::Compose(vec![
      CursorTransformation::Shift {
        from:    LineColumn::new(position.line + 1, 0),
        lines:   1,
        columns: 0,
      },
      CursorTransformation::Shift {
        from:    position,
        lines:   1,
        columns: -(position.column as isize),
      },
    ]));
    Ok(())
  }

  /// Appends line `line + 1` to line `line` and erases it: removes the
  /// newline at the end of `line`. Out-of-range `line` is a no-op.
  pub fn fold_next_line(&mut self, line: usize) -> Result<()> {
    if line + 1 >= self.len() {
      return Ok(());
    }
    let head = self.at(line)?;
    let tail = self.at(line + 1)?;
    let head_len = head.len();

    let mut folded = LineBuilder::from_line(&head);
    folded.append_line(&tail);
    self.lines = self
      .lines
      .replace(line, Arc::new(folded.build()))
      .erase(line + 1);

    self.notify(CursorTransformation::Shift {
      from:    LineColumn::new(line + 1, 0),
      lines:   -1,
      columns: head_len as isize,
    });
    Ok(())
  }

  /// Deletes `[column, column + amount)` within one line. The range must
  /// be in bounds.
  pub fn delete_chars(&mut self, position: LineColumn, amount: usize) -> Result<()> {
    let line = self.at(position.line)?;
    if position.column + amount > line.len() {
      return Err(ContentsError::ColumnOutOfRange {
        column: position.column,
        amount,
        len:    line.len(),
      });
    }
    if amount == 0 {
      self.notify(CursorTransformation::identity());
      return Ok(());
    }
    let mut builder = LineBuilder::from_line(&line);
    builder.delete_range(position.column, amount);
    self.lines = self.lines.replace(position.line, Arc::new(builder.build()));
    self.notify(CursorTransformation::Shift {
      from:    position,
      lines:   0,
      columns: -(amount as isize),
    });
    Ok(())
  }

  /// Deletes from `position` to the end of its line.
  pub fn delete_to_line_end(&mut self, position: LineColumn) -> Result<()> {
    let len = self.at(position.line)?.len();
    self.delete_chars(position, len.saturating_sub(position.column))
  }

  /// Sets (or appends, when past the end) one character.
  pub fn set_char(&mut self, position: LineColumn, ch: char, styles: StyleSet) -> Result<()> {
    let line = self.at(position.line)?;
    let mut builder = LineBuilder::from_line(&line);
    builder.set_character(position.column, ch, styles);
    self.lines = self.lines.replace(position.line, Arc::new(builder.build()));
    self.notify(CursorTransformation::identity());
    Ok(())
  }

  /// Inserts one blank cell, shifting the rest of the line right.
  pub fn insert_char(&mut self, position: LineColumn) -> Result<()> {
    let line = self.at(position.line)?;
    let mut builder = LineBuilder::from_line(&line);
    builder.insert_blank(position.column);
    self.lines = self.lines.replace(position.line, Arc::new(builder.build()));
    self.notify(CursorTransformation::Shift {
      from:    position,
      lines:   0,
      columns: 1,
    });
    Ok(())
  }

  /// Splices `fragment`'s characters (and styles) into the middle of a
  /// line, shifting the tail right.
  pub fn insert_fragment(&mut self, position: LineColumn, fragment: &Line) -> Result<()> {
    let line = self.at(position.line)?;
    if position.column > line.len() {
      return Err(ContentsError::ColumnOutOfRange {
        column: position.column,
        amount: fragment.len(),
        len:    line.len(),
      });
    }
    if fragment.is_empty() {
      self.notify(CursorTransformation::identity());
      return Ok(());
    }
    let mut builder = LineBuilder::from_line(&line);
    builder.delete_to_end(position.column);
    builder.append_line(fragment);
    let mut tail = LineBuilder::from_line(&line);
    tail.delete_range(0, position.column);
    builder.append_line(&tail.build());
    builder.set_end_of_line_styles(line.end_of_line_styles());
    self.lines = self.lines.replace(position.line, Arc::new(builder.build()));
    self.notify(CursorTransformation::Shift {
      from:    position,
      lines:   0,
      columns: fragment.len() as isize,
    });
    Ok(())
  }

  /// Appends `suffix` to the line at `line`.
  pub fn append_to_line(&mut self, line: usize, suffix: &Line) -> Result<()> {
    let current = self.at(line)?;
    let mut builder = LineBuilder::from_line(&current);
    builder.append_line(suffix);
    self.lines = self.lines.replace(line, Arc::new(builder.build()));
    self.notify(CursorTransformation::identity());
    Ok(())
  }

  pub fn append_text_to_line(&mut self, line: usize, text: LazyText, styles: StyleSet) -> Result<()> {
    let current = self.at(line)?;
    let mut builder = LineBuilder::from_line(&current);
    builder.append_text(text, styles);
    self.lines = self.lines.replace(line, Arc::new(builder.build()));
    self.notify(CursorTransformation::identity());
    Ok(())
  }

  /// Copies whole lines from `source` at line `position`. When
  /// `styles_override` is present, every inherited character takes it.
  pub fn insert(
    &mut self,
    position: usize,
    source: &Contents,
    styles_override: Option<StyleSet>,
  ) -> Result<()> {
    if position > self.len() {
      return Err(ContentsError::LineOutOfRange {
        line: position,
        len:  self.len(),
      });
    }
    let inserted = source.len();
    let mut tree = self.lines.clone();
    let mut at = position;
    source.for_each(|line| {
      let line = match styles_override {
        None => line.clone(),
        Some(styles) => {
          let mut builder = LineBuilder::from_line(line);
          builder.set_all_styles(styles);
          builder.build()
        },
      };
      tree = tree.insert(at, Arc::new(line));
      at += 1;
    });
    self.lines = tree;
    self.notify(CursorTransformation::Shift {
      from:    LineColumn::new(position, 0),
      lines:   inserted as isize,
      columns: 0,
    });
    Ok(())
  }

  /// Sorts the line objects in `[first, last)` by the given order.
  pub fn sort(
    &mut self,
    first: usize,
    last: usize,
    mut compare: impl FnMut(&Line, &Line) -> std::cmp::Ordering,
  ) -> Result<()> {
    if first > last || last > self.len() {
      return Err(ContentsError::LineOutOfRange {
        line: last,
        len:  self.len(),
      });
    }
    let mut slice: Vec<Arc<Line>> = Vec::with_capacity(last - first);
    for index in first..last {
      slice.push(self.at(index)?);
    }
    slice.sort_by(|a, b| compare(a, b));
    let mut tree = self.lines.clone();
    for (offset, line) in slice.into_iter().enumerate() {
      tree = tree.replace(first + offset, line);
    }
    self.lines = tree;
    self.notify(CursorTransformation::identity());
    Ok(())
  }
}

impl std::fmt::Debug for Contents {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Contents")
      .field("lines", &self.len())
      .field("text", &self.to_text())
      .finish()
  }
}
