//! One logical line of a buffer.
//!
//! A [`Line`] is immutable after construction: its characters live in a
//! [`LazyText`] and its styles in a transition map keyed by column. Every
//! edit goes through a [`LineBuilder`], which produces a new `Line` and
//! leaves the original untouched, so lines can be shared freely between
//! buffer snapshots.
//!
//! The transition map stores only the columns where the style set changes;
//! a lookup at column `C` reads the last transition at or before `C`.
//! Padding past the end of the line uses `end_of_line_styles`.

use std::{
  collections::BTreeMap,
  fmt,
  sync::Arc,
};

use rill_core::{
  lazy_text::LazyText,
  style::StyleSet,
};

/// Opaque handle to a per-line scripting context. The expression evaluator
/// collaborator owns the actual value.
pub type Environment = Arc<dyn std::any::Any + Send + Sync>;

#[derive(Clone, Default)]
pub struct Line {
  contents:            LazyText,
  style_transitions:   BTreeMap<usize, StyleSet>,
  end_of_line_styles:  StyleSet,
  environment:         Option<Environment>,
}

impl Line {
  pub fn from_text(contents: impl Into<LazyText>) -> Self {
    Self {
      contents: contents.into(),
      ..Self::default()
    }
  }

  pub fn contents(&self) -> &LazyText {
    &self.contents
  }

  pub fn len(&self) -> usize {
    self.contents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.contents.is_empty()
  }

  /// One past the last column.
  pub fn end_column(&self) -> usize {
    self.len()
  }

  pub fn get(&self, column: usize) -> Option<char> {
    self.contents.get(column)
  }

  pub fn substring(&self, column: usize, len: usize) -> LazyText {
    self.contents.substring(column, len)
  }

  pub fn substring_from(&self, column: usize) -> LazyText {
    self.contents.substring_from(column)
  }

  /// The styles effective at `column`: the last transition at or before
  /// it, or the end-of-line styles past the end.
  pub fn style_at(&self, column: usize) -> StyleSet {
    if column >= self.len() {
      return self.end_of_line_styles;
    }
    self
      .style_transitions
      .range(..=column)
      .next_back()
      .map(|(_, styles)| *styles)
      .unwrap_or_default()
  }

  pub fn style_transitions(&self) -> &BTreeMap<usize, StyleSet> {
    &self.style_transitions
  }

  pub fn end_of_line_styles(&self) -> StyleSet {
    self.end_of_line_styles
  }

  pub fn environment(&self) -> Option<&Environment> {
    self.environment.as_ref()
  }
}

impl fmt::Display for Line {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.contents)
  }
}

impl fmt::Debug for Line {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Line")
      .field("contents", &self.contents.to_string())
      .field("style_transitions", &self.style_transitions)
      .finish_non_exhaustive()
  }
}

impl PartialEq for Line {
  fn eq(&self, other: &Self) -> bool {
    self.contents == other.contents
      && self.style_transitions == other.style_transitions
      && self.end_of_line_styles == other.end_of_line_styles
  }
}

impl From<&str> for Line {
  fn from(value: &str) -> Self {
    Self::from_text(LazyText::from(value))
  }
}

/// Edit staging area for producing a new [`Line`].
///
/// Internally styles are held as one `StyleSet` per column, which makes
/// re-keying under splices trivial; [`LineBuilder::build`] compresses the
/// vector back into the transition map.
#[derive(Default)]
pub struct LineBuilder {
  contents:           LazyText,
  styles:             Vec<StyleSet>,
  end_of_line_styles: StyleSet,
  environment:        Option<Environment>,
}

impl LineBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_line(line: &Line) -> Self {
    let styles = (0..line.len()).map(|column| line.style_at(column)).collect();
    Self {
      contents:           line.contents.clone(),
      styles,
      end_of_line_styles: line.end_of_line_styles,
      environment:        line.environment.clone(),
    }
  }

  pub fn len(&self) -> usize {
    self.contents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.contents.is_empty()
  }

  pub fn contents(&self) -> &LazyText {
    &self.contents
  }

  pub fn append_char(&mut self, ch: char, styles: StyleSet) -> &mut Self {
    let mut buffer = [0_u8; 4];
    self.append_text(LazyText::from(&*ch.encode_utf8(&mut buffer)), styles)
  }

  pub fn append_text(&mut self, text: LazyText, styles: StyleSet) -> &mut Self {
    let added = text.len();
    self.contents = LazyText::append(std::mem::take(&mut self.contents), text);
    self.styles.extend(std::iter::repeat(styles).take(added));
    self
  }

  /// Appends another line's characters and styles; adopts its end-of-line
  /// styles.
  pub fn append_line(&mut self, line: &Line) -> &mut Self {
    for column in 0..line.len() {
      self.styles.push(line.style_at(column));
    }
    self.contents = LazyText::append(std::mem::take(&mut self.contents), line.contents.clone());
    self.end_of_line_styles = line.end_of_line_styles;
    self
  }

  /// Replaces the character at `column`, or appends exactly one character
  /// when `column` is at or past the end.
  pub fn set_character(&mut self, column: usize, ch: char, styles: StyleSet) -> &mut Self {
    if column >= self.len() {
      return self.append_char(ch, styles);
    }
    let mut buffer = [0_u8; 4];
    let replacement = LazyText::from(&*ch.encode_utf8(&mut buffer));
    let tail = self.contents.substring_from(column + 1);
    let head = self.contents.substring(0, column);
    self.contents = LazyText::append(LazyText::append(head, replacement), tail);
    self.styles[column] = styles;
    self
  }

  /// Deletes `[column, column + amount)`.
  pub fn delete_range(&mut self, column: usize, amount: usize) -> &mut Self {
    let end = (column + amount).min(self.len());
    let column = column.min(end);
    let head = self.contents.substring(0, column);
    let tail = self.contents.substring_from(end);
    self.contents = LazyText::append(head, tail);
    self.styles.drain(column..end);
    self
  }

  pub fn delete_to_end(&mut self, column: usize) -> &mut Self {
    let len = self.len();
    self.delete_range(column, len.saturating_sub(column))
  }

  /// Inserts one blank cell at `column`.
  pub fn insert_blank(&mut self, column: usize) -> &mut Self {
    let column = column.min(self.len());
    let head = self.contents.substring(0, column);
    let tail = self.contents.substring_from(column);
    self.contents = LazyText::append(LazyText::append(head, LazyText::padding(' ', 1)), tail);
    self.styles.insert(column, StyleSet::empty());
    self
  }

  pub fn set_all_styles(&mut self, styles: StyleSet) -> &mut Self {
    for slot in &mut self.styles {
      *slot = styles;
    }
    self.end_of_line_styles = styles;
    self
  }

  pub fn set_end_of_line_styles(&mut self, styles: StyleSet) -> &mut Self {
    self.end_of_line_styles = styles;
    self
  }

  pub fn set_environment(&mut self, environment: Environment) -> &mut Self {
    self.environment = Some(environment);
    self
  }

  pub fn build(self) -> Line {
    debug_assert_eq!(self.styles.len(), self.contents.len());
    let mut transitions = BTreeMap::new();
    let mut current = StyleSet::empty();
    for (column, styles) in self.styles.iter().enumerate() {
      if column == 0 && !styles.is_empty() || column > 0 && *styles != current {
        transitions.insert(column, *styles);
      }
      current = *styles;
    }
    Line {
      contents:           self.contents,
      style_transitions:  transitions,
      end_of_line_styles: self.end_of_line_styles,
      environment:        self.environment,
    }
  }
}
