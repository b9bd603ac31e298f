//! A buffer: contents, cursors, history, variables and an optional input
//! fd, coupled behind one mutation path.
//!
//! Content mutations flow through the contents' update listener into the
//! cursor tracker, so every named cursor set observes deltas in mutation
//! order. User transformations land through [`Buffer::apply`], which
//! pushes the returned inverse onto the undo stack; undo and redo apply
//! inverses symmetrically.

use std::{
  os::fd::{
    OwnedFd,
    RawFd,
  },
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use parking_lot::Mutex;
use rill_core::{
  chars::WordChars,
  lazy_text::LazyText,
  position::{
    LineColumn,
    Range,
  },
};
use rill_event::reader::FdReader;
use tracing::debug;

use crate::{
  contents::{
    Contents,
    ContentsError,
    CursorsBehavior,
  },
  cursors::{
    CursorTransformation,
    CursorsTracker,
  },
  line::{
    Line,
    LineBuilder,
  },
  modifiers::Modifiers,
  parse::{
    ParseTree,
    ParseTreeCache,
    parser::LineParser,
  },
  status::Status,
  structure::{
    Structure,
    StructureContext,
  },
  transformation::{
    ApplyOutput,
    Result as TransformationResult,
    Transformation,
  },
  variables::{
    BufferVariables,
    VariableBag,
  },
  widget::BufferName,
};

/// State of the fd feeding this buffer, when there is one.
struct InputState {
  reader:         FdReader,
  fd_is_terminal: bool,
  child_pid:      Option<i32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadStatus {
  /// No fd attached.
  NoInput,
  /// Data consumed (possibly none); the fd stays open.
  Open,
  /// The fd reached end-of-file and was closed.
  Eof { reload_requested: bool },
  /// A read error closed the fd; the buffer survives.
  Failed,
}

pub type FilterPredicate = Arc<dyn Fn(&Line) -> bool + Send + Sync>;

pub struct Buffer {
  name:              BufferName,
  contents:          Contents,
  cursors:           Arc<Mutex<CursorsTracker>>,
  version:           Arc<AtomicU64>,
  pub modifiers:     Modifiers,
  last_search_query: Option<String>,
  undo_stack:        Vec<Transformation>,
  redo_stack:        Vec<Transformation>,
  variables:         VariableBag,
  variable_ids:      BufferVariables,
  filter:            Option<FilterPredicate>,
  filter_version:    u64,
  input:             Option<InputState>,
  input_appended:    bool,
  parse_cache:       ParseTreeCache,
  parse_tree:        Option<(u64, Arc<ParseTree>)>,
  status:            Status,
}

impl Buffer {
  pub fn new(
    name: impl Into<BufferName>,
    variable_ids: BufferVariables,
    parser: Arc<dyn LineParser>,
  ) -> Self {
    let cursors = Arc::new(Mutex::new(CursorsTracker::new()));
    let version = Arc::new(AtomicU64::new(0));

    let mut contents = Contents::new();
    let listener_cursors = cursors.clone();
    let listener_version = version.clone();
    contents.add_listener(Arc::new(move |delta: &CursorTransformation| {
      listener_version.fetch_add(1, Ordering::SeqCst);
      listener_cursors.lock().apply(delta);
    }));

    let variables = VariableBag::new(variable_ids.registry.clone());
    let mut buffer = Self {
      name: name.into(),
      contents,
      cursors,
      version,
      modifiers: Modifiers::default(),
      last_search_query: None,
      undo_stack: Vec::new(),
      redo_stack: Vec::new(),
      variables,
      variable_ids,
      filter: None,
      filter_version: 0,
      input: None,
      input_appended: false,
      parse_cache: ParseTreeCache::new(parser),
      parse_tree: None,
      status: Status::new(),
    };
    buffer.set_position(LineColumn::zero());
    buffer
  }

  pub fn name(&self) -> &BufferName {
    &self.name
  }

  pub fn contents(&self) -> &Contents {
    &self.contents
  }

  pub fn contents_mut(&mut self) -> &mut Contents {
    &mut self.contents
  }

  pub fn status(&self) -> &Status {
    &self.status
  }

  pub fn status_mut(&mut self) -> &mut Status {
    &mut self.status
  }

  pub fn variables(&self) -> &VariableBag {
    &self.variables
  }

  pub fn variables_mut(&mut self) -> &mut VariableBag {
    &mut self.variables
  }

  pub fn variable_ids(&self) -> &BufferVariables {
    &self.variable_ids
  }

  pub fn to_text(&self) -> String {
    self.contents.to_text()
  }

  /// Replaces the contents wholesale (loading a file).
  pub fn set_text(&mut self, text: &str) {
    let end = self.contents.len();
    let _ = self
      .contents
      .erase_lines(0, end, CursorsBehavior::Unmodified);
    let source = Contents::from_text(text);
    if source.len() > 1 || !source.is_empty() {
      // The erase left one empty line; fold the inserted block onto it.
      let _ = self.contents.insert(0, &source, None);
      let last = self.contents.len() - 1;
      let _ = self.contents.erase_lines(last, last + 1, CursorsBehavior::Unmodified);
    }
    self.set_position(LineColumn::zero());
  }

  // Cursors.
  //

  pub fn position(&self) -> LineColumn {
    self.cursors.lock().active_cursor()
  }

  pub fn set_position(&mut self, position: LineColumn) {
    let position = self.contents.clamp_position(position);
    self.cursors.lock().active_set_mut().move_active(position);
  }

  pub fn active_cursors(&self) -> Vec<LineColumn> {
    self.cursors.lock().active_set().iter().collect()
  }

  pub fn set_active_cursors(&mut self, positions: Vec<LineColumn>, active: LineColumn) {
    let mut cursors = self.cursors.lock();
    let set = cursors.active_set_mut();
    set.assign(positions);
    set.set_active(active);
  }

  pub fn cursors(&self) -> &Arc<Mutex<CursorsTracker>> {
    &self.cursors
  }

  /// Monotone counter bumped by every contents mutation.
  pub fn version(&self) -> u64 {
    self.version.load(Ordering::SeqCst)
  }

  // Search state.
  //

  pub fn last_search_query(&self) -> Option<&str> {
    self.last_search_query.as_deref()
  }

  pub fn set_last_search_query(&mut self, query: impl Into<String>) {
    self.last_search_query = Some(query.into());
  }

  // Variables-derived settings.
  //

  pub fn word_chars(&self) -> WordChars {
    let extra = self
      .variables
      .get_str(self.variable_ids.word_characters)
      .unwrap_or_default();
    WordChars::new(String::from(extra.as_str()))
  }

  pub fn symbol_chars(&self) -> WordChars {
    let extra = self
      .variables
      .get_str(self.variable_ids.symbol_characters)
      .unwrap_or_default();
    WordChars::new(String::from(extra.as_str()))
  }

  pub fn lines_per_page(&self) -> usize {
    self
      .variables
      .get_int(self.variable_ids.lines_per_page)
      .unwrap_or(25)
      .max(1) as usize
  }

  fn undo_limit(&self) -> usize {
    self
      .variables
      .get_int(self.variable_ids.undo_limit)
      .unwrap_or(1024)
      .max(1) as usize
  }

  // Structures.
  //

  pub fn find_partial_range(&mut self, position: LineColumn, modifiers: &Modifiers) -> Range {
    let tree = match modifiers.structure {
      Structure::Tree => Some(self.parse_tree()),
      _ => None,
    };
    let word_chars = self.word_chars();
    let symbol_chars = self.symbol_chars();
    let lines_per_page = self.lines_per_page();
    let cursors = self.cursors.lock();
    let context = StructureContext {
      contents: &self.contents,
      word_chars,
      symbol_chars,
      lines_per_page,
      last_search_query: self.last_search_query.as_deref(),
      cursors: &cursors,
      parse_tree: tree.as_deref(),
    };
    modifiers
      .structure
      .find_partial_range(&context, position, modifiers)
  }

  // Transformations, undo, redo.
  //

  /// The user mutation path: applies, moves the cursor, records the
  /// inverse, clears redo.
  pub fn apply(&mut self, transformation: &Transformation) -> TransformationResult<ApplyOutput> {
    let output = transformation.apply(self)?;
    self.set_position(output.position);
    if output.made_progress {
      self.redo_stack.clear();
      self.push_undo(output.inverse.clone());
    }
    Ok(output)
  }

  fn push_undo(&mut self, inverse: Transformation) {
    let limit = self.undo_limit();
    while self.undo_stack.len() >= limit {
      self.undo_stack.remove(0);
    }
    self.undo_stack.push(inverse);
  }

  pub fn undo(&mut self) -> TransformationResult<bool> {
    let Some(inverse) = self.undo_stack.pop() else {
      return Ok(false);
    };
    let output = inverse.apply(self)?;
    self.set_position(output.position);
    self.redo_stack.push(output.inverse);
    Ok(true)
  }

  pub fn redo(&mut self) -> TransformationResult<bool> {
    let Some(inverse) = self.redo_stack.pop() else {
      return Ok(false);
    };
    let output = inverse.apply(self)?;
    self.set_position(output.position);
    self.undo_stack.push(output.inverse);
    Ok(true)
  }

  pub fn undo_depth(&self) -> usize {
    self.undo_stack.len()
  }

  pub fn redo_depth(&self) -> usize {
    self.redo_stack.len()
  }

  // Compound content edits used by the transformation engine.
  //

  /// Inserts `source` at `position` (line-splice semantics) and returns
  /// the position just past the inserted text.
  pub fn insert_contents_at(
    &mut self,
    source: &Contents,
    position: LineColumn,
  ) -> std::result::Result<LineColumn, ContentsError> {
    let position = self.contents.clamp_position(position);
    let lines = source.len();
    if lines == 1 {
      let fragment = source.at(0)?;
      if fragment.is_empty() {
        return Ok(position);
      }
      self.contents.insert_fragment(position, &fragment)?;
      return Ok(position.with_column(position.column + fragment.len()));
    }

    self.contents.split_line(position)?;
    let first = source.at(0)?;
    self.contents.append_to_line(position.line, &first)?;
    for index in 1..lines - 1 {
      let line = source.at(index)?;
      self
        .contents
        .insert_line(position.line + index, (*line).clone())?;
    }
    let last = source.at(lines - 1)?;
    let suffix_line = position.line + lines - 1;
    self
      .contents
      .insert_fragment(LineColumn::new(suffix_line, 0), &last)?;
    Ok(LineColumn::new(suffix_line, last.len()))
  }

  /// Deletes `[range.begin, range.end)` and returns the removed content,
  /// styles preserved.
  pub fn delete_range(&mut self, range: Range) -> std::result::Result<Contents, ContentsError> {
    let begin = self.contents.clamp_position(range.begin);
    let end = self.contents.clamp_position(range.end);
    if begin >= end {
      return Ok(Contents::new());
    }

    fn line_slice(line: &Line, begin: usize, end: usize) -> Line {
      let mut builder = LineBuilder::from_line(line);
      builder.delete_to_end(end);
      builder.delete_range(0, begin);
      builder.build()
    }

    if begin.line == end.line {
      let line = self.contents.at(begin.line)?;
      let deleted =
        Contents::from_lines([line_slice(&line, begin.column, end.column)]);
      self
        .contents
        .delete_chars(begin, end.column - begin.column)?;
      return Ok(deleted);
    }

    let mut removed_lines = Vec::with_capacity(end.line - begin.line + 1);
    let first = self.contents.at(begin.line)?;
    removed_lines.push(line_slice(&first, begin.column, first.len()));
    for index in begin.line + 1..end.line {
      removed_lines.push((*self.contents.at(index)?).clone());
    }
    let last = self.contents.at(end.line)?;
    removed_lines.push(line_slice(&last, 0, end.column));

    self.contents.delete_to_line_end(begin)?;
    self
      .contents
      .delete_chars(LineColumn::new(end.line, 0), end.column)?;
    self
      .contents
      .erase_lines(begin.line + 1, end.line, CursorsBehavior::Adjust)?;
    self.contents.fold_next_line(begin.line)?;

    Ok(Contents::from_lines(removed_lines))
  }

  // Parse tree.
  //

  pub fn parse_tree(&mut self) -> Arc<ParseTree> {
    let version = self.version();
    if let Some((cached_version, tree)) = &self.parse_tree {
      if *cached_version == version {
        return tree.clone();
      }
    }
    let tree = Arc::new(self.parse_cache.parse(&self.contents));
    self.parse_tree = Some((version, tree.clone()));
    tree
  }

  pub fn parse_cache(&self) -> &ParseTreeCache {
    &self.parse_cache
  }

  // Filter view.
  //

  pub fn set_filter(&mut self, filter: FilterPredicate) {
    self.filter = Some(filter);
    self.filter_version += 1;
  }

  pub fn clear_filter(&mut self) {
    if self.filter.take().is_some() {
      self.filter_version += 1;
    }
  }

  pub fn filter_version(&self) -> u64 {
    self.filter_version
  }

  /// Whether the line is visible under the current filter.
  pub fn line_visible(&self, line: usize) -> bool {
    match (&self.filter, self.contents.at(line)) {
      (Some(filter), Ok(line)) => filter(&line),
      _ => true,
    }
  }

  // Input fd plumbing.
  //

  pub fn set_input_file(
    &mut self,
    fd: OwnedFd,
    fd_is_terminal: bool,
    child_pid: Option<i32>,
  ) -> std::result::Result<(), rill_event::reader::ReadError> {
    let reader = FdReader::new(fd)?;
    self.input = Some(InputState {
      reader,
      fd_is_terminal,
      child_pid,
    });
    self.input_appended = false;
    Ok(())
  }

  pub fn input_fd(&self) -> Option<RawFd> {
    self.input.as_ref().map(|input| input.reader.raw_fd())
  }

  pub fn fd_is_terminal(&self) -> bool {
    self.input.as_ref().is_some_and(|input| input.fd_is_terminal)
  }

  pub fn child_pid(&self) -> Option<i32> {
    self.input.as_ref().and_then(|input| input.child_pid)
  }

  fn append_input_line(&mut self, text: &str) {
    let line = Line::from_text(LazyText::from(text));
    if !self.input_appended && self.contents.is_empty() {
      let _ = self.contents.set_line(0, line);
    } else {
      self.contents.push_back(line);
    }
    self.input_appended = true;
  }

  /// Drains whatever the input fd has ready. Completed lines append to
  /// the contents; a partial trailing segment stays in the reader until
  /// its newline arrives.
  pub fn read_data(&mut self) -> ReadStatus {
    let Some(input) = self.input.as_mut() else {
      return ReadStatus::NoInput;
    };
    let outcome = match input.reader.read_available() {
      Ok(outcome) => outcome,
      Err(error) => {
        self.input = None;
        self.status.set_warning(format!("input read failed: {error}"));
        return ReadStatus::Failed;
      },
    };

    let lines: Vec<String> = outcome
      .lines
      .iter()
      .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
      .collect();
    for line in &lines {
      self.append_input_line(line);
    }

    if !outcome.eof {
      return ReadStatus::Open;
    }

    if let Some(trailing) = outcome.trailing {
      let text = String::from_utf8_lossy(&trailing).into_owned();
      self.append_input_line(&text);
    }
    self.end_of_file()
  }

  /// Transitions out of fd-backed mode; runs exactly once per attached
  /// fd.
  fn end_of_file(&mut self) -> ReadStatus {
    debug!(buffer = %self.name, "input fd reached end of file");
    self.input = None;
    let reload_requested = self
      .variables
      .get_bool(self.variable_ids.reload_after_exit)
      .unwrap_or(false)
      || self
        .variables
        .get_bool(self.variable_ids.default_reload_after_exit)
        .unwrap_or(false);
    self.status.set_information("end of file");
    ReadStatus::Eof { reload_requested }
  }
}

impl std::fmt::Debug for Buffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Buffer")
      .field("name", &self.name)
      .field("lines", &self.contents.len())
      .field("position", &self.position())
      .field("undo_depth", &self.undo_stack.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::parse::parser::NullParser;

  fn buffer_with(text: &str) -> Buffer {
    let mut buffer = Buffer::new(
      "test",
      BufferVariables::build(),
      Arc::new(NullParser),
    );
    buffer.set_text(text);
    buffer
  }

  #[test]
  fn set_text_round_trips() {
    let buffer = buffer_with("one\ntwo\nthree");
    assert_eq!(buffer.to_text(), "one\ntwo\nthree");
    assert_eq!(buffer.position(), LineColumn::zero());
  }

  #[test]
  fn insert_single_line_fragment() {
    let mut buffer = buffer_with("ab\ncd");
    let end = buffer
      .insert_contents_at(&Contents::from_text("X"), LineColumn::new(0, 1))
      .unwrap();
    assert_eq!(buffer.to_text(), "aXb\ncd");
    assert_eq!(end, LineColumn::new(0, 2));
  }

  #[test]
  fn insert_multi_line_contents() {
    let mut buffer = buffer_with("a\nef");
    let end = buffer
      .insert_contents_at(&Contents::from_text("b\ncd"), LineColumn::new(0, 1))
      .unwrap();
    assert_eq!(buffer.to_text(), "ab\ncd\nef");
    assert_eq!(end, LineColumn::new(1, 2));
  }

  #[test]
  fn delete_range_within_line() {
    let mut buffer = buffer_with("abcdef");
    let deleted = buffer
      .delete_range(Range::new(LineColumn::new(0, 1), LineColumn::new(0, 4)))
      .unwrap();
    assert_eq!(buffer.to_text(), "aef");
    assert_eq!(deleted.to_text(), "bcd");
  }

  #[test]
  fn delete_range_across_lines() {
    let mut buffer = buffer_with("ab\ncd\nef");
    let deleted = buffer
      .delete_range(Range::new(LineColumn::new(0, 1), LineColumn::new(1, 2)))
      .unwrap();
    assert_eq!(buffer.to_text(), "a\nef");
    assert_eq!(deleted.to_text(), "b\ncd");
  }

  #[test]
  fn cursors_follow_edits() {
    let mut buffer = buffer_with("hello\nworld");
    buffer.set_position(LineColumn::new(1, 3));
    buffer
      .insert_contents_at(&Contents::from_text("say "), LineColumn::new(1, 0))
      .unwrap();
    assert_eq!(buffer.position(), LineColumn::new(1, 7));
  }

  #[test]
  fn parse_tree_caches_by_version() {
    let mut buffer = buffer_with("x");
    let first = buffer.parse_tree();
    let second = buffer.parse_tree();
    assert!(Arc::ptr_eq(&first, &second));

    buffer
      .contents_mut()
      .set_line(0, Line::from("y"))
      .unwrap();
    let third = buffer.parse_tree();
    assert!(!Arc::ptr_eq(&first, &third));
  }

  #[test]
  fn filter_controls_visibility() {
    let mut buffer = buffer_with("keep\ndrop\nkeep");
    assert!(buffer.line_visible(1));
    buffer.set_filter(Arc::new(|line| line.to_string().starts_with("keep")));
    assert!(buffer.line_visible(0));
    assert!(!buffer.line_visible(1));
    assert_eq!(buffer.filter_version(), 1);
    buffer.clear_filter();
    assert!(buffer.line_visible(1));
  }

  #[test]
  fn fd_lines_append_with_partial_carryover() {
    use std::io::Write;

    let (read_end, write_end) = nix::unistd::pipe().unwrap();
    let mut writer = std::fs::File::from(write_end);

    let mut buffer = buffer_with("");
    buffer.set_input_file(read_end, false, None).unwrap();

    writer.write_all(b"abc\nde").unwrap();
    assert_eq!(buffer.read_data(), ReadStatus::Open);
    assert_eq!(buffer.to_text(), "abc");

    writer.write_all(b"f\n").unwrap();
    assert_eq!(buffer.read_data(), ReadStatus::Open);
    assert_eq!(buffer.to_text(), "abc\ndef");
  }

  #[test]
  fn fd_eof_transitions_exactly_once() {
    use std::io::Write;

    let (read_end, write_end) = nix::unistd::pipe().unwrap();
    let mut writer = std::fs::File::from(write_end);

    let mut buffer = buffer_with("");
    let reload_id = buffer.variable_ids().reload_after_exit;
    buffer.variables_mut().set_bool(reload_id, true).unwrap();
    buffer.set_input_file(read_end, false, Some(1234)).unwrap();
    assert_eq!(buffer.child_pid(), Some(1234));

    writer.write_all(b"done\n").unwrap();
    drop(writer);

    assert_eq!(
      buffer.read_data(),
      ReadStatus::Eof {
        reload_requested: true,
      }
    );
    assert!(buffer.input_fd().is_none());
    assert_eq!(buffer.read_data(), ReadStatus::NoInput);
  }
}
