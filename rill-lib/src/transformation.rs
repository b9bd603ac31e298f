//! Composable, undoable buffer mutations.
//!
//! Every user intent becomes one [`Transformation`] value. Applying it to
//! a buffer performs the edit and returns an [`ApplyOutput`] carrying the
//! *inverse* transformation: undo is nothing more than applying that
//! inverse. Transformations never fail with a panic and never throw; all
//! reporting is on the output value.

use std::sync::Arc;

use rill_core::position::{
  LineColumn,
  Range,
};
use thiserror::Error;

use crate::{
  buffer::Buffer,
  contents::{
    Contents,
    ContentsError,
  },
  modifiers::{
    Direction,
    Modifiers,
    ModifyMode,
  },
  structure::Structure,
};

pub type Result<T> = std::result::Result<T, TransformationError>;

#[derive(Debug, Error)]
pub enum TransformationError {
  #[error(transparent)]
  Contents(#[from] ContentsError),
}

/// Where the cursor lands after an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalPosition {
  Start,
  End,
}

/// What happens when a character-count delete reaches the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEndBehavior {
  /// Do not consume the newline.
  Stop,
  /// The newline counts as one deleted character.
  DeleteTrailingNewline,
}

#[derive(Debug, Clone)]
pub struct InsertSpec {
  /// Lines to insert. A snapshot: shares nothing mutable.
  pub content:        Contents,
  /// Fixed position, or `None` for the active cursor.
  pub position:       Option<LineColumn>,
  pub mode:           ModifyMode,
  pub repetitions:    usize,
  pub final_position: FinalPosition,
}

impl InsertSpec {
  pub fn at_cursor(content: Contents) -> Self {
    Self {
      content,
      position: None,
      mode: ModifyMode::Shift,
      repetitions: 1,
      final_position: FinalPosition::End,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DeleteSpec {
  pub modifiers:         Modifiers,
  pub copy_to_paste:     bool,
  pub line_end_behavior: LineEndBehavior,
}

impl DeleteSpec {
  pub fn chars(repetitions: usize) -> Self {
    Self {
      modifiers:         Modifiers::default().with_repetitions(repetitions),
      copy_to_paste:     false,
      line_end_behavior: LineEndBehavior::DeleteTrailingNewline,
    }
  }
}

/// Input handed to a [`CompositeTransformation`]. Read-only by
/// construction: composites can only push further transformations.
pub struct CompositeInput<'a> {
  pub buffer:    &'a Buffer,
  pub position:  LineColumn,
  /// The partial range of the latched structure at `position`.
  pub range:     Range,
  pub modifiers: Modifiers,
}

#[derive(Default)]
pub struct CompositeOutput {
  transformations: Vec<Transformation>,
}

impl CompositeOutput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_position(position: LineColumn) -> Self {
    let mut output = Self::new();
    output.push(Transformation::SetPosition(position));
    output
  }

  pub fn push(&mut self, transformation: Transformation) {
    self.transformations.push(transformation);
  }
}

/// A user-defined transformation that only composes built-in ones; it
/// never touches buffer contents directly.
pub trait CompositeTransformation: Send + Sync {
  fn describe(&self) -> String;
  fn apply(&self, input: &CompositeInput<'_>) -> CompositeOutput;
}

#[derive(Clone)]
pub enum Transformation {
  Insert(InsertSpec),
  Delete(DeleteSpec),
  SetPosition(LineColumn),
  SetCursors {
    positions: Vec<LineColumn>,
    active:    LineColumn,
  },
  Stack(Vec<Transformation>),
  Repeat {
    times:          usize,
    transformation: Box<Transformation>,
  },
  Composite(Arc<dyn CompositeTransformation>),
  /// Toggle between the ends of the smallest parse-tree node around the
  /// cursor.
  TreeNavigate,
}

impl std::fmt::Debug for Transformation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Transformation::Insert(spec) => f.debug_tuple("Insert").field(spec).finish(),
      Transformation::Delete(spec) => f.debug_tuple("Delete").field(spec).finish(),
      Transformation::SetPosition(position) => {
        f.debug_tuple("SetPosition").field(position).finish()
      },
      Transformation::SetCursors { positions, active } => {
        f.debug_struct("SetCursors")
          .field("positions", positions)
          .field("active", active)
          .finish()
      },
      Transformation::Stack(stack) => f.debug_tuple("Stack").field(stack).finish(),
      Transformation::Repeat {
        times,
        transformation,
      } => {
        f.debug_struct("Repeat")
          .field("times", times)
          .field("transformation", transformation)
          .finish()
      },
      Transformation::Composite(composite) => {
        write!(f, "Composite({})", composite.describe())
      },
      Transformation::TreeNavigate => write!(f, "TreeNavigate"),
    }
  }
}

#[derive(Debug)]
pub struct ApplyOutput {
  pub inverse:         Transformation,
  pub position:        LineColumn,
  pub made_progress:   bool,
  pub modified_buffer: bool,
  /// Deleted content for the paste buffer, when requested.
  pub deleted:         Option<Contents>,
}

impl ApplyOutput {
  fn noop(position: LineColumn) -> Self {
    Self {
      inverse:         Transformation::identity(),
      position,
      made_progress:   false,
      modified_buffer: false,
      deleted:         None,
    }
  }
}

impl Transformation {
  pub fn identity() -> Self {
    Transformation::Stack(Vec::new())
  }

  /// Applies the transformation at the buffer's active cursor. The
  /// buffer's cursor is *not* updated here; callers (the buffer's apply
  /// path) move it to `ApplyOutput::position`.
  pub fn apply(&self, buffer: &mut Buffer) -> Result<ApplyOutput> {
    let position = buffer.position();
    match self {
      Transformation::Insert(spec) => apply_insert(buffer, spec, position),
      Transformation::Delete(spec) => apply_delete(buffer, spec, position),
      Transformation::SetPosition(target) => {
        let target = buffer.contents().clamp_position(*target);
        Ok(ApplyOutput {
          inverse:         Transformation::SetPosition(position),
          position:        target,
          made_progress:   target != position,
          modified_buffer: false,
          deleted:         None,
        })
      },
      Transformation::SetCursors { positions, active } => {
        let old_positions: Vec<LineColumn> = buffer.active_cursors();
        let inverse = Transformation::SetCursors {
          positions: old_positions,
          active:    position,
        };
        buffer.set_active_cursors(positions.clone(), *active);
        Ok(ApplyOutput {
          inverse,
          position: *active,
          made_progress: true,
          modified_buffer: false,
          deleted: None,
        })
      },
      Transformation::Stack(stack) => apply_stack(buffer, stack),
      Transformation::Repeat {
        times,
        transformation,
      } => apply_repeat(buffer, *times, transformation),
      Transformation::Composite(composite) => apply_composite(buffer, composite.as_ref()),
      Transformation::TreeNavigate => apply_tree_navigate(buffer, position),
    }
  }
}

fn merge_deleted(first: Option<Contents>, second: Option<Contents>) -> Option<Contents> {
  match (first, second) {
    (None, second) => second,
    (first, None) => first,
    (Some(first), Some(second)) => {
      let mut lines: Vec<crate::line::Line> = Vec::new();
      first.for_each(|line| lines.push(line.clone()));
      second.for_each(|line| lines.push(line.clone()));
      Some(Contents::from_lines(lines))
    },
  }
}

fn apply_stack(buffer: &mut Buffer, stack: &[Transformation]) -> Result<ApplyOutput> {
  let mut inverses = Vec::with_capacity(stack.len());
  let mut output = ApplyOutput::noop(buffer.position());
  for transformation in stack {
    let step = transformation.apply(buffer)?;
    buffer.set_position(step.position);
    output.position = step.position;
    output.made_progress |= step.made_progress;
    output.modified_buffer |= step.modified_buffer;
    output.deleted = merge_deleted(output.deleted.take(), step.deleted);
    inverses.push(step.inverse);
  }
  inverses.reverse();
  output.inverse = Transformation::Stack(inverses);
  Ok(output)
}

fn apply_repeat(
  buffer: &mut Buffer,
  times: usize,
  transformation: &Transformation,
) -> Result<ApplyOutput> {
  let mut inverses = Vec::new();
  let mut output = ApplyOutput::noop(buffer.position());
  for _ in 0..times {
    let step = transformation.apply(buffer)?;
    let made_progress = step.made_progress;
    buffer.set_position(step.position);
    output.position = step.position;
    output.made_progress |= made_progress;
    output.modified_buffer |= step.modified_buffer;
    output.deleted = merge_deleted(output.deleted.take(), step.deleted);
    inverses.push(step.inverse);
    if !made_progress {
      break;
    }
  }
  inverses.reverse();
  output.inverse = Transformation::Stack(inverses);
  Ok(output)
}

fn apply_composite(
  buffer: &mut Buffer,
  composite: &dyn CompositeTransformation,
) -> Result<ApplyOutput> {
  let position = buffer.position();
  let modifiers = buffer.modifiers;
  let range = buffer.find_partial_range(position, &modifiers);
  let output = {
    let input = CompositeInput {
      buffer: &*buffer,
      position,
      range,
      modifiers,
    };
    composite.apply(&input)
  };
  apply_stack(buffer, &output.transformations)
}

fn apply_insert(buffer: &mut Buffer, spec: &InsertSpec, cursor: LineColumn) -> Result<ApplyOutput> {
  let base = spec.position.unwrap_or(cursor);
  let start = buffer.contents().clamp_position(base);
  let chars_per_repetition = spec.content.count_characters();
  let total_chars = chars_per_repetition * spec.repetitions;
  if total_chars == 0 {
    return Ok(ApplyOutput::noop(cursor));
  }

  let mut end = start;
  for _ in 0..spec.repetitions {
    end = buffer.insert_contents_at(&spec.content, end)?;
  }

  // The undo stack runs in order, so the overwrite's restoration must
  // precede the deletion of the inserted text.
  let mut inverse_stack = Vec::new();
  if spec.mode == ModifyMode::Overwrite {
    // Consume the characters that were pushed right, staying on the line.
    let overwrite_range = char_range_from(buffer, end, total_chars, LineEndBehavior::Stop);
    if !overwrite_range.is_empty() {
      let removed = buffer.delete_range(overwrite_range)?;
      inverse_stack.push(Transformation::SetPosition(end));
      inverse_stack.push(Transformation::Insert(InsertSpec {
        content:        removed,
        position:       None,
        mode:           ModifyMode::Shift,
        repetitions:    1,
        final_position: FinalPosition::Start,
      }));
    }
  }
  inverse_stack.push(Transformation::SetPosition(start));
  inverse_stack.push(Transformation::Delete(DeleteSpec::chars(total_chars)));

  let position = match (spec.position, spec.final_position) {
    (Some(_), _) => cursor,
    (None, FinalPosition::Start) => start,
    (None, FinalPosition::End) => end,
  };

  Ok(ApplyOutput {
    inverse: Transformation::Stack(inverse_stack),
    position,
    made_progress: true,
    modified_buffer: true,
    deleted: None,
  })
}

/// `[start, start + amount characters)`, where the newline separates lines
/// as one character. `Stop` refuses to leave the starting line.
fn char_range_from(
  buffer: &Buffer,
  start: LineColumn,
  amount: usize,
  behavior: LineEndBehavior,
) -> Range {
  let contents = buffer.contents();
  let start = contents.clamp_position(start);
  match behavior {
    LineEndBehavior::Stop => {
      let line_len = contents
        .at(start.line)
        .map(|line| line.len())
        .unwrap_or(0);
      let end_column = (start.column + amount).min(line_len);
      Range::new(start, start.with_column(end_column))
    },
    LineEndBehavior::DeleteTrailingNewline => {
      let mut end = start;
      for _ in 0..amount {
        match contents.position_after(end) {
          Some(next) => end = next,
          None => break,
        }
      }
      Range::new(start, end)
    },
  }
}

fn apply_delete(buffer: &mut Buffer, spec: &DeleteSpec, cursor: LineColumn) -> Result<ApplyOutput> {
  if spec.modifiers.repetitions == 0 {
    return Ok(ApplyOutput::noop(cursor));
  }
  let position = buffer.contents().clamp_position(cursor);

  let range = match spec.modifiers.structure {
    Structure::Char => {
      match spec.modifiers.direction {
        Direction::Forward => {
          char_range_from(
            buffer,
            position,
            spec.modifiers.repetitions,
            spec.line_end_behavior,
          )
        },
        Direction::Backward => {
          let mut begin = position;
          for _ in 0..spec.modifiers.repetitions {
            match buffer.contents().position_before(begin) {
              Some(previous) => begin = previous,
              None => break,
            }
          }
          Range::new(begin, position)
        },
      }
    },
    _ => buffer.find_partial_range(position, &spec.modifiers),
  };

  // Whole-line regions also consume their trailing newline.
  let range = match spec.modifiers.structure {
    Structure::Line | Structure::Page | Structure::Paragraph
      if spec.line_end_behavior == LineEndBehavior::DeleteTrailingNewline
        && !range.is_empty()
        && range.end.line + 1 < buffer.contents().len()
        && buffer
          .contents()
          .at(range.end.line)
          .map(|line| range.end.column >= line.len())
          .unwrap_or(false) =>
    {
      Range::new(range.begin, LineColumn::new(range.end.line + 1, 0))
    },
    _ => range,
  };

  if range.is_empty() {
    return Ok(ApplyOutput::noop(position));
  }

  let deleted = buffer.delete_range(range)?;
  let final_position = match spec.modifiers.direction {
    Direction::Forward => FinalPosition::Start,
    Direction::Backward => FinalPosition::End,
  };
  let inverse = Transformation::Stack(vec![
    Transformation::SetPosition(range.begin),
    Transformation::Insert(InsertSpec {
      content: deleted.snapshot(),
      position: None,
      mode: ModifyMode::Shift,
      repetitions: 1,
      final_position,
    }),
  ]);

  Ok(ApplyOutput {
    inverse,
    position: range.begin,
    made_progress: true,
    modified_buffer: true,
    deleted: spec.copy_to_paste.then_some(deleted),
  })
}

fn apply_tree_navigate(buffer: &mut Buffer, position: LineColumn) -> Result<ApplyOutput> {
  let root = buffer.parse_tree();
  let next_position = buffer
    .contents()
    .position_after(position)
    .unwrap_or(position);

  let mut tree: &crate::parse::ParseTree = &root;
  loop {
    let child = tree.children().iter().find(|child| {
      child.range().end > position && !child.children().is_empty()
    });
    let candidate = match child {
      None => break,
      Some(candidate) => candidate,
    };
    if tree.range().begin >= position
      && (tree.range().end != next_position || candidate.range().end != next_position)
    {
      break;
    }
    tree = candidate;
  }

  let last_position = buffer
    .contents()
    .position_before(tree.range().end)
    .unwrap_or(tree.range().end);
  let target = if position == last_position {
    tree.range().begin
  } else {
    last_position
  };

  Ok(ApplyOutput {
    inverse:         Transformation::SetPosition(position),
    position:        target,
    made_progress:   target != position,
    modified_buffer: false,
    deleted:         None,
  })
}

/// Cursor movement over the latched structure, expressed as a composite:
/// it resolves to a `SetPosition` computed from the structure's partial
/// range.
pub struct MoveCursor;

impl CompositeTransformation for MoveCursor {
  fn describe(&self) -> String {
    "MoveCursor".into()
  }

  fn apply(&self, input: &CompositeInput<'_>) -> CompositeOutput {
    let target = match (input.modifiers.structure, input.modifiers.direction) {
      (Structure::Line, direction) | (Structure::Page, direction) => {
        let lines = match input.modifiers.structure {
          Structure::Page => {
            input.modifiers.repetitions.saturating_mul(
              input.buffer.lines_per_page().max(1),
            )
          },
          _ => input.modifiers.repetitions,
        };
        let line = match direction {
          Direction::Forward => input.position.line.saturating_add(lines),
          Direction::Backward => input.position.line.saturating_sub(lines),
        };
        input
          .buffer
          .contents()
          .clamp_position(LineColumn::new(line, input.position.column))
      },
      (_, Direction::Forward) => input.range.end,
      (_, Direction::Backward) => input.range.begin,
    };
    CompositeOutput::set_position(target)
  }
}

/// Jump to the beginning or end of the current line.
pub struct MoveToLineBoundary {
  pub direction: Direction,
}

impl CompositeTransformation for MoveToLineBoundary {
  fn describe(&self) -> String {
    "MoveToLineBoundary".into()
  }

  fn apply(&self, input: &CompositeInput<'_>) -> CompositeOutput {
    let line_len = input
      .buffer
      .contents()
      .at(input.position.line)
      .map(|line| line.len())
      .unwrap_or(0);
    let column = match self.direction {
      Direction::Backward => 0,
      Direction::Forward => line_len,
    };
    CompositeOutput::set_position(input.position.with_column(column))
  }
}

/// Move to the next occurrence of `target` on the current line.
pub struct FindCharacter {
  pub target:    char,
  pub direction: Direction,
}

impl CompositeTransformation for FindCharacter {
  fn describe(&self) -> String {
    format!("FindCharacter({:?})", self.target)
  }

  fn apply(&self, input: &CompositeInput<'_>) -> CompositeOutput {
    let line = match input.buffer.contents().at(input.position.line) {
      Ok(line) => line,
      Err(_) => return CompositeOutput::new(),
    };
    let found = match self.direction {
      Direction::Forward => {
        line
          .contents()
          .find(input.position.column + 1, |ch| ch == self.target)
      },
      Direction::Backward => {
        line
          .contents()
          .rfind(input.position.column, |ch| ch == self.target)
      },
    };
    match found {
      None => CompositeOutput::new(),
      Some(column) => CompositeOutput::set_position(input.position.with_column(column)),
    }
  }
}
