//! The line-producer protocol consumed by the renderer collaborator.
//!
//! The core never emits control sequences: it produces styled lines plus
//! an optional cursor column, one row at a time. Producers compose the
//! way widgets do: horizontal splits stack rows, vertical splits join
//! columns.

use rill_core::{
  lazy_text::LazyText,
  position::LineColumn,
  style::StyleSet,
};

use crate::{
  contents::Contents,
  line::{
    Line,
    LineBuilder,
  },
  status::Status,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorBehavior {
  Show,
  Ignore,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
  pub width:                  usize,
  pub active_cursor_behavior: CursorBehavior,
}

/// A styled row plus, possibly, the active cursor's column within it.
#[derive(Debug, Clone)]
pub struct LineWithCursor {
  pub line:   Line,
  pub cursor: Option<usize>,
}

impl LineWithCursor {
  fn blank() -> Self {
    Self {
      line:   Line::default(),
      cursor: None,
    }
  }
}

/// Pads or trims `line` to exactly `width` cells, using the line's
/// end-of-line styles for the padding.
fn fit_to_width(line: &Line, width: usize) -> Line {
  let mut builder = LineBuilder::new();
  let take = line.len().min(width);
  for column in 0..take {
    if let Some(ch) = line.get(column) {
      builder.append_char(ch, line.style_at(column));
    }
  }
  if take < width {
    builder.append_text(
      LazyText::padding(' ', width - take),
      line.end_of_line_styles(),
    );
  }
  builder.set_end_of_line_styles(line.end_of_line_styles());
  builder.build()
}

pub enum OutputProducer {
  Buffer(BufferProducer),
  Horizontal(HorizontalProducer),
  Vertical(VerticalProducer),
  StatusRow(StatusProducer),
  Blank,
}

impl OutputProducer {
  /// The next row. Total: producers yield blank rows once exhausted.
  pub fn next_line(&mut self, options: &OutputOptions) -> LineWithCursor {
    match self {
      OutputProducer::Buffer(producer) => producer.next_line(options),
      OutputProducer::Horizontal(producer) => producer.next_line(options),
      OutputProducer::Vertical(producer) => producer.next_line(options),
      OutputProducer::StatusRow(producer) => producer.next_line(options),
      OutputProducer::Blank => {
        let mut row = LineWithCursor::blank();
        row.line = fit_to_width(&Line::default(), options.width);
        row
      },
    }
  }
}

/// Rows of one buffer, starting at `view_start`.
pub struct BufferProducer {
  contents: Contents,
  cursor:   Option<LineColumn>,
  next_row: usize,
}

impl BufferProducer {
  pub fn new(contents: Contents, cursor: Option<LineColumn>, view_start: usize) -> Self {
    Self {
      contents,
      cursor,
      next_row: view_start,
    }
  }

  fn next_line(&mut self, options: &OutputOptions) -> LineWithCursor {
    let line_number = self.next_row;
    self.next_row += 1;
    let line = match self.contents.at(line_number) {
      Ok(line) => line,
      Err(_) => return LineWithCursor::blank(),
    };
    let cursor = match (options.active_cursor_behavior, self.cursor) {
      (CursorBehavior::Show, Some(position)) if position.line == line_number => {
        Some(position.column.min(options.width.saturating_sub(1)))
      },
      _ => None,
    };
    LineWithCursor {
      line: fit_to_width(&line, options.width),
      cursor,
    }
  }
}

/// Stacks children: each child produces a fixed number of rows.
pub struct HorizontalProducer {
  children: Vec<(OutputProducer, usize)>,
}

impl HorizontalProducer {
  pub fn new(children: Vec<(OutputProducer, usize)>) -> Self {
    Self { children }
  }

  fn next_line(&mut self, options: &OutputOptions) -> LineWithCursor {
    loop {
      let Some(front) = self.children.first_mut() else {
        return LineWithCursor::blank();
      };
      if front.1 == 0 {
        self.children.remove(0);
        continue;
      }
      front.1 -= 1;
      return front.0.next_line(options);
    }
  }
}

/// Joins columns: one row pulls a slice from every child. Only the active
/// child's cursor survives, offset by the widths before it.
pub struct VerticalProducer {
  columns: Vec<(OutputProducer, usize)>,
  active:  usize,
}

impl VerticalProducer {
  pub fn new(columns: Vec<(OutputProducer, usize)>, active: usize) -> Self {
    Self { columns, active }
  }

  fn next_line(&mut self, options: &OutputOptions) -> LineWithCursor {
    let mut builder = LineBuilder::new();
    let mut cursor = None;
    let mut offset = 0;
    for (index, (producer, width)) in self.columns.iter_mut().enumerate() {
      let child_options = OutputOptions {
        width: *width,
        active_cursor_behavior: if index == self.active {
          options.active_cursor_behavior
        } else {
          CursorBehavior::Ignore
        },
      };
      let row = producer.next_line(&child_options);
      if index == self.active {
        cursor = row.cursor.map(|column| offset + column);
      }
      for column in 0..*width {
        match row.line.get(column) {
          Some(ch) => builder.append_char(ch, row.line.style_at(column)),
          None => builder.append_char(' ', row.line.end_of_line_styles()),
        };
      }
      offset += *width;
    }
    LineWithCursor {
      line: builder.build(),
      cursor,
    }
  }
}

/// One status row, then blanks.
pub struct StatusProducer {
  text:    Option<String>,
  styles:  StyleSet,
}

impl StatusProducer {
  pub fn new(status: &Status, styles: StyleSet) -> Self {
    Self {
      text: Some(status.text().to_string()),
      styles,
    }
  }

  fn next_line(&mut self, options: &OutputOptions) -> LineWithCursor {
    match self.text.take() {
      None => LineWithCursor::blank(),
      Some(text) => {
        let mut builder = LineBuilder::new();
        builder.append_text(LazyText::from(text.as_str()), self.styles);
        LineWithCursor {
          line:   fit_to_width(&builder.build(), options.width),
          cursor: None,
        }
      },
    }
  }
}
