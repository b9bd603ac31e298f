//! Command granularity: the closed set of structures.
//!
//! Every structure defines a total `find_partial_range`: given a position
//! and the latched modifiers, it yields the half-open region the next
//! command operates on. An empty range at the position is a valid answer.

use rill_core::{
  chars::WordChars,
  position::{
    LineColumn,
    Range,
  },
};

use crate::{
  contents::Contents,
  cursors::CursorsTracker,
  modifiers::{
    Direction,
    Modifiers,
  },
  parse::{
    ParseTree,
    tree::route_to_position,
  },
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
  #[default]
  Char,
  Word,
  Line,
  Page,
  Search,
  Mark,
  Cursor,
  Tree,
  Buffer,
  Symbol,
  Paragraph,
}

/// Everything a structure may consult. Built by the buffer.
pub struct StructureContext<'a> {
  pub contents:          &'a Contents,
  pub word_chars:        WordChars,
  pub symbol_chars:      WordChars,
  pub lines_per_page:    usize,
  pub last_search_query: Option<&'a str>,
  pub cursors:           &'a CursorsTracker,
  pub parse_tree:        Option<&'a ParseTree>,
}

impl Structure {
  /// The region the next command operates on. Total: always returns a
  /// valid (possibly empty) range.
  pub fn find_partial_range(
    &self,
    context: &StructureContext<'_>,
    position: LineColumn,
    modifiers: &Modifiers,
  ) -> Range {
    let contents = context.contents;
    let position = contents.clamp_position(position);
    match self {
      Structure::Char => char_range(contents, position, modifiers),
      Structure::Word => {
        run_range(contents, position, modifiers, &|ch| {
          context.word_chars.contains(ch)
        })
      },
      Structure::Symbol => {
        run_range(contents, position, modifiers, &|ch| {
          context.symbol_chars.contains(ch)
        })
      },
      Structure::Line => line_range(contents, position, modifiers, 1),
      Structure::Page => {
        line_range(contents, position, modifiers, context.lines_per_page.max(1))
      },
      Structure::Search => search_range(context, position, modifiers),
      Structure::Mark => set_range(context, crate::cursors::MARK_CURSORS, position),
      Structure::Cursor => set_range(context, crate::cursors::ACTIVE_CURSORS, position),
      Structure::Tree => tree_range(context, position),
      Structure::Buffer => contents.range(),
      Structure::Paragraph => paragraph_range(contents, position, modifiers),
    }
  }
}

fn char_range(contents: &Contents, position: LineColumn, modifiers: &Modifiers) -> Range {
  let mut cursor = position;
  match modifiers.direction {
    Direction::Forward => {
      for _ in 0..modifiers.repetitions {
        match contents.position_after(cursor) {
          Some(next) => cursor = next,
          None => break,
        }
      }
      Range::new(position, cursor)
    },
    Direction::Backward => {
      for _ in 0..modifiers.repetitions {
        match contents.position_before(cursor) {
          Some(previous) => cursor = previous,
          None => break,
        }
      }
      Range::new(cursor, position)
    },
  }
}

/// Word- and symbol-style ranges: consume `repetitions` runs of matching
/// characters in the modifier's direction, seeking first when the position
/// is not on one. `VeryWeak` strength on a region with no matching
/// characters yields an empty range.
fn run_range(
  contents: &Contents,
  position: LineColumn,
  modifiers: &Modifiers,
  matches: &dyn Fn(char) -> bool,
) -> Range {
  let char_at = |position: LineColumn| -> Option<char> {
    contents.character_at(position).ok().flatten()
  };
  let is_match =
    |position: LineColumn| -> bool { char_at(position).map(matches).unwrap_or(false) };

  match modifiers.direction {
    Direction::Forward => {
      let mut begin = position;
      // Seek to the next matching character.
      loop {
        if is_match(begin) {
          break;
        }
        match contents.position_after(begin) {
          Some(next) => begin = next,
          // No matching characters ahead; VeryWeak and friends all get
          // the empty region.
          None => return Range::point(position),
        }
      }
      let mut end = begin;
      for repetition in 0..modifiers.repetitions {
        if repetition > 0 {
          // Skip the separator run.
          loop {
            if is_match(end) {
              break;
            }
            match contents.position_after(end) {
              Some(next) => end = next,
              None => return Range::new(begin, end),
            }
          }
        }
        while is_match(end) {
          match contents.position_after(end) {
            Some(next) => end = next,
            None => break,
          }
        }
      }
      Range::new(begin, end)
    },
    Direction::Backward => {
      let mut end = position;
      loop {
        let before = match contents.position_before(end) {
          Some(before) => before,
          None => return Range::point(position),
        };
        if is_match(before) {
          break;
        }
        end = before;
      }
      let mut begin = end;
      for repetition in 0..modifiers.repetitions {
        if repetition > 0 {
          loop {
            let before = match contents.position_before(begin) {
              Some(before) => before,
              None => return Range::new(begin, end),
            };
            if is_match(before) {
              break;
            }
            begin = before;
          }
        }
        while let Some(before) = contents.position_before(begin) {
          if !is_match(before) {
            break;
          }
          begin = before;
        }
      }
      Range::new(begin, end)
    },
  }
}

fn line_range(
  contents: &Contents,
  position: LineColumn,
  modifiers: &Modifiers,
  lines_per_step: usize,
) -> Range {
  let span = modifiers.repetitions.saturating_mul(lines_per_step).max(1);
  match modifiers.direction {
    Direction::Forward => {
      let last = (position.line + span - 1).min(contents.end_line());
      let end_column = contents.at(last).map(|line| line.len()).unwrap_or(0);
      Range::new(
        LineColumn::new(position.line, 0),
        LineColumn::new(last, end_column),
      )
    },
    Direction::Backward => {
      let first = position.line.saturating_sub(span - 1);
      let end_column = contents
        .at(position.line)
        .map(|line| line.len())
        .unwrap_or(0);
      Range::new(
        LineColumn::new(first, 0),
        LineColumn::new(position.line, end_column),
      )
    },
  }
}

fn search_range(
  context: &StructureContext<'_>,
  position: LineColumn,
  modifiers: &Modifiers,
) -> Range {
  let query = match context.last_search_query {
    Some(query) if !query.is_empty() => query,
    _ => return Range::point(position),
  };
  let matches = crate::search::search(
    context.contents,
    query,
    position,
    match modifiers.direction {
      Direction::Forward => crate::search::SearchDirection::Forward,
      Direction::Backward => crate::search::SearchDirection::Backward,
    },
    crate::search::WrapBehavior::NoWrap,
  );
  match matches.first() {
    None => Range::point(position),
    Some(found) if *found >= position => Range::new(position, *found),
    Some(found) => Range::new(*found, position),
  }
}

fn set_range(context: &StructureContext<'_>, set_name: &str, position: LineColumn) -> Range {
  let set = match context.cursors.set(set_name) {
    Some(set) => set,
    None => return Range::point(position),
  };
  match set.next_after(position) {
    Some(next) => Range::new(position, next),
    None => Range::point(position),
  }
}

fn tree_range(context: &StructureContext<'_>, position: LineColumn) -> Range {
  let root = match context.parse_tree {
    Some(root) => root,
    None => return Range::point(position),
  };
  let route = route_to_position(root, position);
  let node = crate::parse::tree::follow_route(root, &route);
  node.range()
}

fn paragraph_range(contents: &Contents, position: LineColumn, modifiers: &Modifiers) -> Range {
  let is_blank = |line: usize| -> bool {
    contents
      .at(line)
      .map(|line| line.is_empty())
      .unwrap_or(true)
  };

  let mut first = position.line;
  while first > 0 && !is_blank(first - 1) {
    first -= 1;
  }
  let mut last = position.line;
  let mut paragraphs = modifiers.repetitions.max(1);
  loop {
    while last < contents.end_line() && !is_blank(last + 1) {
      last += 1;
    }
    paragraphs -= 1;
    if paragraphs == 0 {
      break;
    }
    // Skip the blank separator to the next paragraph.
    let mut next = last + 1;
    while next <= contents.end_line() && is_blank(next) {
      next += 1;
    }
    if next > contents.end_line() {
      break;
    }
    last = next;
  }
  let end_column = contents.at(last).map(|line| line.len()).unwrap_or(0);
  Range::new(
    LineColumn::new(first, 0),
    LineColumn::new(last, end_column),
  )
}
