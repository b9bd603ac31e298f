//! Literal search over buffer contents.
//!
//! Queries are single-line literals. The synchronous entry point walks a
//! contents snapshot; the background variant runs the same walk on the
//! evaluator, checking its cancellation notification at line granularity.

use rill_core::position::LineColumn;
use rill_event::{
  evaluator::AsyncEvaluator,
  future::Value,
  notification::Notification,
};

use crate::contents::Contents;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
  Forward,
  Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapBehavior {
  Wrap,
  NoWrap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
  pub positions: Vec<LineColumn>,
  pub cancelled: bool,
}

fn matches_in_line(haystack: &[char], needle: &[char]) -> Vec<usize> {
  if needle.is_empty() || haystack.len() < needle.len() {
    return Vec::new();
  }
  (0..=haystack.len() - needle.len())
    .filter(|start| haystack[*start..*start + needle.len()] == *needle)
    .collect()
}

fn all_matches(contents: &Contents, query: &str, cancel: Option<&Notification>) -> Option<Vec<LineColumn>> {
  let needle: Vec<char> = query.chars().collect();
  let mut positions = Vec::new();
  let mut cancelled = false;
  contents.every_line(|line_number, line| {
    if cancel.is_some_and(|notification| notification.has_been_notified()) {
      cancelled = true;
      return false;
    }
    let haystack: Vec<char> = line.contents().chars().collect();
    for column in matches_in_line(&haystack, &needle) {
      positions.push(LineColumn::new(line_number, column));
    }
    true
  });
  if cancelled { None } else { Some(positions) }
}

/// Match positions ordered by distance from `start` in the given
/// direction. Forward matches are strictly after `start`; wrapping
/// appends the remainder.
pub fn search(
  contents: &Contents,
  query: &str,
  start: LineColumn,
  direction: SearchDirection,
  wrap: WrapBehavior,
) -> Vec<LineColumn> {
  let all = match all_matches(contents, query, None) {
    Some(all) => all,
    None => return Vec::new(),
  };
  order_from(all, start, direction, wrap)
}

fn order_from(
  all: Vec<LineColumn>,
  start: LineColumn,
  direction: SearchDirection,
  wrap: WrapBehavior,
) -> Vec<LineColumn> {
  match direction {
    SearchDirection::Forward => {
      let (before, after): (Vec<_>, Vec<_>) =
        all.into_iter().partition(|position| *position <= start);
      let mut ordered = after;
      if wrap == WrapBehavior::Wrap {
        ordered.extend(before);
      }
      ordered
    },
    SearchDirection::Backward => {
      let (before, after): (Vec<_>, Vec<_>) =
        all.into_iter().partition(|position| *position < start);
      let mut ordered: Vec<_> = before.into_iter().rev().collect();
      if wrap == WrapBehavior::Wrap {
        ordered.extend(after.into_iter().rev());
      }
      ordered
    },
  }
}

/// Runs the search on the evaluator. A cancelled search still resolves,
/// with `cancelled = true` and whatever had been found discarded.
pub fn background_search(
  evaluator: &AsyncEvaluator,
  contents: Contents,
  query: String,
  start: LineColumn,
  direction: SearchDirection,
  cancel: Notification,
) -> Value<SearchResults> {
  evaluator.run(move || {
    match all_matches(&contents, &query, Some(&cancel)) {
      None => {
        SearchResults {
          positions: Vec::new(),
          cancelled: true,
        }
      },
      Some(all) => {
        SearchResults {
          positions: order_from(all, start, direction, WrapBehavior::Wrap),
          cancelled: false,
        }
      },
    }
  })
}
