//! Named cursor sets and the position-remapping algebra.
//!
//! Every content mutation describes the implied cursor movement as a
//! [`CursorTransformation`]; applying one to a [`CursorsSet`] keeps every
//! cursor consistent with the edit. The algebra obeys the composition law
//! checked in the tests here: adjusting through `M₁` then `M₂` equals
//! adjusting through `compose(M₁, M₂)`.

use std::collections::BTreeMap;

use rill_core::position::LineColumn;
use smallvec::SmallVec;

/// How an edit remaps positions.
///
/// `Shift` affects every position at or after `from`: the line moves by
/// `lines`, and positions on `from`'s own line additionally move by
/// `columns`. An intra-line leftward shift (`lines == 0`, `columns < 0`)
/// clamps at `from.column`, which is what collapses positions inside a
/// deleted span onto its start.
///
/// `EraseLines` snaps positions on `[first, last)` to line `first` and
/// shifts later lines up by `last - first`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorTransformation {
  Shift {
    from:    LineColumn,
    lines:   isize,
    columns: isize,
  },
  EraseLines {
    first: usize,
    last:  usize,
  },
  Compose(Vec<CursorTransformation>),
}

impl CursorTransformation {
  pub fn identity() -> Self {
    Self::Compose(Vec::new())
  }

  pub fn is_identity(&self) -> bool {
    match self {
      Self::Compose(steps) => steps.iter().all(Self::is_identity),
      Self::Shift { lines, columns, .. } => *lines == 0 && *columns == 0,
      Self::EraseLines { first, last } => first == last,
    }
  }

  pub fn compose(first: Self, second: Self) -> Self {
    match (first, second) {
      (Self::Compose(mut a), Self::Compose(b)) => {
        a.extend(b);
        Self::Compose(a)
      },
      (Self::Compose(mut a), b) => {
        a.push(b);
        Self::Compose(a)
      },
      (a, Self::Compose(b)) => {
        let mut steps = vec![a];
        steps.extend(b);
        Self::Compose(steps)
      },
      (a, b) => Self::Compose(vec![a, b]),
    }
  }

  /// Remaps one position. Total: any input yields a valid output.
  pub fn adjust(&self, position: LineColumn) -> LineColumn {
    match self {
      Self::Shift {
        from,
        lines,
        columns,
      } => {
        if position < *from {
          return position;
        }
        let line = position.line.saturating_add_signed(*lines);
        let column = if position.line == from.line {
          let floor = if *lines == 0 && *columns < 0 {
            from.column
          } else {
            0
          };
          position
            .column
            .saturating_add_signed(*columns)
            .max(floor)
        } else {
          position.column
        };
        LineColumn::new(line, column)
      },
      Self::EraseLines { first, last } => {
        if position.line >= *last {
          LineColumn::new(position.line - (last - first), position.column)
        } else if position.line >= *first {
          LineColumn::new(*first, position.column)
        } else {
          position
        }
      },
      Self::Compose(steps) => {
        steps
          .iter()
          .fold(position, |position, step| step.adjust(position))
      },
    }
  }
}

/// An ordered multiset of positions with one distinguished active cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorsSet {
  positions: BTreeMap<LineColumn, usize>,
  active:    LineColumn,
}

impl CursorsSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn singleton(position: LineColumn) -> Self {
    let mut set = Self::new();
    set.insert(position);
    set.active = position;
    set
  }

  pub fn len(&self) -> usize {
    self.positions.values().sum()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn active(&self) -> LineColumn {
    self.active
  }

  pub fn contains(&self, position: LineColumn) -> bool {
    self.positions.contains_key(&position)
  }

  pub fn insert(&mut self, position: LineColumn) {
    *self.positions.entry(position).or_insert(0) += 1;
    if self.len() == 1 {
      self.active = position;
    }
  }

  pub fn remove(&mut self, position: LineColumn) -> bool {
    match self.positions.get_mut(&position) {
      None => false,
      Some(count) => {
        *count -= 1;
        if *count == 0 {
          self.positions.remove(&position);
        }
        if self.active == position && !self.contains(position) {
          self.active = self.first().unwrap_or_default();
        }
        true
      },
    }
  }

  /// Moves the active cursor to `position`, leaving the others in place.
  pub fn move_active(&mut self, position: LineColumn) {
    if !self.is_empty() {
      let active = self.active;
      self.remove(active);
    }
    self.insert(position);
    self.active = position;
  }

  /// Makes `position` the active cursor, inserting it if absent.
  pub fn set_active(&mut self, position: LineColumn) {
    if !self.contains(position) {
      self.insert(position);
    }
    self.active = position;
  }

  /// Replaces the whole set. The first position becomes active.
  pub fn assign(&mut self, positions: impl IntoIterator<Item = LineColumn>) {
    self.positions.clear();
    let mut first = None;
    for position in positions {
      if first.is_none() {
        first = Some(position);
      }
      *self.positions.entry(position).or_insert(0) += 1;
    }
    self.active = first.unwrap_or_default();
  }

  pub fn first(&self) -> Option<LineColumn> {
    self.positions.keys().next().copied()
  }

  /// The smallest cursor strictly greater than `position`.
  pub fn next_after(&self, position: LineColumn) -> Option<LineColumn> {
    self
      .positions
      .range((
        std::ops::Bound::Excluded(position),
        std::ops::Bound::Unbounded,
      ))
      .next()
      .map(|(position, _)| *position)
  }

  pub fn iter(&self) -> impl Iterator<Item = LineColumn> + '_ {
    self
      .positions
      .iter()
      .flat_map(|(position, count)| std::iter::repeat(*position).take(*count))
  }

  /// Remaps every cursor; active-cursor identity follows its position.
  pub fn apply(&mut self, transformation: &CursorTransformation) {
    if transformation.is_identity() {
      return;
    }
    let mut remapped: BTreeMap<LineColumn, usize> = BTreeMap::new();
    for (position, count) in &self.positions {
      *remapped
        .entry(transformation.adjust(*position))
        .or_insert(0) += count;
    }
    self.positions = remapped;
    self.active = transformation.adjust(self.active);
  }
}

/// Reserved name of the set driving user commands.
pub const ACTIVE_CURSORS: &str = "active";
/// Reserved name of the set tracking the paste buffer insertion point.
pub const PASTE_CURSORS: &str = "paste";
/// Reserved name of the set holding user marks.
pub const MARK_CURSORS: &str = "marks";

type AdjustCallback = Box<dyn Fn(&CursorTransformation) + Send>;

/// Holds every named cursor set of a buffer and fans content deltas out to
/// them in mutation order.
#[derive(Default)]
pub struct CursorsTracker {
  sets:      BTreeMap<String, CursorsSet>,
  saved:     Vec<CursorsSet>,
  callbacks: SmallVec<[AdjustCallback; 1]>,
}

impl CursorsTracker {
  pub fn new() -> Self {
    let mut tracker = Self::default();
    tracker.sets.insert(ACTIVE_CURSORS.into(), CursorsSet::new());
    tracker
  }

  pub fn set(&self, name: &str) -> Option<&CursorsSet> {
    self.sets.get(name)
  }

  pub fn set_mut(&mut self, name: &str) -> &mut CursorsSet {
    self.sets.entry(name.into()).or_default()
  }

  pub fn active_set(&self) -> &CursorsSet {
    self
      .sets
      .get(ACTIVE_CURSORS)
      .expect("active cursor set always exists")
  }

  pub fn active_set_mut(&mut self) -> &mut CursorsSet {
    self.set_mut(ACTIVE_CURSORS)
  }

  pub fn active_cursor(&self) -> LineColumn {
    self.active_set().active()
  }

  pub fn set_active_cursors(&mut self, positions: Vec<LineColumn>) {
    self.active_set_mut().assign(positions);
  }

  /// Saves a copy of the active set on a stack.
  pub fn push_active(&mut self) {
    let copy = self.active_set().clone();
    self.saved.push(copy);
  }

  /// Restores the most recently pushed active set, if any.
  pub fn pop_active(&mut self) -> bool {
    match self.saved.pop() {
      None => false,
      Some(set) => {
        *self.active_set_mut() = set;
        true
      },
    }
  }

  /// Subscribes to every delta applied through the tracker. Callbacks for
  /// one mutation run before any callback for the next.
  pub fn add_adjust_callback(&mut self, callback: impl Fn(&CursorTransformation) + Send + 'static) {
    self.callbacks.push(Box::new(callback));
  }

  pub fn apply(&mut self, transformation: &CursorTransformation) {
    for set in self.sets.values_mut() {
      set.apply(transformation);
    }
    for set in &mut self.saved {
      set.apply(transformation);
    }
    for callback in &self.callbacks {
      callback(transformation);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn shift(from: (usize, usize), lines: isize, columns: isize) -> CursorTransformation {
    CursorTransformation::Shift {
      from: from.into(),
      lines,
      columns,
    }
  }

  #[test]
  fn shift_only_moves_positions_at_or_after_from() {
    let delta = shift((2, 3), 1, -3);
    assert_eq!(delta.adjust((1, 9).into()), (1, 9).into());
    assert_eq!(delta.adjust((2, 2).into()), (2, 2).into());
    assert_eq!(delta.adjust((2, 5).into()), (3, 2).into());
    assert_eq!(delta.adjust((4, 1).into()), (5, 1).into());
  }

  #[test]
  fn intra_line_delete_clamps_at_from_column() {
    // Deleting 3 chars at column 2: [2, 5) collapses to 2, later shift.
    let delta = shift((0, 2), 0, -3);
    assert_eq!(delta.adjust((0, 2).into()), (0, 2).into());
    assert_eq!(delta.adjust((0, 4).into()), (0, 2).into());
    assert_eq!(delta.adjust((0, 7).into()), (0, 4).into());
  }

  #[test]
  fn erase_lines_snaps_and_shifts() {
    let delta = CursorTransformation::EraseLines { first: 1, last: 3 };
    assert_eq!(delta.adjust((0, 5).into()), (0, 5).into());
    assert_eq!(delta.adjust((1, 5).into()), (1, 5).into());
    assert_eq!(delta.adjust((2, 4).into()), (1, 4).into());
    assert_eq!(delta.adjust((3, 4).into()), (1, 4).into());
    assert_eq!(delta.adjust((7, 0).into()), (5, 0).into());
  }

  #[test]
  fn composition_law_holds() {
    let m1 = shift((0, 2), 0, -2);
    let m2 = CursorTransformation::EraseLines { first: 0, last: 1 };
    let composed = CursorTransformation::compose(m1.clone(), m2.clone());
    for position in [(0, 0), (0, 3), (0, 9), (1, 4), (5, 5)] {
      let position = LineColumn::from(position);
      assert_eq!(
        m2.adjust(m1.adjust(position)),
        composed.adjust(position),
        "at {position}"
      );
    }
  }

  #[test]
  fn multiset_keeps_duplicates() {
    let mut set = CursorsSet::new();
    set.insert((0, 1).into());
    set.insert((0, 1).into());
    set.insert((2, 0).into());
    assert_eq!(set.len(), 3);
    assert!(set.remove((0, 1).into()));
    assert_eq!(set.len(), 2);
    assert!(set.contains((0, 1).into()));
  }

  #[test]
  fn active_identity_follows_adjustment() {
    let mut set = CursorsSet::new();
    set.insert((0, 0).into());
    set.set_active((0, 4).into());
    set.apply(&shift((0, 2), 0, 3));
    assert_eq!(set.active(), (0, 7).into());
    assert!(set.contains((0, 0).into()));
  }

  #[test]
  fn tracker_notifies_in_mutation_order() {
    use std::sync::{
      Arc,
      Mutex,
    };

    let mut tracker = CursorsTracker::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let observed = log.clone();
    tracker.add_adjust_callback(move |delta| {
      observed.lock().unwrap().push(delta.clone());
    });

    let first = shift((0, 0), 1, 0);
    let second = CursorTransformation::EraseLines { first: 0, last: 2 };
    tracker.apply(&first);
    tracker.apply(&second);

    let log = log.lock().unwrap();
    assert_eq!(log.as_slice(), &[first, second]);
  }

  #[test]
  fn push_and_pop_active_round_trips() {
    let mut tracker = CursorsTracker::new();
    tracker.set_active_cursors(vec![(3, 3).into()]);
    tracker.push_active();
    tracker.set_active_cursors(vec![(0, 0).into()]);
    assert!(tracker.pop_active());
    assert_eq!(tracker.active_cursor(), (3, 3).into());
    assert!(!tracker.pop_active());
  }
}
