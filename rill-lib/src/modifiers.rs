//! Latched attributes shaping the next command.
//!
//! Direction, repetition count, structure, strength and insertion mode
//! accumulate while the user types a command. Soft state resets after each
//! command (and on `Escape`); sticky state (default direction, default
//! insertion, a sticky structure) survives until reset hard.

use crate::structure::Structure;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  #[default]
  Forward,
  Backward,
}

impl Direction {
  #[must_use]
  pub const fn reverse(self) -> Self {
    match self {
      Self::Forward => Self::Backward,
      Self::Backward => Self::Forward,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
  #[default]
  Normal,
  Strong,
  /// Shrinks the effective region to word characters; on a line with none,
  /// the region is empty.
  VeryWeak,
}

/// What happens to characters near the cursor when a modification lands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModifyMode {
  /// Characters move: insertions push them right, deletions consume them.
  #[default]
  Shift,
  /// Characters never move: insertions overwrite, deletions blank.
  Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
  pub structure:         Structure,
  pub sticky_structure:  bool,
  pub direction:         Direction,
  pub default_direction: Direction,
  pub repetitions:       usize,
  pub strength:          Strength,
  pub insertion:         ModifyMode,
  pub default_insertion: ModifyMode,
}

impl Default for Modifiers {
  fn default() -> Self {
    Self {
      structure:         Structure::Char,
      sticky_structure:  false,
      direction:         Direction::Forward,
      default_direction: Direction::Forward,
      repetitions:       1,
      strength:          Strength::Normal,
      insertion:         ModifyMode::Shift,
      default_insertion: ModifyMode::Shift,
    }
  }
}

impl Modifiers {
  /// Clears per-command state; sticky attributes survive.
  pub fn reset_soft(&mut self) {
    self.repetitions = 1;
    self.direction = self.default_direction;
    self.insertion = self.default_insertion;
    self.strength = Strength::Normal;
    if !self.sticky_structure {
      self.structure = Structure::Char;
    }
  }

  /// Back to defaults, stickiness included.
  pub fn reset_hard(&mut self) {
    self.structure = Structure::Char;
    self.sticky_structure = false;
    self.default_direction = Direction::Forward;
    self.default_insertion = ModifyMode::Shift;
    self.reset_soft();
  }

  pub fn with_structure(mut self, structure: Structure) -> Self {
    self.structure = structure;
    self
  }

  pub fn with_direction(mut self, direction: Direction) -> Self {
    self.direction = direction;
    self
  }

  pub fn with_repetitions(mut self, repetitions: usize) -> Self {
    self.repetitions = repetitions;
    self
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn soft_reset_keeps_sticky_structure() {
    let mut modifiers = Modifiers::default();
    modifiers.structure = Structure::Word;
    modifiers.sticky_structure = true;
    modifiers.repetitions = 9;
    modifiers.direction = Direction::Backward;

    modifiers.reset_soft();
    assert_eq!(modifiers.structure, Structure::Word);
    assert_eq!(modifiers.repetitions, 1);
    assert_eq!(modifiers.direction, Direction::Forward);
  }

  #[test]
  fn soft_reset_restores_defaults() {
    let mut modifiers = Modifiers::default();
    modifiers.default_direction = Direction::Backward;
    modifiers.direction = Direction::Forward;
    modifiers.reset_soft();
    assert_eq!(modifiers.direction, Direction::Backward);
  }

  #[test]
  fn hard_reset_clears_everything() {
    let mut modifiers = Modifiers::default();
    modifiers.structure = Structure::Line;
    modifiers.sticky_structure = true;
    modifiers.default_direction = Direction::Backward;

    modifiers.reset_hard();
    assert_eq!(modifiers, Modifiers::default());
  }
}
