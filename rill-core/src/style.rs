//! Terminal-agnostic text styles.
//!
//! A [`StyleSet`] is a copyable bit-set of [`Style`] values attached to a
//! run of characters. There is deliberately no "reset" member: the absence
//! of styles is the empty set.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Style {
  Bold,
  Italic,
  Dim,
  Underline,
  Reverse,
  Black,
  Red,
  Green,
  Yellow,
  Blue,
  Magenta,
  Cyan,
  White,
  BgRed,
}

impl Style {
  pub const ALL: [Style; 14] = [
    Style::Bold,
    Style::Italic,
    Style::Dim,
    Style::Underline,
    Style::Reverse,
    Style::Black,
    Style::Red,
    Style::Green,
    Style::Yellow,
    Style::Blue,
    Style::Magenta,
    Style::Cyan,
    Style::White,
    Style::BgRed,
  ];

  const fn bit(self) -> u16 {
    1 << (self as u16)
  }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleSet(u16);

impl StyleSet {
  pub const fn empty() -> Self {
    Self(0)
  }

  pub const fn of(style: Style) -> Self {
    Self(style.bit())
  }

  pub const fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub const fn contains(&self, style: Style) -> bool {
    self.0 & style.bit() != 0
  }

  pub fn insert(&mut self, style: Style) {
    self.0 |= style.bit();
  }

  #[must_use]
  pub const fn with(self, style: Style) -> Self {
    Self(self.0 | style.bit())
  }

  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  pub fn iter(&self) -> impl Iterator<Item = Style> + '_ {
    Style::ALL.into_iter().filter(|style| self.contains(*style))
  }

  pub fn len(&self) -> usize {
    self.0.count_ones() as usize
  }
}

impl FromIterator<Style> for StyleSet {
  fn from_iter<I: IntoIterator<Item = Style>>(iter: I) -> Self {
    let mut set = Self::empty();
    for style in iter {
      set.insert(style);
    }
    set
  }
}

impl From<Style> for StyleSet {
  fn from(style: Style) -> Self {
    Self::of(style)
  }
}

impl fmt::Debug for StyleSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}
