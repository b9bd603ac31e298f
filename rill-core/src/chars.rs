//! Character classification used by word motions and structural edits.

#[derive(Debug, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if c.is_whitespace() => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch == '_' || ch.is_alphanumeric()
}

#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  ch.is_whitespace()
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  matches!(ch, '!'..='/' | ':'..='@' | '['..='`' | '{'..='~')
}

/// A configurable set of word characters, supplied per buffer through the
/// `word_characters` variable.
#[derive(Debug, Clone)]
pub struct WordChars {
  extra: Box<str>,
}

impl Default for WordChars {
  fn default() -> Self {
    Self { extra: "_".into() }
  }
}

impl WordChars {
  pub fn new(extra: impl Into<Box<str>>) -> Self {
    Self {
      extra: extra.into(),
    }
  }

  /// Whether `ch` counts as part of a word under this configuration.
  #[inline]
  pub fn contains(&self, ch: char) -> bool {
    ch.is_alphanumeric() || self.extra.contains(ch)
  }

  pub fn as_str(&self) -> &str {
    &self.extra
  }
}
