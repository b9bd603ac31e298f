//! One-line status shown for a buffer or the whole editor.
//!
//! Every non-fatal error lands here as a warning; the buffer stays usable.

use std::collections::VecDeque;

const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
  Information,
  Warning,
}

#[derive(Debug, Default, Clone)]
pub struct Status {
  text:    String,
  level:   Option<StatusLevel>,
  history: VecDeque<(StatusLevel, String)>,
}

impl Status {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn level(&self) -> Option<StatusLevel> {
    self.level
  }

  pub fn set_information(&mut self, text: impl Into<String>) {
    self.publish(StatusLevel::Information, text.into());
  }

  pub fn set_warning(&mut self, text: impl Into<String>) {
    let text = text.into();
    tracing::warn!(status = %text);
    self.publish(StatusLevel::Warning, text);
  }

  fn publish(&mut self, level: StatusLevel, text: String) {
    self.text = text.clone();
    self.level = Some(level);
    self.history.push_back((level, text));
    while self.history.len() > HISTORY_LIMIT {
      self.history.pop_front();
    }
  }

  pub fn clear(&mut self) {
    self.text.clear();
    self.level = None;
  }

  pub fn history(&self) -> impl Iterator<Item = &(StatusLevel, String)> {
    self.history.iter()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn warning_replaces_information() {
    let mut status = Status::new();
    status.set_information("loaded");
    assert_eq!(status.level(), Some(StatusLevel::Information));
    status.set_warning("fd read failed");
    assert_eq!(status.level(), Some(StatusLevel::Warning));
    assert_eq!(status.text(), "fd read failed");
    assert_eq!(status.history().count(), 2);
  }

  #[test]
  fn clear_resets_the_line() {
    let mut status = Status::new();
    status.set_information("x");
    status.clear();
    assert_eq!(status.text(), "");
    assert_eq!(status.level(), None);
  }
}
