//! Raw byte stream to keycode translation.
//!
//! The core consumes `i32` keycodes: printable characters as their
//! Unicode values, special keys as the reserved negative sentinels.
//! This decoder handles UTF-8 continuation bytes and the common CSI
//! escape sequences; an unfinished sequence survives across chunks.

use rill_lib::mode::keys;

#[derive(Default)]
pub struct KeyDecoder {
  pending: Vec<u8>,
}

impl KeyDecoder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Feeds one chunk; returns the completed keycodes.
  pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<i32> {
    self.pending.extend_from_slice(bytes);
    let mut codes = Vec::new();
    loop {
      match self.decode_one() {
        None => break,
        Some(code) => codes.push(code),
      }
    }
    codes
  }

  fn decode_one(&mut self) -> Option<i32> {
    let first = *self.pending.first()?;
    match first {
      0x1b => self.decode_escape(),
      0x7f | 0x08 => {
        self.pending.remove(0);
        Some(keys::BACKSPACE)
      },
      0x01 => self.control(keys::CTRL_A),
      0x04 => self.control(keys::CTRL_D),
      0x05 => self.control(keys::CTRL_E),
      0x0b => self.control(keys::CTRL_K),
      0x0c => self.control(keys::CTRL_L),
      0x15 => self.control(keys::CTRL_U),
      _ => self.decode_utf8(),
    }
  }

  fn control(&mut self, code: i32) -> Option<i32> {
    self.pending.remove(0);
    Some(code)
  }

  fn decode_escape(&mut self) -> Option<i32> {
    match self.pending.get(1) {
      // A bare escape: emit it; a sequence may still be in flight, but
      // waiting forever on a lone Escape key would be worse.
      None => {
        self.pending.remove(0);
        Some(keys::ESCAPE)
      },
      Some(b'[') => {
        let (code, consumed) = match self.pending.get(2)? {
          b'A' => (keys::UP, 3),
          b'B' => (keys::DOWN, 3),
          b'C' => (keys::RIGHT, 3),
          b'D' => (keys::LEFT, 3),
          b'5' => {
            if *self.pending.get(3)? != b'~' {
              self.pending.drain(..4);
              return Some(keys::ESCAPE);
            }
            (keys::PAGE_UP, 4)
          },
          b'6' => {
            if *self.pending.get(3)? != b'~' {
              self.pending.drain(..4);
              return Some(keys::ESCAPE);
            }
            (keys::PAGE_DOWN, 4)
          },
          _ => {
            self.pending.drain(..3);
            return Some(keys::ESCAPE);
          },
        };
        self.pending.drain(..consumed);
        Some(code)
      },
      Some(_) => {
        self.pending.remove(0);
        Some(keys::ESCAPE)
      },
    }
  }

  fn decode_utf8(&mut self) -> Option<i32> {
    let len = match self.pending[0] {
      byte if byte < 0x80 => 1,
      byte if byte >= 0xf0 => 4,
      byte if byte >= 0xe0 => 3,
      byte if byte >= 0xc0 => 2,
      _ => {
        // Stray continuation byte.
        self.pending.remove(0);
        return Some(0xfffd);
      },
    };
    if self.pending.len() < len {
      return None;
    }
    let bytes: Vec<u8> = self.pending.drain(..len).collect();
    match std::str::from_utf8(&bytes) {
      Ok(text) => text.chars().next().map(|ch| ch as i32),
      Err(_) => Some(0xfffd),
    }
  }
}
