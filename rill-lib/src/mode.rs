//! Modal input: keycodes in, transformations out.
//!
//! Input arrives as raw `i32` keycodes; printable characters are their
//! Unicode values and special keys use the reserved negative sentinels in
//! [`keys`]. A mode digests keys one at a time, latching modifiers
//! (counts, structures, directions) until a command key resolves them
//! into a [`Transformation`] or an editor-level request.

use std::{
  collections::HashMap,
  sync::Arc,
};

use crate::{
  modifiers::{
    Direction,
    Modifiers,
  },
  structure::Structure,
  transformation::{
    DeleteSpec,
    FindCharacter,
    LineEndBehavior,
    MoveCursor,
    MoveToLineBoundary,
    Transformation,
  },
};

/// Reserved negative keycodes.
pub mod keys {
  pub const ESCAPE: i32 = -1;
  pub const BACKSPACE: i32 = -2;
  pub const UP: i32 = -3;
  pub const DOWN: i32 = -4;
  pub const LEFT: i32 = -5;
  pub const RIGHT: i32 = -6;
  pub const PAGE_UP: i32 = -7;
  pub const PAGE_DOWN: i32 = -8;
  pub const CTRL_A: i32 = -9;
  pub const CTRL_D: i32 = -10;
  pub const CTRL_E: i32 = -11;
  pub const CTRL_K: i32 = -12;
  pub const CTRL_L: i32 = -13;
  pub const CTRL_U: i32 = -14;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
  Search,
  Command,
}

/// What a mode wants the editor to do with the key it just digested.
pub enum ModeOutcome {
  /// Consumed; waiting for more input.
  Pending,
  Transform(Transformation),
  Undo,
  Redo,
  /// Insert the paste buffer at the cursor.
  Paste,
  EnterInsertMode,
  EnterCommandMode,
  OpenPrompt(PromptKind),
  PromptAccepted { kind: PromptKind, text: String },
  PromptCancelled,
  /// Ask for async completion of the prompt's current text.
  RequestCompletion { kind: PromptKind, text: String },
  AdvanceWidget,
  SplitWidget { vertical: bool },
  CloseWidget,
  HardRedraw,
  Terminate(i32),
  Unhandled,
}

pub trait EditorMode: Send {
  fn name(&self) -> &'static str;
  fn process(&mut self, key: i32, modifiers: &mut Modifiers) -> ModeOutcome;

  /// Delivers async completion results; prompt modes use this.
  fn complete(&mut self, _suggestion: String) {}
}

/// Command-mode actions bindable to keys. Key maps are built explicitly
/// at startup and handed to the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  MoveBackward,
  MoveForward,
  MoveUp,
  MoveDown,
  MovePageUp,
  MovePageDown,
  LineStart,
  LineEnd,
  Delete,
  EnterInsert,
  Undo,
  Redo,
  Paste,
  ReverseDirection,
  SelectStructure,
  FindChar,
  SearchPrompt,
  CommandPrompt,
  SearchNext,
  TreeNavigate,
  AdvanceWidget,
  SplitWidgetHorizontal,
  SplitWidgetVertical,
  CloseWidget,
  HardRedraw,
  Quit,
}

#[derive(Debug, Clone, Default)]
pub struct CommandMap {
  bindings: HashMap<i32, CommandAction>,
}

impl CommandMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn bind(&mut self, key: i32, action: CommandAction) -> &mut Self {
    self.bindings.insert(key, action);
    self
  }

  pub fn lookup(&self, key: i32) -> Option<CommandAction> {
    self.bindings.get(&key).copied()
  }

  /// The stock command map.
  pub fn classic() -> Self {
    use CommandAction::*;
    let mut map = Self::new();
    map.bind('h' as i32, MoveBackward);
    map.bind('l' as i32, MoveForward);
    map.bind('k' as i32, MoveUp);
    map.bind('j' as i32, MoveDown);
    map.bind(keys::LEFT, MoveBackward);
    map.bind(keys::RIGHT, MoveForward);
    map.bind(keys::UP, MoveUp);
    map.bind(keys::DOWN, MoveDown);
    map.bind(keys::PAGE_UP, MovePageUp);
    map.bind(keys::PAGE_DOWN, MovePageDown);
    map.bind(keys::CTRL_A, LineStart);
    map.bind(keys::CTRL_E, LineEnd);
    map.bind('d' as i32, Delete);
    map.bind('i' as i32, EnterInsert);
    map.bind('u' as i32, Undo);
    map.bind('U' as i32, Redo);
    map.bind('p' as i32, Paste);
    map.bind('r' as i32, ReverseDirection);
    map.bind('s' as i32, SelectStructure);
    map.bind('f' as i32, FindChar);
    map.bind('/' as i32, SearchPrompt);
    map.bind(':' as i32, CommandPrompt);
    map.bind('n' as i32, SearchNext);
    map.bind(']' as i32, TreeNavigate);
    map.bind('o' as i32, AdvanceWidget);
    map.bind(keys::CTRL_D, SplitWidgetHorizontal);
    map.bind(keys::CTRL_K, CloseWidget);
    map.bind(keys::CTRL_L, HardRedraw);
    map.bind('q' as i32, Quit);
    map
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Latch {
  Default,
  AwaitingStructure,
  AwaitingNumber(String),
  AwaitingChar(Direction),
}

/// The main modal state machine.
pub struct CommandMode {
  map:   CommandMap,
  latch: Latch,
}

impl CommandMode {
  pub fn new(map: CommandMap) -> Self {
    Self {
      map,
      latch: Latch::Default,
    }
  }

  fn structure_for_key(key: i32) -> Option<Structure> {
    Some(match u32::try_from(key).ok().and_then(char::from_u32)? {
      'c' => Structure::Char,
      'w' => Structure::Word,
      'e' => Structure::Line,
      'g' => Structure::Page,
      '/' => Structure::Search,
      'm' => Structure::Mark,
      'u' => Structure::Cursor,
      't' => Structure::Tree,
      'B' => Structure::Buffer,
      'y' => Structure::Symbol,
      'p' => Structure::Paragraph,
      _ => return None,
    })
  }

  fn process_default(&mut self, key: i32, modifiers: &mut Modifiers) -> ModeOutcome {
    if let Some(ch) = u32::try_from(key).ok().and_then(char::from_u32) {
      if ch.is_ascii_digit() && ch != '0' {
        self.latch = Latch::AwaitingNumber(ch.to_string());
        return ModeOutcome::Pending;
      }
      if ch == '0' {
        return ModeOutcome::Transform(Transformation::Composite(Arc::new(
          MoveToLineBoundary {
            direction: Direction::Backward,
          },
        )));
      }
    }

    let Some(action) = self.map.lookup(key) else {
      return ModeOutcome::Unhandled;
    };
    match action {
      CommandAction::MoveBackward => {
        modifiers.direction = Direction::Backward;
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveCursor)))
      },
      CommandAction::MoveForward => {
        modifiers.direction = Direction::Forward;
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveCursor)))
      },
      CommandAction::MoveUp | CommandAction::MoveDown => {
        modifiers.structure = Structure::Line;
        modifiers.direction = if action == CommandAction::MoveUp {
          Direction::Backward
        } else {
          Direction::Forward
        };
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveCursor)))
      },
      CommandAction::MovePageUp | CommandAction::MovePageDown => {
        modifiers.structure = Structure::Page;
        modifiers.direction = if action == CommandAction::MovePageUp {
          Direction::Backward
        } else {
          Direction::Forward
        };
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveCursor)))
      },
      CommandAction::LineStart => {
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveToLineBoundary {
          direction: Direction::Backward,
        })))
      },
      CommandAction::LineEnd => {
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveToLineBoundary {
          direction: Direction::Forward,
        })))
      },
      CommandAction::Delete => {
        ModeOutcome::Transform(Transformation::Delete(DeleteSpec {
          modifiers:         *modifiers,
          copy_to_paste:     true,
          line_end_behavior: LineEndBehavior::DeleteTrailingNewline,
        }))
      },
      CommandAction::EnterInsert => ModeOutcome::EnterInsertMode,
      CommandAction::Undo => ModeOutcome::Undo,
      CommandAction::Redo => ModeOutcome::Redo,
      CommandAction::Paste => ModeOutcome::Paste,
      CommandAction::ReverseDirection => {
        modifiers.direction = modifiers.direction.reverse();
        ModeOutcome::Pending
      },
      CommandAction::SelectStructure => {
        self.latch = Latch::AwaitingStructure;
        ModeOutcome::Pending
      },
      CommandAction::FindChar => {
        self.latch = Latch::AwaitingChar(modifiers.direction);
        ModeOutcome::Pending
      },
      CommandAction::SearchPrompt => ModeOutcome::OpenPrompt(PromptKind::Search),
      CommandAction::CommandPrompt => ModeOutcome::OpenPrompt(PromptKind::Command),
      CommandAction::SearchNext => {
        modifiers.structure = Structure::Search;
        ModeOutcome::Transform(Transformation::Composite(Arc::new(MoveCursor)))
      },
      CommandAction::TreeNavigate => ModeOutcome::Transform(Transformation::TreeNavigate),
      CommandAction::AdvanceWidget => ModeOutcome::AdvanceWidget,
      CommandAction::SplitWidgetHorizontal => ModeOutcome::SplitWidget { vertical: false },
      CommandAction::SplitWidgetVertical => ModeOutcome::SplitWidget { vertical: true },
      CommandAction::CloseWidget => ModeOutcome::CloseWidget,
      CommandAction::HardRedraw => ModeOutcome::HardRedraw,
      CommandAction::Quit => ModeOutcome::Terminate(0),
    }
  }
}

impl EditorMode for CommandMode {
  fn name(&self) -> &'static str {
    "command"
  }

  fn process(&mut self, key: i32, modifiers: &mut Modifiers) -> ModeOutcome {
    if key == keys::ESCAPE {
      self.latch = Latch::Default;
      modifiers.reset_soft();
      return ModeOutcome::Pending;
    }

    match std::mem::replace(&mut self.latch, Latch::Default) {
      Latch::Default => self.process_default(key, modifiers),
      Latch::AwaitingStructure => {
        match Self::structure_for_key(key) {
          None => ModeOutcome::Unhandled,
          Some(structure) => {
            // Selecting the latched structure again makes it sticky.
            if modifiers.structure == structure {
              modifiers.sticky_structure = true;
            } else {
              modifiers.structure = structure;
            }
            ModeOutcome::Pending
          },
        }
      },
      Latch::AwaitingNumber(mut digits) => {
        if let Some(ch) = u32::try_from(key).ok().and_then(char::from_u32) {
          if ch.is_ascii_digit() {
            digits.push(ch);
            self.latch = Latch::AwaitingNumber(digits);
            return ModeOutcome::Pending;
          }
        }
        modifiers.repetitions = digits.parse().unwrap_or(1);
        self.process_default(key, modifiers)
      },
      Latch::AwaitingChar(direction) => {
        match u32::try_from(key).ok().and_then(char::from_u32) {
          None => ModeOutcome::Unhandled,
          Some(target) => {
            ModeOutcome::Transform(Transformation::Composite(Arc::new(FindCharacter {
              target,
              direction,
            })))
          },
        }
      },
    }
  }
}

/// Insert mode: printable keys become insertions at the cursor.
pub struct InsertMode;

impl EditorMode for InsertMode {
  fn name(&self) -> &'static str {
    "insert"
  }

  fn process(&mut self, key: i32, modifiers: &mut Modifiers) -> ModeOutcome {
    use crate::{
      contents::Contents,
      transformation::InsertSpec,
    };

    match key {
      keys::ESCAPE => {
        modifiers.reset_soft();
        ModeOutcome::EnterCommandMode
      },
      keys::BACKSPACE => {
        let mut delete_modifiers = Modifiers::default();
        delete_modifiers.direction = Direction::Backward;
        ModeOutcome::Transform(Transformation::Delete(DeleteSpec {
          modifiers:         delete_modifiers,
          copy_to_paste:     false,
          line_end_behavior: LineEndBehavior::DeleteTrailingNewline,
        }))
      },
      10 | 13 => {
        ModeOutcome::Transform(Transformation::Insert(InsertSpec::at_cursor(
          Contents::from_text("\n"),
        )))
      },
      9 => {
        ModeOutcome::Transform(Transformation::Insert(InsertSpec::at_cursor(
          Contents::from_text("\t"),
        )))
      },
      key => {
        match u32::try_from(key).ok().and_then(char::from_u32) {
          Some(ch) if !ch.is_control() => {
            let mut text = [0_u8; 4];
            ModeOutcome::Transform(Transformation::Insert(InsertSpec::at_cursor(
              Contents::from_text(ch.encode_utf8(&mut text)),
            )))
          },
          _ => ModeOutcome::Unhandled,
        }
      },
    }
  }
}

/// A one-line prompt (search queries, editor commands).
pub struct PromptMode {
  kind: PromptKind,
  text: String,
}

impl PromptMode {
  pub fn new(kind: PromptKind) -> Self {
    Self {
      kind,
      text: String::new(),
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }
}

impl EditorMode for PromptMode {
  fn name(&self) -> &'static str {
    "prompt"
  }

  fn process(&mut self, key: i32, _modifiers: &mut Modifiers) -> ModeOutcome {
    match key {
      keys::ESCAPE => ModeOutcome::PromptCancelled,
      keys::BACKSPACE => {
        self.text.pop();
        ModeOutcome::Pending
      },
      keys::CTRL_U => {
        self.text.clear();
        ModeOutcome::Pending
      },
      10 | 13 => {
        ModeOutcome::PromptAccepted {
          kind: self.kind,
          text: std::mem::take(&mut self.text),
        }
      },
      9 => {
        ModeOutcome::RequestCompletion {
          kind: self.kind,
          text: self.text.clone(),
        }
      },
      key => {
        match u32::try_from(key).ok().and_then(char::from_u32) {
          Some(ch) if !ch.is_control() => {
            self.text.push(ch);
            ModeOutcome::Pending
          },
          _ => ModeOutcome::Unhandled,
        }
      },
    }
  }

  fn complete(&mut self, suggestion: String) {
    if suggestion.len() > self.text.len() {
      self.text = suggestion;
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn command_mode() -> (CommandMode, Modifiers) {
    (CommandMode::new(CommandMap::classic()), Modifiers::default())
  }

  #[test]
  fn digits_accumulate_repetitions() {
    let (mut mode, mut modifiers) = command_mode();
    assert!(matches!(
      mode.process('1' as i32, &mut modifiers),
      ModeOutcome::Pending
    ));
    assert!(matches!(
      mode.process('2' as i32, &mut modifiers),
      ModeOutcome::Pending
    ));
    let outcome = mode.process('d' as i32, &mut modifiers);
    assert_eq!(modifiers.repetitions, 12);
    assert!(matches!(outcome, ModeOutcome::Transform(_)));
  }

  #[test]
  fn structure_latch_and_stickiness() {
    let (mut mode, mut modifiers) = command_mode();
    mode.process('s' as i32, &mut modifiers);
    mode.process('w' as i32, &mut modifiers);
    assert_eq!(modifiers.structure, Structure::Word);
    assert!(!modifiers.sticky_structure);

    mode.process('s' as i32, &mut modifiers);
    mode.process('w' as i32, &mut modifiers);
    assert!(modifiers.sticky_structure);
  }

  #[test]
  fn escape_resets_soft_state_only() {
    let (mut mode, mut modifiers) = command_mode();
    mode.process('s' as i32, &mut modifiers);
    mode.process('e' as i32, &mut modifiers);
    mode.process('s' as i32, &mut modifiers);
    mode.process('e' as i32, &mut modifiers);
    mode.process('5' as i32, &mut modifiers);
    mode.process(keys::ESCAPE, &mut modifiers);

    assert_eq!(modifiers.repetitions, 1);
    // Sticky structure survives escape.
    assert_eq!(modifiers.structure, Structure::Line);
    assert!(modifiers.sticky_structure);
  }

  #[test]
  fn movement_keys_set_direction() {
    let (mut mode, mut modifiers) = command_mode();
    assert!(matches!(
      mode.process('h' as i32, &mut modifiers),
      ModeOutcome::Transform(Transformation::Composite(_))
    ));
    assert_eq!(modifiers.direction, Direction::Backward);
  }

  #[test]
  fn insert_mode_emits_insertions() {
    let mut mode = InsertMode;
    let mut modifiers = Modifiers::default();
    assert!(matches!(
      mode.process('x' as i32, &mut modifiers),
      ModeOutcome::Transform(Transformation::Insert(_))
    ));
    assert!(matches!(
      mode.process(keys::ESCAPE, &mut modifiers),
      ModeOutcome::EnterCommandMode
    ));
  }

  #[test]
  fn prompt_collects_text_and_accepts() {
    let mut mode = PromptMode::new(PromptKind::Search);
    let mut modifiers = Modifiers::default();
    for key in ['a', 'b', 'c'] {
      mode.process(key as i32, &mut modifiers);
    }
    mode.process(keys::BACKSPACE, &mut modifiers);
    match mode.process(10, &mut modifiers) {
      ModeOutcome::PromptAccepted { kind, text } => {
        assert_eq!(kind, PromptKind::Search);
        assert_eq!(text, "ab");
      },
      _ => panic!("expected acceptance"),
    }
  }

  #[test]
  fn find_char_waits_for_target() {
    let (mut mode, mut modifiers) = command_mode();
    assert!(matches!(
      mode.process('f' as i32, &mut modifiers),
      ModeOutcome::Pending
    ));
    assert!(matches!(
      mode.process('z' as i32, &mut modifiers),
      ModeOutcome::Transform(Transformation::Composite(_))
    ));
  }
}
