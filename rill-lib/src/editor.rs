//! Global editor state and top-level input dispatch.
//!
//! The editor owns the buffer map (including the reserved paste buffer),
//! the widget tree, the current input mode, and the work-queue handle.
//! One main-loop iteration drains signals, runs ready work-queue
//! callbacks, routes fd data to owning buffers, and dispatches user keys
//! through the active mode into transformations on the active buffer.

use std::{
  collections::BTreeMap,
  os::fd::RawFd,
  sync::Arc,
};

use parking_lot::Mutex;
use rill_core::style::{
  Style,
  StyleSet,
};
use rill_event::{
  evaluator::AsyncEvaluator,
  notification::Notification,
  signal::EditorSignal,
  work_queue::WorkQueue,
};
use tracing::debug;

use crate::{
  buffer::{
    Buffer,
    ReadStatus,
  },
  contents::Contents,
  history_file::ConfigPaths,
  mode::{
    CommandMap,
    CommandMode,
    EditorMode,
    InsertMode,
    ModeOutcome,
    PromptKind,
    PromptMode,
  },
  output::{
    BufferProducer,
    HorizontalProducer,
    OutputProducer,
    StatusProducer,
    VerticalProducer,
  },
  parse::{
    classic::ClassicParser,
    parser::LineParser,
  },
  predictor::{
    PredictResults,
    Predictor,
    PredictorInput,
  },
  search::{
    SearchDirection,
    WrapBehavior,
    search,
  },
  status::Status,
  transformation::{
    InsertSpec,
    Transformation,
  },
  variables::BufferVariables,
  widget::{
    BufferName,
    Widget,
  },
};

/// Reserved in-memory buffer receiving deleted text.
pub const PASTE_BUFFER_NAME: &str = "- paste buffer";
/// The buffer every editor starts with.
pub const SCRATCH_BUFFER_NAME: &str = "scratch";

/// Callback type the script-evaluator collaborator registers for `:`
/// commands. The core only forwards the text.
pub type CommandCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Read-mostly registries, built explicitly at startup.
pub struct EditorOptions {
  pub buffer_variables: BufferVariables,
  pub parser:           Arc<dyn LineParser>,
  pub command_map:      CommandMap,
  pub config_paths:     ConfigPaths,
  pub work_queue:       WorkQueue,
  pub detached:         bool,
}

impl Default for EditorOptions {
  fn default() -> Self {
    Self {
      buffer_variables: BufferVariables::build(),
      parser:           Arc::new(ClassicParser::with_default_keywords()),
      command_map:      CommandMap::classic(),
      config_paths:     ConfigPaths::from_env(),
      work_queue:       WorkQueue::new(),
      detached:         false,
    }
  }
}

struct CompletionState {
  slot:   Arc<Mutex<Option<PredictResults>>>,
  cancel: Notification,
}

pub struct Editor {
  buffer_variables:    BufferVariables,
  parser:              Arc<dyn LineParser>,
  command_map:         CommandMap,
  config_paths:        ConfigPaths,
  work_queue:          WorkQueue,
  evaluator:           AsyncEvaluator,
  buffers:             BTreeMap<BufferName, Buffer>,
  widget:              Widget,
  mode:                Box<dyn EditorMode>,
  status:              Status,
  command_callback:    Option<CommandCallback>,
  handling_interrupts: bool,
  detached:            bool,
  terminate:           Option<i32>,
  hard_redraw:         bool,
  redraw_epoch:        u64,
  pending_completion:  Option<CompletionState>,
}

impl Editor {
  pub fn new(options: EditorOptions) -> Self {
    let evaluator = AsyncEvaluator::new("editor", options.work_queue.clone(), 64);
    let mut editor = Self {
      buffer_variables: options.buffer_variables,
      parser: options.parser,
      command_map: options.command_map.clone(),
      config_paths: options.config_paths,
      work_queue: options.work_queue,
      evaluator,
      buffers: BTreeMap::new(),
      widget: Widget::leaf(SCRATCH_BUFFER_NAME),
      mode: Box::new(CommandMode::new(options.command_map)),
      status: Status::new(),
      command_callback: None,
      handling_interrupts: false,
      detached: options.detached,
      terminate: None,
      hard_redraw: false,
      redraw_epoch: 0,
      pending_completion: None,
    };
    editor.create_buffer(PASTE_BUFFER_NAME);
    editor.create_buffer(SCRATCH_BUFFER_NAME);
    editor
  }

  pub fn create_buffer(&mut self, name: impl Into<BufferName>) -> &mut Buffer {
    let name = name.into();
    self.buffers.entry(name.clone()).or_insert_with(|| {
      Buffer::new(name, self.buffer_variables.clone(), self.parser.clone())
    })
  }

  /// Creates (or replaces) a buffer with the given text and shows it in
  /// the active widget leaf.
  pub fn open_buffer(&mut self, name: impl Into<BufferName>, text: &str) {
    let name = name.into();
    self.create_buffer(name.clone()).set_text(text);
    self.widget.set_active_leaf_buffer(name);
    self.redraw_epoch += 1;
  }

  pub fn buffer(&self, name: &str) -> Option<&Buffer> {
    self.buffers.get(&BufferName::from(name))
  }

  pub fn buffer_mut(&mut self, name: &str) -> Option<&mut Buffer> {
    self.buffers.get_mut(&BufferName::from(name))
  }

  pub fn buffer_names(&self) -> impl Iterator<Item = &BufferName> {
    self.buffers.keys()
  }

  pub fn active_buffer_name(&self) -> BufferName {
    self.widget.active_leaf().clone()
  }

  pub fn active_buffer(&self) -> Option<&Buffer> {
    self.buffers.get(self.widget.active_leaf())
  }

  pub fn active_buffer_mut(&mut self) -> Option<&mut Buffer> {
    let name = self.widget.active_leaf().clone();
    self.buffers.get_mut(&name)
  }

  pub fn widget(&self) -> &Widget {
    &self.widget
  }

  pub fn status(&self) -> &Status {
    &self.status
  }

  pub fn work_queue(&self) -> &WorkQueue {
    &self.work_queue
  }

  pub fn evaluator(&self) -> &AsyncEvaluator {
    &self.evaluator
  }

  pub fn config_paths(&self) -> &ConfigPaths {
    &self.config_paths
  }

  pub fn mode_name(&self) -> &'static str {
    self.mode.name()
  }

  pub fn set_command_callback(&mut self, callback: CommandCallback) {
    self.command_callback = Some(callback);
  }

  pub fn terminate_requested(&self) -> Option<i32> {
    self.terminate
  }

  pub fn redraw_epoch(&self) -> u64 {
    self.redraw_epoch
  }

  pub fn take_hard_redraw(&mut self) -> bool {
    std::mem::take(&mut self.hard_redraw)
  }

  // Input dispatch.
  //

  pub fn process_input(&mut self, key: i32) {
    let name = self.active_buffer_name();
    let Some(buffer) = self.buffers.get_mut(&name) else {
      return;
    };
    let outcome = self.mode.process(key, &mut buffer.modifiers);
    self.handle_outcome(name, outcome);
  }

  fn enter_command_mode(&mut self) {
    self.mode = Box::new(CommandMode::new(self.command_map.clone()));
  }

  fn handle_outcome(&mut self, name: BufferName, outcome: ModeOutcome) {
    match outcome {
      ModeOutcome::Pending | ModeOutcome::Unhandled => {},
      ModeOutcome::Transform(transformation) => {
        self.apply_to_buffer(&name, &transformation);
      },
      ModeOutcome::Undo => {
        if let Some(buffer) = self.buffers.get_mut(&name) {
          match buffer.undo() {
            Ok(true) => self.redraw_epoch += 1,
            Ok(false) => self.status.set_information("nothing to undo"),
            Err(error) => self.status.set_warning(format!("undo failed: {error}")),
          }
        }
      },
      ModeOutcome::Redo => {
        if let Some(buffer) = self.buffers.get_mut(&name) {
          match buffer.redo() {
            Ok(true) => self.redraw_epoch += 1,
            Ok(false) => self.status.set_information("nothing to redo"),
            Err(error) => self.status.set_warning(format!("redo failed: {error}")),
          }
        }
      },
      ModeOutcome::Paste => {
        let content = self
          .buffers
          .get(&BufferName::from(PASTE_BUFFER_NAME))
          .map(|paste| paste.contents().snapshot());
        match content {
          Some(content) if !content.is_empty() => {
            let repetitions = self
              .buffers
              .get(&name)
              .map(|buffer| buffer.modifiers.repetitions)
              .unwrap_or(1);
            let mut spec = InsertSpec::at_cursor(content);
            spec.repetitions = repetitions;
            self.apply_to_buffer(&name, &Transformation::Insert(spec));
          },
          _ => self.status.set_information("paste buffer is empty"),
        }
      },
      ModeOutcome::EnterInsertMode => self.mode = Box::new(InsertMode),
      ModeOutcome::EnterCommandMode => self.enter_command_mode(),
      ModeOutcome::OpenPrompt(kind) => {
        self.mode = Box::new(PromptMode::new(kind));
      },
      ModeOutcome::PromptAccepted { kind, text } => {
        self.cancel_pending_completion();
        self.enter_command_mode();
        self.accept_prompt(&name, kind, &text);
      },
      ModeOutcome::PromptCancelled => {
        self.cancel_pending_completion();
        self.enter_command_mode();
      },
      ModeOutcome::RequestCompletion { kind, text } => {
        self.request_completion(&name, kind, text);
      },
      ModeOutcome::AdvanceWidget => {
        self.widget.advance(1);
        self.redraw_epoch += 1;
      },
      ModeOutcome::SplitWidget { vertical } => {
        self.widget.split_active(vertical);
        self.redraw_epoch += 1;
      },
      ModeOutcome::CloseWidget => {
        if !self.widget.close_active() {
          self.status.set_warning("cannot close the last window");
        }
        self.redraw_epoch += 1;
      },
      ModeOutcome::HardRedraw => {
        self.hard_redraw = true;
        self.redraw_epoch += 1;
      },
      ModeOutcome::Terminate(code) => self.terminate = Some(code),
    }
  }

  fn apply_to_buffer(&mut self, name: &BufferName, transformation: &Transformation) {
    let Some(buffer) = self.buffers.get_mut(name) else {
      return;
    };
    match buffer.apply(transformation) {
      Err(error) => {
        buffer
          .status_mut()
          .set_warning(format!("edit failed: {error}"));
      },
      Ok(output) => {
        buffer.modifiers.reset_soft();
        if let Some(deleted) = output.deleted {
          self.append_to_paste(deleted);
        }
      },
    }
    self.redraw_epoch += 1;
  }

  fn append_to_paste(&mut self, deleted: Contents) {
    let paste_name = BufferName::from(PASTE_BUFFER_NAME);
    let Some(paste) = self.buffers.get_mut(&paste_name) else {
      return;
    };
    let end = paste.contents().range().end;
    if let Err(error) = paste.insert_contents_at(&deleted, end) {
      self.status.set_warning(format!("paste buffer: {error}"));
    }
    let end = paste.contents().range().end;
    paste
      .cursors()
      .lock()
      .set_mut(crate::cursors::PASTE_CURSORS)
      .move_active(end);
  }

  fn accept_prompt(&mut self, name: &BufferName, kind: PromptKind, text: &str) {
    match kind {
      PromptKind::Search => {
        if text.is_empty() {
          return;
        }
        if let Err(error) = self.config_paths.append_history("search", text) {
          debug!(%error, "failed to append search history");
        }
        let Some(buffer) = self.buffers.get_mut(name) else {
          return;
        };
        buffer.set_last_search_query(text);
        let matches = search(
          buffer.contents(),
          text,
          buffer.position(),
          SearchDirection::Forward,
          WrapBehavior::Wrap,
        );
        match matches.first() {
          None => self.status.set_warning(format!("no matches: {text}")),
          Some(first) => {
            let target = *first;
            let count = matches.len();
            self.apply_to_buffer(name, &Transformation::SetPosition(target));
            self.status.set_information(format!("{count} matches"));
          },
        }
      },
      PromptKind::Command => {
        if text.is_empty() {
          return;
        }
        if let Err(error) = self.config_paths.append_history("editor_commands", text) {
          debug!(%error, "failed to append command history");
        }
        match &self.command_callback {
          Some(callback) => callback(text),
          None => {
            self
              .status
              .set_warning("no command evaluator registered");
          },
        }
      },
    }
  }

  // Async prompt completion.
  //

  fn cancel_pending_completion(&mut self) {
    if let Some(state) = self.pending_completion.take() {
      state.cancel.notify();
    }
  }

  fn request_completion(&mut self, name: &BufferName, kind: PromptKind, text: String) {
    self.cancel_pending_completion();
    let cancel = Notification::new();
    let predictor = match kind {
      PromptKind::Search => {
        let Some(buffer) = self.buffers.get(name) else {
          return;
        };
        Predictor::Syntax {
          contents: buffer.contents().snapshot(),
        }
      },
      PromptKind::Command => {
        Predictor::File {
          search_paths: self.config_paths.search_paths().to_vec(),
        }
      },
    };
    let slot = Arc::new(Mutex::new(None));
    let observed = slot.clone();
    predictor
      .predict(&self.evaluator, PredictorInput {
        query:  text.into(),
        cancel: cancel.clone(),
      })
      .set_consumer(move |results| {
        *observed.lock() = Some(results);
      });
    self.pending_completion = Some(CompletionState { slot, cancel });
  }

  /// Applies any completion results that arrived through the work queue.
  /// Called once per main-loop iteration.
  pub fn pump_completions(&mut self) {
    let Some(state) = &self.pending_completion else {
      return;
    };
    let Some(results) = state.slot.lock().take() else {
      return;
    };
    self.pending_completion = None;
    if results.cancelled {
      return;
    }
    if let Some(prefix) = results.common_prefix {
      self.mode.complete(prefix.to_string());
    }
    self
      .status
      .set_information(format!("{} completions", results.matches.len()));
    self.redraw_epoch += 1;
  }

  // Signals.
  //

  pub fn process_signal(&mut self, signal: EditorSignal) {
    match signal {
      EditorSignal::Interrupt => {
        if !self.handling_interrupts {
          self.handling_interrupts = true;
          self.status.set_warning("interrupt latched");
          return;
        }
        let child = self.active_buffer().and_then(Buffer::child_pid);
        match child {
          None => self.status.set_information("no subprocess to interrupt"),
          Some(pid) => {
            if let Err(error) = rill_event::signal::interrupt_child(pid) {
              self.status.set_warning(format!("interrupt failed: {error}"));
            }
          },
        }
      },
      EditorSignal::Hangup => {
        if !self.detached {
          self.terminate = Some(1);
        }
      },
      EditorSignal::WindowResize => {
        self.hard_redraw = true;
        self.redraw_epoch += 1;
      },
    }
  }

  // Buffer fd routing.
  //

  pub fn buffer_fds(&self) -> Vec<(BufferName, RawFd)> {
    self
      .buffers
      .iter()
      .filter_map(|(name, buffer)| buffer.input_fd().map(|fd| (name.clone(), fd)))
      .collect()
  }

  pub fn read_buffer_data(&mut self, name: &BufferName) {
    let Some(buffer) = self.buffers.get_mut(name) else {
      return;
    };
    let before = buffer.version();
    match buffer.read_data() {
      ReadStatus::NoInput => {},
      ReadStatus::Open => {},
      ReadStatus::Failed => self.redraw_epoch += 1,
      ReadStatus::Eof { reload_requested } => {
        if reload_requested {
          self
            .status
            .set_information(format!("{name}: reload requested"));
        }
        self.redraw_epoch += 1;
      },
    }
    if let Some(buffer) = self.buffers.get(name) {
      if buffer.version() != before {
        self.redraw_epoch += 1;
      }
    }
  }

  // Output.
  //

  pub fn create_output_producer(&self, lines: usize, width: usize) -> OutputProducer {
    self.producer_for(&self.widget, lines, width, true)
  }

  fn producer_for(
    &self,
    widget: &Widget,
    lines: usize,
    width: usize,
    contains_active: bool,
  ) -> OutputProducer {
    match widget {
      Widget::Leaf { buffer } => {
        let Some(buffer) = self.buffers.get(buffer) else {
          return OutputProducer::Blank;
        };
        let content_rows = lines.saturating_sub(1).max(1);
        let cursor = buffer.position();
        let view_start = cursor.line.saturating_sub(content_rows - 1);
        let shown_cursor = contains_active.then_some(cursor);
        OutputProducer::Horizontal(HorizontalProducer::new(vec![
          (
            OutputProducer::Buffer(BufferProducer::new(
              buffer.contents().snapshot(),
              shown_cursor,
              view_start,
            )),
            content_rows,
          ),
          (
            OutputProducer::StatusRow(StatusProducer::new(
              buffer.status(),
              StyleSet::of(Style::Reverse),
            )),
            1,
          ),
        ]))
      },
      Widget::HSplit { children, active } => {
        let share = (lines / children.len().max(1)).max(1);
        let rows = children
          .iter()
          .enumerate()
          .map(|(index, child)| {
            let child_lines = if index + 1 == children.len() {
              lines.saturating_sub(share * (children.len() - 1)).max(1)
            } else {
              share
            };
            (
              self.producer_for(
                child,
                child_lines,
                width,
                contains_active && index == *active,
              ),
              child_lines,
            )
          })
          .collect();
        OutputProducer::Horizontal(HorizontalProducer::new(rows))
      },
      Widget::VSplit { children, active } => {
        let share = (width / children.len().max(1)).max(1);
        let columns = children
          .iter()
          .enumerate()
          .map(|(index, child)| {
            let child_width = if index + 1 == children.len() {
              width.saturating_sub(share * (children.len() - 1)).max(1)
            } else {
              share
            };
            (
              self.producer_for(
                child,
                lines,
                child_width,
                contains_active && index == *active,
              ),
              child_width,
            )
          })
          .collect();
        OutputProducer::Vertical(VerticalProducer::new(columns, *active))
      },
    }
  }
}

#[cfg(test)]
mod test {
  use rill_core::position::LineColumn;

  use super::*;
  use crate::mode::keys;

  fn editor_with(text: &str) -> Editor {
    let mut editor = Editor::new(EditorOptions {
      config_paths: ConfigPaths::new(Vec::new()),
      ..EditorOptions::default()
    });
    editor.open_buffer("main", text);
    editor
  }

  fn type_keys(editor: &mut Editor, input: &str) {
    for ch in input.chars() {
      editor.process_input(ch as i32);
    }
  }

  #[test]
  fn insert_mode_types_text() {
    let mut editor = editor_with("");
    editor.process_input('i' as i32);
    assert_eq!(editor.mode_name(), "insert");
    type_keys(&mut editor, "hi");
    editor.process_input(keys::ESCAPE);
    assert_eq!(editor.mode_name(), "command");
    assert_eq!(editor.active_buffer().unwrap().to_text(), "hi");
  }

  #[test]
  fn delete_copies_into_paste_and_pastes_back() {
    let mut editor = editor_with("hello world");
    // Delete the first word.
    type_keys(&mut editor, "swd");
    assert_eq!(editor.active_buffer().unwrap().to_text(), " world");
    assert_eq!(
      editor.buffer(PASTE_BUFFER_NAME).unwrap().to_text(),
      "hello"
    );

    // Paste it back at the cursor.
    editor.process_input('p' as i32);
    assert_eq!(editor.active_buffer().unwrap().to_text(), "hello world");
  }

  #[test]
  fn undo_key_reverts_deletion() {
    let mut editor = editor_with("abc");
    type_keys(&mut editor, "3d");
    assert_eq!(editor.active_buffer().unwrap().to_text(), "");
    editor.process_input('u' as i32);
    assert_eq!(editor.active_buffer().unwrap().to_text(), "abc");
  }

  #[test]
  fn movement_follows_structure() {
    let mut editor = editor_with("one two three");
    type_keys(&mut editor, "swl");
    assert_eq!(
      editor.active_buffer().unwrap().position(),
      LineColumn::new(0, 3)
    );
  }

  #[test]
  fn search_prompt_moves_to_match() {
    let mut editor = editor_with("alpha\nbeta\ngamma");
    type_keys(&mut editor, "/beta");
    editor.process_input(10);
    assert_eq!(
      editor.active_buffer().unwrap().position(),
      LineColumn::new(1, 0)
    );
    assert_eq!(
      editor.active_buffer().unwrap().last_search_query(),
      Some("beta")
    );
  }

  #[test]
  fn widget_split_and_advance() {
    let mut editor = editor_with("x");
    editor.process_input(keys::CTRL_D);
    assert_eq!(editor.widget().count_leaves(), 2);
    editor.process_input('o' as i32);
    assert_eq!(editor.active_buffer_name(), BufferName::from("main"));
  }

  #[test]
  fn quit_key_requests_termination() {
    let mut editor = editor_with("");
    editor.process_input('q' as i32);
    assert_eq!(editor.terminate_requested(), Some(0));
  }

  #[test]
  fn interrupt_latches_before_acting() {
    let mut editor = editor_with("");
    editor.process_signal(EditorSignal::Interrupt);
    assert_eq!(editor.status().text(), "interrupt latched");
    editor.process_signal(EditorSignal::Interrupt);
    assert_eq!(editor.status().text(), "no subprocess to interrupt");
  }

  #[test]
  fn resize_requests_hard_redraw() {
    let mut editor = editor_with("");
    editor.process_signal(EditorSignal::WindowResize);
    assert!(editor.take_hard_redraw());
    assert!(!editor.take_hard_redraw());
  }

  #[test]
  fn output_producer_emits_buffer_rows() {
    use crate::output::{
      CursorBehavior,
      OutputOptions,
    };

    let editor = editor_with("top\nbottom");
    let mut producer = editor.create_output_producer(3, 8);
    let options = OutputOptions {
      width: 8,
      active_cursor_behavior: CursorBehavior::Show,
    };
    let first = producer.next_line(&options);
    assert_eq!(first.line.to_string(), "top     ");
    assert_eq!(first.cursor, Some(0));
    let second = producer.next_line(&options);
    assert_eq!(second.line.to_string(), "bottom  ");
  }

  #[test]
  fn completion_pump_applies_prefix() {
    use std::time::Instant;

    let mut editor = editor_with("alpha alphabet");
    editor.process_input('/' as i32);
    type_keys(&mut editor, "alp");
    editor.process_input(9);

    let deadline = Instant::now() + std::time::Duration::from_secs(5);
    loop {
      editor.work_queue().clone().execute(Instant::now());
      editor.pump_completions();
      if editor.status().text().ends_with("completions") {
        break;
      }
      assert!(Instant::now() < deadline, "completion never arrived");
      std::thread::yield_now();
    }
  }
}
