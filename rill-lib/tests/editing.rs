//! End-to-end editing scenarios: transformations applied to real buffers,
//! inverses driving undo, cursors tracking every mutation.

use std::sync::Arc;

use rill_core::{
  position::LineColumn,
  style::{
    Style,
    StyleSet,
  },
};
use rill_lib::{
  buffer::Buffer,
  contents::Contents,
  line::LineBuilder,
  modifiers::{
    Direction,
    Modifiers,
  },
  parse::parser::NullParser,
  structure::Structure,
  transformation::{
    DeleteSpec,
    FinalPosition,
    InsertSpec,
    LineEndBehavior,
    Transformation,
  },
  variables::BufferVariables,
};

fn buffer_with(text: &str) -> Buffer {
  let mut buffer = Buffer::new("test", BufferVariables::build(), Arc::new(NullParser));
  buffer.set_text(text);
  buffer
}

fn insert_at_cursor(text: &str) -> Transformation {
  Transformation::Insert(InsertSpec::at_cursor(Contents::from_text(text)))
}

fn delete_chars(amount: usize) -> Transformation {
  Transformation::Delete(DeleteSpec::chars(amount))
}

#[test]
fn insert_then_undo_restores_text_and_cursor() {
  let mut buffer = buffer_with("ab\ncd");
  buffer.set_position(LineColumn::new(0, 1));

  buffer.apply(&insert_at_cursor("X")).unwrap();
  assert_eq!(buffer.to_text(), "aXb\ncd");
  assert_eq!(buffer.position(), LineColumn::new(0, 2));

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "ab\ncd");
  assert_eq!(buffer.position(), LineColumn::new(0, 1));
}

#[test]
fn delete_across_lines_and_undo() {
  let mut buffer = buffer_with("ab\ncd\nef");
  buffer.set_position(LineColumn::new(0, 1));

  // Delete b, the newline, c and d.
  buffer.apply(&delete_chars(4)).unwrap();
  assert_eq!(buffer.to_text(), "a\nef");
  assert_eq!(buffer.position(), LineColumn::new(0, 1));

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "ab\ncd\nef");
  assert_eq!(buffer.position(), LineColumn::new(0, 1));
}

#[test]
fn split_line_adjusts_cursor_past_split_point() {
  let mut buffer = buffer_with("alejandro\nforero\ncuervo");
  buffer.set_position(LineColumn::new(1, 5));

  buffer
    .contents_mut()
    .split_line(LineColumn::new(1, 3))
    .unwrap();
  assert_eq!(buffer.to_text(), "alejandro\nfor\nero\ncuervo");
  assert_eq!(buffer.position(), LineColumn::new(2, 2));
}

#[test]
fn undo_restores_styles() {
  let mut buffer = buffer_with("");
  let mut styled = LineBuilder::new();
  styled.append_text("warm".into(), StyleSet::of(Style::Red));
  let contents = Contents::from_lines([styled.build()]);

  buffer
    .apply(&Transformation::Insert(InsertSpec::at_cursor(contents)))
    .unwrap();
  assert_eq!(buffer.to_text(), "warm");
  assert_eq!(
    buffer.contents().at(0).unwrap().style_at(2),
    StyleSet::of(Style::Red)
  );

  // Delete it, undo, and the styles must come back.
  buffer.set_position(LineColumn::zero());
  buffer.apply(&delete_chars(4)).unwrap();
  assert_eq!(buffer.to_text(), "");
  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "warm");
  assert_eq!(
    buffer.contents().at(0).unwrap().style_at(2),
    StyleSet::of(Style::Red)
  );
}

#[test]
fn deleting_from_empty_buffer_is_trivial_success() {
  let mut buffer = buffer_with("");
  let output = buffer.apply(&delete_chars(5)).unwrap();
  assert!(!output.made_progress);
  assert!(!output.modified_buffer);
  assert_eq!(buffer.to_text(), "");
  // Nothing landed on the undo stack.
  assert_eq!(buffer.undo_depth(), 0);
}

#[test]
fn inserting_empty_contents_is_identity() {
  let mut buffer = buffer_with("stay");
  let output = buffer.apply(&insert_at_cursor("")).unwrap();
  assert!(!output.made_progress);
  assert_eq!(buffer.to_text(), "stay");
  assert_eq!(buffer.undo_depth(), 0);
}

#[test]
fn zero_repetitions_is_a_noop_with_identity_inverse() {
  let mut buffer = buffer_with("abc");
  let mut spec = DeleteSpec::chars(3);
  spec.modifiers.repetitions = 0;
  let output = buffer.apply(&Transformation::Delete(spec)).unwrap();
  assert!(!output.made_progress);
  assert_eq!(buffer.to_text(), "abc");
}

#[test]
fn delete_crossing_eof_stops_at_eof() {
  let mut buffer = buffer_with("ab");
  buffer.set_position(LineColumn::new(0, 1));
  buffer.apply(&delete_chars(100)).unwrap();
  assert_eq!(buffer.to_text(), "a");
  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "ab");
}

#[test]
fn insert_with_final_position_start_pins_cursor() {
  let mut buffer = buffer_with("xy");
  buffer.set_position(LineColumn::new(0, 1));
  let mut spec = InsertSpec::at_cursor(Contents::from_text("long insertion"));
  spec.final_position = FinalPosition::Start;
  buffer.apply(&Transformation::Insert(spec)).unwrap();
  assert_eq!(buffer.to_text(), "xlong insertiony");
  assert_eq!(buffer.position(), LineColumn::new(0, 1));
}

#[test]
fn overwrite_insertion_replaces_and_undoes() {
  use rill_lib::modifiers::ModifyMode;

  let mut buffer = buffer_with("abcdef");
  buffer.set_position(LineColumn::new(0, 1));
  let mut spec = InsertSpec::at_cursor(Contents::from_text("XY"));
  spec.mode = ModifyMode::Overwrite;
  buffer.apply(&Transformation::Insert(spec)).unwrap();
  assert_eq!(buffer.to_text(), "aXYdef");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "abcdef");
}

#[test]
fn repeated_insertions_multiply() {
  let mut buffer = buffer_with("");
  let mut spec = InsertSpec::at_cursor(Contents::from_text("ab"));
  spec.repetitions = 3;
  buffer.apply(&Transformation::Insert(spec)).unwrap();
  assert_eq!(buffer.to_text(), "ababab");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "");
}

#[test]
fn structural_word_delete_with_inverse() {
  let mut buffer = buffer_with("alpha beta gamma");
  buffer.set_position(LineColumn::new(0, 6));

  let mut modifiers = Modifiers::default();
  modifiers.structure = Structure::Word;
  let output = buffer
    .apply(&Transformation::Delete(DeleteSpec {
      modifiers,
      copy_to_paste: true,
      line_end_behavior: LineEndBehavior::DeleteTrailingNewline,
    }))
    .unwrap();

  assert_eq!(buffer.to_text(), "alpha  gamma");
  assert_eq!(output.deleted.as_ref().unwrap().to_text(), "beta");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "alpha beta gamma");
}

#[test]
fn backward_delete_lands_at_range_start() {
  let mut buffer = buffer_with("abcdef");
  buffer.set_position(LineColumn::new(0, 4));

  let mut spec = DeleteSpec::chars(2);
  spec.modifiers.direction = Direction::Backward;
  buffer.apply(&Transformation::Delete(spec)).unwrap();
  assert_eq!(buffer.to_text(), "abef");
  assert_eq!(buffer.position(), LineColumn::new(0, 2));

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "abcdef");
}

#[test]
fn line_structure_delete_consumes_newline() {
  let mut buffer = buffer_with("one\ntwo\nthree");
  buffer.set_position(LineColumn::new(1, 1));

  let mut modifiers = Modifiers::default();
  modifiers.structure = Structure::Line;
  buffer
    .apply(&Transformation::Delete(DeleteSpec {
      modifiers,
      copy_to_paste: false,
      line_end_behavior: LineEndBehavior::DeleteTrailingNewline,
    }))
    .unwrap();
  assert_eq!(buffer.to_text(), "one\nthree");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "one\ntwo\nthree");
}

#[test]
fn stack_applies_left_to_right_and_inverts_in_reverse() {
  let mut buffer = buffer_with("");
  let stack = Transformation::Stack(vec![
    insert_at_cursor("first "),
    insert_at_cursor("second"),
  ]);
  buffer.apply(&stack).unwrap();
  assert_eq!(buffer.to_text(), "first second");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "");
}

#[test]
fn repeat_stops_when_no_progress() {
  let mut buffer = buffer_with("abcde");
  buffer.set_position(LineColumn::zero());
  let repeat = Transformation::Repeat {
    times:          100,
    transformation: Box::new(delete_chars(2)),
  };
  let output = buffer.apply(&repeat).unwrap();
  assert!(output.made_progress);
  assert_eq!(buffer.to_text(), "");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "abcde");
}

#[test]
fn redo_reapplies_undone_edit() {
  let mut buffer = buffer_with("base");
  buffer.set_position(LineColumn::new(0, 4));
  buffer.apply(&insert_at_cursor("!")).unwrap();
  assert_eq!(buffer.to_text(), "base!");

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.to_text(), "base");
  assert!(buffer.redo().unwrap());
  assert_eq!(buffer.to_text(), "base!");
}

#[test]
fn new_edit_clears_redo() {
  let mut buffer = buffer_with("");
  buffer.apply(&insert_at_cursor("a")).unwrap();
  buffer.undo().unwrap();
  assert_eq!(buffer.redo_depth(), 1);

  buffer.apply(&insert_at_cursor("b")).unwrap();
  assert_eq!(buffer.redo_depth(), 0);
  assert!(!buffer.to_text().contains('a'));
}

#[test]
fn undo_stack_is_capped() {
  let mut buffer = buffer_with("");
  let limit_id = buffer.variable_ids().undo_limit;
  buffer.variables_mut().set_int(limit_id, 4).unwrap();

  for _ in 0..10 {
    buffer.apply(&insert_at_cursor("x")).unwrap();
  }
  assert_eq!(buffer.undo_depth(), 4);

  for _ in 0..10 {
    buffer.undo().unwrap();
  }
  // Only the last four insertions could be undone.
  assert_eq!(buffer.to_text(), "xxxxxx");
}

#[test]
fn multi_cursor_sets_survive_edits() {
  let mut buffer = buffer_with("aaa\nbbb");
  buffer.set_active_cursors(
    vec![LineColumn::new(0, 1), LineColumn::new(1, 1)],
    LineColumn::new(0, 1),
  );

  // Insert at the start of line 0; both cursors on line 0 shift.
  buffer
    .insert_contents_at(&Contents::from_text(">> "), LineColumn::new(0, 0))
    .unwrap();
  let cursors = buffer.active_cursors();
  assert!(cursors.contains(&LineColumn::new(0, 4)));
  assert!(cursors.contains(&LineColumn::new(1, 1)));
}

#[test]
fn set_cursors_transformation_is_invertible() {
  let mut buffer = buffer_with("abc\ndef");
  buffer
    .apply(&Transformation::SetCursors {
      positions: vec![LineColumn::new(0, 1), LineColumn::new(1, 2)],
      active:    LineColumn::new(1, 2),
    })
    .unwrap();
  assert_eq!(buffer.position(), LineColumn::new(1, 2));
  assert_eq!(buffer.active_cursors().len(), 2);

  assert!(buffer.undo().unwrap());
  assert_eq!(buffer.active_cursors().len(), 1);
}
