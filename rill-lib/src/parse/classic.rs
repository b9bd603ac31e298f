//! Default scanner for C-like sources.
//!
//! Recognizes line and block comments, string/char/number literals,
//! identifiers and keywords, preprocessor lines, and matched `{}`/`()`
//! pairs. Matched pairs are colored by nesting depth from a rotating
//! five-color palette, bold on alternating cycles; mismatched closers get
//! the bad-parse styling. Block comments and open brackets survive across
//! lines through the state stack, so the per-line cache stays valid.

use std::collections::HashSet;

use rill_core::style::{
  Style,
  StyleSet,
};

use super::parser::{
  Action,
  LineParser,
  ParseResults,
  ParserState,
};
use crate::line::Line;

const DEFAULT_AT_START_OF_LINE: ParserState = 0;
const DEFAULT: ParserState = 1;
const AFTER_SLASH: ParserState = 2;
const COMMENT: ParserState = 3;
const BRACKET_DEFAULT_AT_START_OF_LINE: ParserState = 4;
const BRACKET_DEFAULT: ParserState = 5;
const BRACKET_AFTER_SLASH: ParserState = 6;
const PARENS_DEFAULT_AT_START_OF_LINE: ParserState = 7;
const PARENS_DEFAULT: ParserState = 8;
const PARENS_AFTER_SLASH: ParserState = 9;

fn bad_parse_styles() -> StyleSet {
  StyleSet::of(Style::BgRed).with(Style::Bold)
}

fn nesting_styles(nesting: usize) -> StyleSet {
  let palette = [
    Style::Cyan,
    Style::Yellow,
    Style::Red,
    Style::Blue,
    Style::Green,
  ];
  let mut styles = StyleSet::of(palette[nesting % palette.len()]);
  if (nesting / palette.len()) % 2 == 0 {
    styles.insert(Style::Bold);
  }
  styles
}

fn is_identifier_start(ch: char) -> bool {
  ch == '_' || ch.is_ascii_alphabetic()
}

fn is_identifier_continuation(ch: char) -> bool {
  ch == '_' || ch.is_ascii_alphanumeric()
}

pub struct ClassicParser {
  keywords: HashSet<String>,
}

impl ClassicParser {
  pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
    Self {
      keywords: keywords.into_iter().collect(),
    }
  }

  pub fn with_default_keywords() -> Self {
    const KEYWORDS: &[&str] = &[
      "auto", "break", "case", "catch", "class", "const", "continue", "default", "delete", "do",
      "double", "else", "enum", "extern", "false", "float", "for", "if", "int", "long",
      "namespace", "new", "nullptr", "operator", "private", "public", "return", "short",
      "signed", "sizeof", "static", "struct", "switch", "template", "this", "throw", "true",
      "try", "typedef", "typename", "union", "unsigned", "using", "virtual", "void", "while",
    ];
    Self::new(KEYWORDS.iter().map(|keyword| keyword.to_string()))
  }
}

impl LineParser for ClassicParser {
  fn initial_stack(&self) -> Vec<ParserState> {
    vec![DEFAULT_AT_START_OF_LINE]
  }

  fn parse_line(&self, line: &Line, state_stack: &[ParserState]) -> ParseResults {
    let mut scan = LineScan {
      chars:   line.contents().chars().collect(),
      pos:     0,
      stack:   state_stack.to_vec(),
      actions: Vec::new(),
      parser:  self,
    };
    while !scan.at_end() {
      match scan.state() {
        DEFAULT_AT_START_OF_LINE => {
          scan.default_state(DEFAULT, DEFAULT_AT_START_OF_LINE, AFTER_SLASH, true);
        },
        BRACKET_DEFAULT_AT_START_OF_LINE => {
          scan.default_state(
            BRACKET_DEFAULT,
            BRACKET_DEFAULT_AT_START_OF_LINE,
            BRACKET_AFTER_SLASH,
            true,
          );
        },
        PARENS_DEFAULT_AT_START_OF_LINE => {
          scan.default_state(
            PARENS_DEFAULT,
            PARENS_DEFAULT_AT_START_OF_LINE,
            PARENS_AFTER_SLASH,
            true,
          );
        },
        DEFAULT => {
          scan.default_state(DEFAULT, DEFAULT_AT_START_OF_LINE, AFTER_SLASH, false);
        },
        BRACKET_DEFAULT => {
          scan.default_state(
            BRACKET_DEFAULT,
            BRACKET_DEFAULT_AT_START_OF_LINE,
            BRACKET_AFTER_SLASH,
            false,
          );
        },
        PARENS_DEFAULT => {
          scan.default_state(
            PARENS_DEFAULT,
            PARENS_DEFAULT_AT_START_OF_LINE,
            PARENS_AFTER_SLASH,
            false,
          );
        },
        AFTER_SLASH => scan.after_slash(DEFAULT, DEFAULT_AT_START_OF_LINE),
        BRACKET_AFTER_SLASH => {
          scan.after_slash(BRACKET_DEFAULT, BRACKET_DEFAULT_AT_START_OF_LINE);
        },
        PARENS_AFTER_SLASH => {
          scan.after_slash(PARENS_DEFAULT, PARENS_DEFAULT_AT_START_OF_LINE);
        },
        COMMENT => scan.inside_comment(),
        state => unreachable!("unknown scanner state {state}"),
      }
    }
    ParseResults {
      state_stack: scan.stack,
      actions:     scan.actions,
    }
  }
}

struct LineScan<'a> {
  chars:   Vec<char>,
  /// Column of the next unread character; `chars.len()` is the implicit
  /// newline.
  pos:     usize,
  stack:   Vec<ParserState>,
  actions: Vec<Action>,
  parser:  &'a ClassicParser,
}

impl LineScan<'_> {
  fn at_end(&self) -> bool {
    self.pos > self.chars.len()
  }

  fn read(&self) -> char {
    self.chars.get(self.pos).copied().unwrap_or('\n')
  }

  fn advance(&mut self) {
    self.pos += 1;
  }

  fn state(&self) -> ParserState {
    *self.stack.last().expect("state stack never empty")
  }

  fn set_state(&mut self, state: ParserState) {
    *self.stack.last_mut().expect("state stack never empty") = state;
  }

  fn push(&mut self, nested_state: ParserState, rewind: usize, styles: StyleSet) {
    self.stack.push(nested_state);
    self.actions.push(Action::Push {
      column: self.pos - rewind,
      styles,
    });
  }

  fn pop(&mut self) {
    self.stack.pop();
    self.actions.push(Action::Pop {
      column: self.pos.min(self.chars.len()),
    });
  }

  /// A leaf child covering the last `rewind` characters.
  fn push_and_pop(&mut self, rewind: usize, styles: StyleSet) {
    self.actions.push(Action::Push {
      column: self.pos - rewind,
      styles,
    });
    self.actions.push(Action::Pop {
      column: self.pos.min(self.chars.len()),
    });
  }

  fn set_first_child_styles(&mut self, styles: StyleSet) {
    self.actions.push(Action::SetFirstChildStyles { styles });
  }

  fn default_state(
    &mut self,
    state_default: ParserState,
    state_default_at_start_of_line: ParserState,
    state_after_slash: ParserState,
    after_newline: bool,
  ) {
    self.set_state(state_default);
    while matches!(self.read(), ' ' | '\t') {
      self.advance();
    }

    let ch = self.read();
    self.advance();

    if ch == '\n' {
      self.set_state(state_default_at_start_of_line);
      return;
    }
    if after_newline && ch == '#' {
      self.preprocessor_directive(state_default_at_start_of_line);
      return;
    }
    if is_identifier_start(ch) {
      self.identifier();
      return;
    }
    if ch == '/' {
      self.set_state(state_after_slash);
      return;
    }
    if ch == '"' {
      self.literal_string();
      return;
    }
    if ch == '\'' {
      self.literal_character();
      return;
    }
    if ch == '{' || ch == '(' {
      let nested = if ch == '{' {
        BRACKET_DEFAULT
      } else {
        PARENS_DEFAULT
      };
      self.push(nested, 1, StyleSet::empty());
      self.push_and_pop(1, bad_parse_styles());
      return;
    }
    if ch == '}' || ch == ')' {
      let matches_state = (ch == '}' && state_default == BRACKET_DEFAULT)
        || (ch == ')' && state_default == PARENS_DEFAULT);
      if matches_state {
        let styles = nesting_styles(self.stack.len() - 1);
        self.push_and_pop(1, styles);
        self.set_first_child_styles(styles);
        self.pop();
      } else {
        self.push_and_pop(1, bad_parse_styles());
      }
      return;
    }
    if ch.is_ascii_digit() {
      self.literal_number();
    }
  }

  fn after_slash(&mut self, state_default: ParserState, state_default_at_start_of_line: ParserState) {
    match self.read() {
      '/' => {
        self.set_state(state_default_at_start_of_line);
        self.comment_to_end_of_line();
      },
      '*' => {
        self.push(COMMENT, 1, StyleSet::of(Style::Blue));
        self.advance();
      },
      _ => self.set_state(state_default),
    }
  }

  fn comment_to_end_of_line(&mut self) {
    // `pos` sits on the second slash; the node starts at the first.
    let start = self.pos - 1;
    self.pos = self.chars.len();
    self.push_and_pop(self.pos - start, StyleSet::of(Style::Blue));
  }

  fn inside_comment(&mut self) {
    let ch = self.read();
    self.advance();
    if ch == '*' && self.read() == '/' {
      self.advance();
      self.pop();
    }
  }

  fn literal_character(&mut self) {
    let original_pos = self.pos;
    let mut rewind = 1;
    if self.read() == '\\' {
      self.advance();
      rewind += 1;
    }
    self.advance();
    rewind += 1;
    if self.read() == '\'' {
      self.advance();
      rewind += 1;
      self.push_and_pop(rewind, StyleSet::of(Style::Yellow));
    } else {
      self.pos = original_pos;
      self.push_and_pop(1, bad_parse_styles());
    }
  }

  fn literal_string(&mut self) {
    let original_pos = self.pos;
    while self.read() != '"' && self.read() != '\n' {
      if self.read() == '\\' {
        self.advance();
      }
      self.advance();
    }
    if self.read() == '"' {
      self.advance();
      self.push_and_pop(self.pos - original_pos + 1, StyleSet::of(Style::Yellow));
    } else {
      self.pos = original_pos;
      self.push_and_pop(1, bad_parse_styles());
    }
  }

  fn preprocessor_directive(&mut self, state_default_at_start_of_line: ParserState) {
    self.set_state(state_default_at_start_of_line);
    let start = self.pos - 1;
    self.pos = self.chars.len();
    self.push_and_pop(self.pos - start, StyleSet::of(Style::Yellow));
  }

  fn identifier(&mut self) {
    let start = self.pos - 1;
    while is_identifier_continuation(self.read()) {
      self.advance();
    }
    let word: String = self.chars[start..self.pos].iter().collect();
    let styles = if self.parser.keywords.contains(&word) {
      StyleSet::of(Style::Cyan)
    } else {
      StyleSet::empty()
    };
    self.push_and_pop(self.pos - start, styles);
  }

  fn literal_number(&mut self) {
    let start = self.pos - 1;
    while self.read().is_ascii_digit() {
      self.advance();
    }
    self.push_and_pop(self.pos - start, StyleSet::of(Style::Yellow));
  }
}

#[cfg(test)]
mod test {
  use rill_core::position::LineColumn;

  use super::*;
  use crate::parse::TreeBuilder;

  fn parse_lines(parser: &ClassicParser, lines: &[&str]) -> super::super::tree::ParseTree {
    let mut stack = parser.initial_stack();
    let mut builder = TreeBuilder::new(LineColumn::zero());
    for (line_number, text) in lines.iter().enumerate() {
      let results = parser.parse_line(&Line::from(*text), &stack);
      builder.apply_actions(line_number, &results.actions);
      stack = results.state_stack;
    }
    let last = lines.len().saturating_sub(1);
    builder.finish(LineColumn::new(last, lines.last().map_or(0, |l| l.len())))
  }

  #[test]
  fn keyword_and_identifier_styling() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["int x;"]);
    assert_eq!(tree.children().len(), 2);
    assert_eq!(tree.children()[0].styles(), StyleSet::of(Style::Cyan));
    assert_eq!(tree.children()[1].styles(), StyleSet::empty());
  }

  #[test]
  fn line_comment_spans_to_end() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["x // trailing"]);
    let comment = tree.children().last().unwrap();
    assert_eq!(comment.styles(), StyleSet::of(Style::Blue));
    assert_eq!(comment.range().begin, LineColumn::new(0, 2));
    assert_eq!(comment.range().end, LineColumn::new(0, 13));
  }

  #[test]
  fn block_comment_survives_lines_via_stack() {
    let parser = ClassicParser::with_default_keywords();
    let line = Line::from("before /* open");
    let results = parser.parse_line(&line, &parser.initial_stack());
    assert_eq!(*results.state_stack.last().unwrap(), COMMENT);

    let closing = parser.parse_line(&Line::from("still */ after"), &results.state_stack);
    assert_eq!(
      *closing.state_stack.last().unwrap(),
      DEFAULT_AT_START_OF_LINE
    );

    let tree = parse_lines(&parser, &["before /* open", "still */ after"]);
    let comment = tree
      .children()
      .iter()
      .find(|child| child.styles() == StyleSet::of(Style::Blue))
      .unwrap();
    assert_eq!(comment.range().begin, LineColumn::new(0, 7));
    assert_eq!(comment.range().end, LineColumn::new(1, 8));
  }

  #[test]
  fn matched_pair_gets_nesting_styles() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["(x)"]);
    let region = &tree.children()[0];
    let expected = nesting_styles(1);
    assert_eq!(region.children().first().unwrap().styles(), expected);
    assert_eq!(region.children().last().unwrap().styles(), expected);
  }

  #[test]
  fn mismatched_closer_is_bad_parse() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["}"]);
    assert_eq!(tree.children()[0].styles(), bad_parse_styles());
  }

  #[test]
  fn unterminated_string_marks_quote() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["\"oops"]);
    let bad = &tree.children()[0];
    assert_eq!(bad.styles(), bad_parse_styles());
    assert_eq!(bad.range().begin, LineColumn::new(0, 0));
    assert_eq!(bad.range().end, LineColumn::new(0, 1));
  }

  #[test]
  fn string_literal_is_yellow() {
    let parser = ClassicParser::with_default_keywords();
    let tree = parse_lines(&parser, &["\"ok\" 42"]);
    assert_eq!(tree.children()[0].styles(), StyleSet::of(Style::Yellow));
    assert_eq!(tree.children()[1].styles(), StyleSet::of(Style::Yellow));
  }

  #[test]
  fn output_is_deterministic() {
    // Identical line and identical inbound stack: bitwise-equal results.
    let parser = ClassicParser::with_default_keywords();
    let line = Line::from("if (a) { return \"x\"; } /* tail");
    let stack = parser.initial_stack();
    let first = parser.parse_line(&line, &stack);
    let second = parser.parse_line(&line, &stack);
    assert_eq!(first, second);
  }
}
