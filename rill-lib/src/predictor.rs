//! Async completion sources for interactive prompts.
//!
//! A predictor receives the current query plus a cancellation
//! [`Notification`] and resolves a future with sorted matches, their
//! longest common prefix, and whether the query itself matched exactly.
//! Cancelled work still resolves, flagged `cancelled`, so prompt state
//! machines can unwind.

use std::{
  path::PathBuf,
  sync::Arc,
};

use rill_event::{
  evaluator::AsyncEvaluator,
  future::{
    Value,
    past,
  },
  notification::Notification,
};

use crate::{
  Tendril,
  contents::Contents,
};

#[derive(Debug, Clone)]
pub struct PredictorInput {
  pub query:  Tendril,
  pub cancel: Notification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictResults {
  pub matches:           Vec<Tendril>,
  pub common_prefix:     Option<Tendril>,
  pub found_exact_match: bool,
  pub cancelled:         bool,
}

impl PredictResults {
  fn cancelled() -> Self {
    Self {
      cancelled: true,
      ..Self::default()
    }
  }

  fn from_matches(query: &str, mut matches: Vec<Tendril>) -> Self {
    matches.sort();
    matches.dedup();
    let found_exact_match = matches.iter().any(|m| m == query);
    let common_prefix = common_prefix(&matches);
    Self {
      matches,
      common_prefix,
      found_exact_match,
      cancelled: false,
    }
  }
}

fn common_prefix(values: &[Tendril]) -> Option<Tendril> {
  let first = values.first()?;
  let mut prefix: &str = first;
  for value in &values[1..] {
    let shared_bytes: usize = prefix
      .chars()
      .zip(value.chars())
      .take_while(|(a, b)| a == b)
      .map(|(a, _)| a.len_utf8())
      .sum();
    prefix = &prefix[..shared_bytes];
  }
  Some(prefix.into())
}

/// The closed set of suggestion sources the prompts use.
pub enum Predictor {
  /// Filesystem completion rooted at the given search paths.
  File { search_paths: Vec<PathBuf> },
  /// A sorted word list (e.g. a dictionary file loaded at startup).
  Dictionary { words: Arc<Vec<Tendril>> },
  /// A fixed set of values (e.g. variable names).
  Precomputed { values: Arc<Vec<Tendril>> },
  /// Words appearing in a buffer snapshot.
  Syntax { contents: Contents },
}

impl Predictor {
  /// Produces predictions for `input`. Filesystem and syntax sources run
  /// on the evaluator; the rest resolve immediately.
  pub fn predict(&self, evaluator: &AsyncEvaluator, input: PredictorInput) -> Value<PredictResults> {
    match self {
      Predictor::File { search_paths } => {
        let search_paths = search_paths.clone();
        evaluator.run(move || predict_files(&search_paths, &input))
      },
      Predictor::Dictionary { words } | Predictor::Precomputed { values: words } => {
        if input.cancel.has_been_notified() {
          return past(PredictResults::cancelled());
        }
        let matches = words
          .iter()
          .filter(|word| word.starts_with(input.query.as_str()))
          .cloned()
          .collect();
        past(PredictResults::from_matches(&input.query, matches))
      },
      Predictor::Syntax { contents } => {
        let contents = contents.snapshot();
        evaluator.run(move || predict_syntax(&contents, &input))
      },
    }
  }
}

fn predict_files(search_paths: &[PathBuf], input: &PredictorInput) -> PredictResults {
  let query = PathBuf::from(input.query.as_str());
  let (directory, prefix) = match input.query.chars().last() {
    Some('/') => (query.clone(), String::new()),
    _ => {
      (
        query.parent().map(PathBuf::from).unwrap_or_default(),
        query
          .file_name()
          .map(|name| name.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    },
  };

  let mut matches = Vec::new();
  for root in search_paths {
    if input.cancel.has_been_notified() {
      return PredictResults::cancelled();
    }
    let base = if directory.as_os_str().is_empty() {
      root.clone()
    } else if directory.is_absolute() {
      directory.clone()
    } else {
      root.join(&directory)
    };
    let entries = match std::fs::read_dir(&base) {
      Ok(entries) => entries,
      Err(_) => continue,
    };
    for entry in entries.flatten() {
      if input.cancel.has_been_notified() {
        return PredictResults::cancelled();
      }
      let name = entry.file_name().to_string_lossy().into_owned();
      if !name.starts_with(&prefix) {
        continue;
      }
      let mut completed = directory.join(&name).to_string_lossy().into_owned();
      if entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
        completed.push('/');
      }
      matches.push(Tendril::from(completed));
    }
    if directory.is_absolute() {
      break;
    }
  }
  PredictResults::from_matches(&input.query, matches)
}

fn predict_syntax(contents: &Contents, input: &PredictorInput) -> PredictResults {
  let mut matches = Vec::new();
  let done = contents.every_line(|_, line| {
    if input.cancel.has_been_notified() {
      return false;
    }
    let mut word = String::new();
    for ch in line.contents().chars().chain(std::iter::once(' ')) {
      if ch == '_' || ch.is_alphanumeric() {
        word.push(ch);
      } else if !word.is_empty() {
        if word.starts_with(input.query.as_str()) {
          matches.push(Tendril::from(word.as_str()));
        }
        word.clear();
      }
    }
    true
  });
  if !done {
    return PredictResults::cancelled();
  }
  PredictResults::from_matches(&input.query, matches)
}
