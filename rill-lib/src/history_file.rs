//! Config-directory search paths and per-category prompt history files.
//!
//! History files are plain text, one entry per line, append-only from the
//! core's perspective; deduping and ordering are the prompt's job. The
//! server address is an opaque string read from the environment and
//! forwarded to the client/server collaborator.

use std::{
  io::Write,
  path::PathBuf,
};

pub const PATH_ENVIRONMENT_VARIABLE: &str = "RILL_PATH";
pub const SERVER_ADDRESS_VARIABLE: &str = "RILL_SERVER_ADDRESS";

/// Directories searched for hook scripts and history files, in order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
  search_paths: Vec<PathBuf>,
}

impl ConfigPaths {
  pub fn new(search_paths: Vec<PathBuf>) -> Self {
    Self { search_paths }
  }

  /// `$RILL_PATH` (colon-separated) when set, else `~/.rill`.
  pub fn from_env() -> Self {
    if let Ok(paths) = std::env::var(PATH_ENVIRONMENT_VARIABLE) {
      let search_paths = paths
        .split(':')
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect::<Vec<_>>();
      if !search_paths.is_empty() {
        return Self::new(search_paths);
      }
    }
    let home = std::env::var_os("HOME")
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from("."));
    Self::new(vec![home.join(".rill")])
  }

  pub fn search_paths(&self) -> &[PathBuf] {
    &self.search_paths
  }

  /// Where `category` history lives: the first search path.
  pub fn history_file(&self, category: &str) -> Option<PathBuf> {
    self
      .search_paths
      .first()
      .map(|path| path.join(format!("{category}_history")))
  }

  /// Appends one entry to the category's history file, creating the
  /// directory on first use. Entries with newlines are rejected silently:
  /// one line per entry is the file's only invariant.
  pub fn append_history(&self, category: &str, entry: &str) -> std::io::Result<()> {
    if entry.is_empty() || entry.contains('\n') {
      return Ok(());
    }
    let Some(path) = self.history_file(category) else {
      return Ok(());
    };
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)?;
    writeln!(file, "{entry}")
  }

  pub fn load_history(&self, category: &str) -> Vec<String> {
    let Some(path) = self.history_file(category) else {
      return Vec::new();
    };
    match std::fs::read_to_string(path) {
      Err(_) => Vec::new(),
      Ok(text) => {
        text
          .lines()
          .filter(|line| !line.is_empty())
          .map(String::from)
          .collect()
      },
    }
  }
}

/// The local server endpoint, forwarded opaquely.
pub fn server_address() -> Option<String> {
  std::env::var(SERVER_ADDRESS_VARIABLE).ok()
}
