//! TOML configuration loaded from the config search paths.

use std::path::{
  Path,
  PathBuf,
};

use anyhow::Context;
use rill_lib::history_file::ConfigPaths;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Overrides for buffer variables, applied to every new buffer.
  pub lines_per_page:  Option<i64>,
  pub undo_limit:      Option<i64>,
  pub word_characters: Option<String>,
  /// Optional dictionary file for the dictionary predictor.
  pub dictionary:      Option<PathBuf>,
}

impl Config {
  pub fn load(paths: &ConfigPaths, explicit: Option<&Path>) -> anyhow::Result<Self> {
    let candidate = match explicit {
      Some(path) => Some(path.to_path_buf()),
      None => {
        paths
          .search_paths()
          .iter()
          .map(|path| path.join("rill.toml"))
          .find(|path| path.exists())
      },
    };
    let Some(path) = candidate else {
      return Ok(Self::default());
    };
    let text = std::fs::read_to_string(&path)
      .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
  }

  pub fn apply_to_buffer(&self, buffer: &mut rill_lib::buffer::Buffer) {
    let ids = buffer.variable_ids().clone();
    let variables = buffer.variables_mut();
    if let Some(value) = self.lines_per_page {
      let _ = variables.set_int(ids.lines_per_page, value);
    }
    if let Some(value) = self.undo_limit {
      let _ = variables.set_int(ids.undo_limit, value);
    }
    if let Some(value) = &self.word_characters {
      let _ = variables.set_str(ids.word_characters, value.as_str());
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn missing_config_defaults() {
    let paths = ConfigPaths::new(Vec::new());
    let config = Config::load(&paths, None).unwrap();
    assert!(config.lines_per_page.is_none());
  }

  #[test]
  fn loads_from_search_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("rill.toml"),
      "lines_per_page = 40\nword_characters = \"_-\"\n",
    )
    .unwrap();
    let paths = ConfigPaths::new(vec![dir.path().to_path_buf()]);
    let config = Config::load(&paths, None).unwrap();
    assert_eq!(config.lines_per_page, Some(40));
    assert_eq!(config.word_characters.as_deref(), Some("_-"));
  }

  #[test]
  fn rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rill.toml"), "nope = 1\n").unwrap();
    let paths = ConfigPaths::new(vec![dir.path().to_path_buf()]);
    assert!(Config::load(&paths, None).is_err());
  }
}
