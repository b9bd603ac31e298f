//! Command-line surface.
//!
//! Only the flags the front-end itself consumes are declared here;
//! anything after `--` is forwarded untouched to the embedded command
//! evaluator collaborator.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rill", about = "A modal terminal text editor")]
pub struct Cli {
  /// Files to open, one buffer each.
  pub files: Vec<PathBuf>,

  /// Increase logging verbosity (repeat for more detail).
  #[arg(short = 'v', action = clap::ArgAction::Count)]
  pub verbosity: u8,

  /// Write logs to this file instead of stderr.
  #[arg(long = "log", value_name = "FILE")]
  pub log_file: Option<PathBuf>,

  /// Load configuration from a specific file.
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  pub config_file: Option<PathBuf>,

  /// Run as a detached server (ignore SIGHUP).
  #[arg(long = "detached")]
  pub detached: bool,

  /// Render one frame of the given size (ROWSxCOLS) to stdout and exit.
  #[arg(long = "render-once", value_name = "SIZE")]
  pub render_once: Option<String>,

  /// Arguments forwarded to the command evaluator.
  #[arg(last = true)]
  pub forwarded: Vec<String>,
}

impl Cli {
  pub fn frame_size(&self) -> Option<(usize, usize)> {
    let spec = self.render_once.as_deref()?;
    let (rows, cols) = spec.split_once('x')?;
    Some((rows.parse().ok()?, cols.parse().ok()?))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_files_and_flags() {
    let cli = Cli::parse_from(["rill", "-vv", "--detached", "a.txt", "b.txt"]);
    assert_eq!(cli.verbosity, 2);
    assert!(cli.detached);
    assert_eq!(cli.files.len(), 2);
  }

  #[test]
  fn forwarded_arguments_pass_through() {
    let cli = Cli::parse_from(["rill", "a.txt", "--", "--weird-flag", "x"]);
    assert_eq!(cli.forwarded, vec!["--weird-flag", "x"]);
  }

  #[test]
  fn frame_size_parses() {
    let cli = Cli::parse_from(["rill", "--render-once", "24x80"]);
    assert_eq!(cli.frame_size(), Some((24, 80)));
  }
}
