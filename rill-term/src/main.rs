//! Terminal front-end wiring for the rill editor core.
//!
//! This binary owns everything the core treats as a collaborator: CLI
//! parsing, config loading, logging, signal installation, and the
//! poll-based main loop that feeds keycodes and fd data into the editor.
//! Rendering stays behind the line-producer protocol; `--render-once`
//! drives it against stdout for smoke runs.

mod cli;
mod config;
mod input;

use std::{
  io::Read,
  os::fd::RawFd,
  sync::Arc,
  time::{
    Duration,
    Instant,
  },
};

use anyhow::Context;
use clap::Parser;
use rill_event::{
  reader::wait_readable,
  signal::SignalQueue,
  work_queue::WorkQueue,
};
use rill_lib::{
  editor::{
    Editor,
    EditorOptions,
  },
  history_file::{
    self,
    ConfigPaths,
  },
  output::{
    CursorBehavior,
    OutputOptions,
  },
};
use tracing::{
  debug,
  info,
};

use crate::{
  cli::Cli,
  config::Config,
  input::KeyDecoder,
};

const STDIN_FD: RawFd = 0;
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

fn init_logging(verbosity: u8, log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
  use tracing_subscriber::EnvFilter;

  let default_level = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_level));

  match log_file {
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    },
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    },
  }
  Ok(())
}

fn render_frame(editor: &Editor, rows: usize, cols: usize) {
  let mut producer = editor.create_output_producer(rows, cols);
  let options = OutputOptions {
    width:                  cols,
    active_cursor_behavior: CursorBehavior::Show,
  };
  for _ in 0..rows {
    let row = producer.next_line(&options);
    println!("{}", row.line);
  }
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbosity, cli.log_file.as_deref())?;

  let config_paths = ConfigPaths::from_env();
  let config = Config::load(&config_paths, cli.config_file.as_deref())?;
  if let Some(address) = history_file::server_address() {
    info!(%address, "forwarding server address to the client collaborator");
  }

  let work_queue = WorkQueue::new();
  let mut editor = Editor::new(EditorOptions {
    config_paths: config_paths.clone(),
    work_queue: work_queue.clone(),
    detached: cli.detached,
    ..EditorOptions::default()
  });
  if !cli.forwarded.is_empty() {
    debug!(arguments = ?cli.forwarded, "forwarding arguments to the command evaluator");
  }

  for path in &cli.files {
    let text = std::fs::read_to_string(path)
      .with_context(|| format!("reading {}", path.display()))?;
    let name = path.to_string_lossy().into_owned();
    editor.open_buffer(name.as_str(), &text);
    if let Some(buffer) = editor.buffer_mut(&name) {
      config.apply_to_buffer(buffer);
    }
  }

  if let Some((rows, cols)) = cli.frame_size() {
    render_frame(&editor, rows, cols);
    return Ok(());
  }

  let signals = SignalQueue::install()?;
  let mut decoder = KeyDecoder::new();
  let mut stdin = std::io::stdin().lock();
  let mut chunk = [0_u8; 4096];

  loop {
    if let Some(code) = editor.terminate_requested() {
      info!(code, "terminating");
      std::process::exit(code);
    }

    for signal in signals.drain() {
      editor.process_signal(signal);
    }

    work_queue.execute(Instant::now());
    editor.pump_completions();

    let buffer_fds = editor.buffer_fds();
    let mut fds = vec![STDIN_FD];
    fds.extend(buffer_fds.iter().map(|(_, fd)| *fd));

    let timeout = match work_queue.next_deadline() {
      None => DEFAULT_POLL_TIMEOUT,
      Some(deadline) => {
        deadline
          .saturating_duration_since(Instant::now())
          .min(DEFAULT_POLL_TIMEOUT)
      },
    };

    let ready = wait_readable(&fds, Some(timeout))?;

    if ready.first().copied().unwrap_or(false) {
      match stdin.read(&mut chunk) {
        Ok(0) => {
          debug!("stdin closed");
          break;
        },
        Ok(read) => {
          for key in decoder.push_bytes(&chunk[..read]) {
            editor.process_input(key);
          }
        },
        Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {},
        Err(error) => return Err(error).context("reading stdin"),
      }
    }

    for (index, (name, _)) in buffer_fds.iter().enumerate() {
      if ready.get(index + 1).copied().unwrap_or(false) {
        editor.read_buffer_data(name);
      }
    }
  }

  Ok(())
}
