//! Async-signal-safe intake for the signals the editor cares about.
//!
//! The handler only bumps an atomic counter; the main loop drains the
//! counters into [`EditorSignal`] values once per iteration and dispatches
//! them like any other input.

use std::sync::atomic::{
  AtomicUsize,
  Ordering,
};

use nix::{
  libc,
  sys::signal::{
    SaFlags,
    SigAction,
    SigHandler,
    SigSet,
    Signal,
    sigaction,
  },
};
use thiserror::Error;

static PENDING_INTERRUPT: AtomicUsize = AtomicUsize::new(0);
static PENDING_HANGUP: AtomicUsize = AtomicUsize::new(0);
static PENDING_RESIZE: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorSignal {
  /// SIGINT: interrupt whatever the active buffer is running.
  Interrupt,
  /// SIGHUP: ignored by a detached server, fatal otherwise.
  Hangup,
  /// SIGWINCH: the terminal changed size; request a hard redraw.
  WindowResize,
}

#[derive(Debug, Error)]
pub enum SignalError {
  #[error("installing signal handler failed: {0}")]
  Install(nix::errno::Errno),
}

extern "C" fn note_signal(signal: libc::c_int) {
  match signal {
    libc::SIGINT => PENDING_INTERRUPT.fetch_add(1, Ordering::Relaxed),
    libc::SIGHUP => PENDING_HANGUP.fetch_add(1, Ordering::Relaxed),
    libc::SIGWINCH => PENDING_RESIZE.fetch_add(1, Ordering::Relaxed),
    _ => 0,
  };
}

/// Installs the handlers and exposes `drain` for the main loop.
pub struct SignalQueue {
  _private: (),
}

impl SignalQueue {
  pub fn install() -> Result<Self, SignalError> {
    let action = SigAction::new(
      SigHandler::Handler(note_signal),
      SaFlags::SA_RESTART,
      SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGHUP, Signal::SIGWINCH] {
      unsafe { sigaction(signal, &action) }.map_err(SignalError::Install)?;
    }
    Ok(Self { _private: () })
  }

  /// Takes every signal received since the previous drain, in a stable
  /// interrupt/hangup/resize order.
  pub fn drain(&self) -> Vec<EditorSignal> {
    let mut signals = Vec::new();
    for _ in 0..PENDING_INTERRUPT.swap(0, Ordering::Relaxed) {
      signals.push(EditorSignal::Interrupt);
    }
    for _ in 0..PENDING_HANGUP.swap(0, Ordering::Relaxed) {
      signals.push(EditorSignal::Hangup);
    }
    for _ in 0..PENDING_RESIZE.swap(0, Ordering::Relaxed) {
      signals.push(EditorSignal::WindowResize);
    }
    signals
  }
}

/// Forwards SIGINT to a child process (the buffer's subprocess).
pub fn interrupt_child(pid: i32) -> Result<(), SignalError> {
  nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), Signal::SIGINT)
    .map_err(SignalError::Install)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn raise_and_drain_resize() {
    let queue = SignalQueue::install().unwrap();
    let _ = queue.drain();

    nix::sys::signal::raise(Signal::SIGWINCH).unwrap();
    let signals = queue.drain();
    assert_eq!(signals, vec![EditorSignal::WindowResize]);
    assert!(queue.drain().is_empty());
  }
}
