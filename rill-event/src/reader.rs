//! Non-blocking reads from file descriptors and subprocess pipes.
//!
//! A [`FdReader`] owns one fd in non-blocking mode and accumulates bytes
//! until complete lines appear. The trailing incomplete segment stays in
//! the accumulator across reads. Reading `0` bytes means end-of-file: the
//! accumulator is flushed and shrunk, and the caller drops the reader
//! (closing the fd) exactly once.

use std::{
  io::Read,
  os::fd::{
    AsRawFd,
    BorrowedFd,
    OwnedFd,
    RawFd,
  },
  time::Duration,
};

use nix::{
  fcntl::{
    FcntlArg,
    OFlag,
    fcntl,
  },
  poll::{
    PollFd,
    PollFlags,
    PollTimeout,
    poll,
  },
};
use thiserror::Error;

/// Initial accumulator capacity; doubles whenever a read fills it.
pub const INITIAL_CHUNK_BYTES: usize = 64 * 1024;

pub type Result<T> = std::result::Result<T, ReadError>;

#[derive(Debug, Error)]
pub enum ReadError {
  #[error("fd read failed: {0}")]
  Io(#[from] std::io::Error),
}

/// What one [`FdReader::read_available`] call observed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReadOutcome {
  /// Completed lines, without their newline byte.
  pub lines:    Vec<Vec<u8>>,
  /// End-of-file was reached.
  pub eof:      bool,
  /// Bytes after the last newline when EOF was reached.
  pub trailing: Option<Vec<u8>>,
}

pub struct FdReader {
  file:       std::fs::File,
  pending:    Vec<u8>,
  chunk_size: usize,
}

impl FdReader {
  /// Takes ownership of `fd` and switches it to non-blocking mode.
  pub fn new(fd: OwnedFd) -> Result<Self> {
    let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL).map_err(io_error)?;
    let flags = OFlag::from_bits_retain(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags)).map_err(io_error)?;
    Ok(Self {
      file:       std::fs::File::from(fd),
      pending:    Vec::new(),
      chunk_size: INITIAL_CHUNK_BYTES,
    })
  }

  pub fn raw_fd(&self) -> RawFd {
    self.file.as_raw_fd()
  }

  /// Bytes accumulated past the last complete line.
  pub fn pending_len(&self) -> usize {
    self.pending.len()
  }

  /// Drains everything currently readable. `EAGAIN` terminates the drain;
  /// it is not an error.
  pub fn read_available(&mut self) -> Result<ReadOutcome> {
    let mut outcome = ReadOutcome::default();
    loop {
      let mut chunk = vec![0_u8; self.chunk_size];
      match self.file.read(&mut chunk) {
        Ok(0) => {
          outcome.eof = true;
          if !self.pending.is_empty() {
            outcome.trailing = Some(std::mem::take(&mut self.pending));
          }
          self.pending.shrink_to_fit();
          return Ok(outcome);
        },
        Ok(read) => {
          let filled = read == chunk.len();
          self.accumulate(&chunk[..read], &mut outcome.lines);
          if filled {
            self.chunk_size *= 2;
          }
        },
        Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
          return Ok(outcome);
        },
        Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {},
        Err(error) => return Err(error.into()),
      }
    }
  }

  fn accumulate(&mut self, chunk: &[u8], lines: &mut Vec<Vec<u8>>) {
    for byte in chunk {
      if *byte == b'\n' {
        lines.push(std::mem::take(&mut self.pending));
      } else {
        self.pending.push(*byte);
      }
    }
  }
}

fn io_error(errno: nix::errno::Errno) -> std::io::Error {
  std::io::Error::from_raw_os_error(errno as i32)
}

/// Polls the given fds for readability. Returns one flag per fd; an
/// interrupted poll reports nothing readable. `None` timeout blocks until
/// an fd becomes ready.
pub fn wait_readable(fds: &[RawFd], timeout: Option<Duration>) -> Result<Vec<bool>> {
  let borrowed: Vec<BorrowedFd<'_>> = fds
    .iter()
    .map(|fd| unsafe { BorrowedFd::borrow_raw(*fd) })
    .collect();
  let mut poll_fds: Vec<PollFd<'_>> = borrowed
    .iter()
    .map(|fd| PollFd::new(*fd, PollFlags::POLLIN))
    .collect();
  let timeout: PollTimeout = match timeout {
    None => PollTimeout::NONE,
    Some(duration) => u16::try_from(duration.as_millis()).unwrap_or(u16::MAX).into(),
  };
  match poll(&mut poll_fds, timeout) {
    Ok(_) => {},
    Err(nix::errno::Errno::EINTR) => return Ok(vec![false; fds.len()]),
    Err(errno) => return Err(io_error(errno).into()),
  }
  Ok(
    poll_fds
      .iter()
      .map(|fd| {
        fd.revents().is_some_and(|revents| {
          revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
        })
      })
      .collect(),
  )
}

#[cfg(test)]
mod test {
  use std::io::Write;

  use super::*;

  fn pipe_pair() -> (FdReader, std::fs::File) {
    let (read_end, write_end) = nix::unistd::pipe().expect("pipe");
    let reader = FdReader::new(read_end).expect("reader");
    (reader, std::fs::File::from(write_end))
  }

  #[test]
  fn partial_line_waits_for_completion() {
    let (mut reader, mut writer) = pipe_pair();

    writer.write_all(b"abc\nde").unwrap();
    let outcome = reader.read_available().unwrap();
    assert_eq!(outcome.lines, vec![b"abc".to_vec()]);
    assert!(!outcome.eof);
    assert_eq!(reader.pending_len(), 2);

    writer.write_all(b"f\n").unwrap();
    let outcome = reader.read_available().unwrap();
    assert_eq!(outcome.lines, vec![b"def".to_vec()]);
    assert!(!outcome.eof);
    assert_eq!(reader.pending_len(), 0);
  }

  #[test]
  fn empty_pipe_would_block() {
    let (mut reader, _writer) = pipe_pair();
    let outcome = reader.read_available().unwrap();
    assert_eq!(outcome, ReadOutcome::default());
  }

  #[test]
  fn eof_flushes_trailing_bytes() {
    let (mut reader, mut writer) = pipe_pair();
    writer.write_all(b"one\ntail").unwrap();
    drop(writer);

    let outcome = reader.read_available().unwrap();
    assert_eq!(outcome.lines, vec![b"one".to_vec()]);
    assert!(outcome.eof);
    assert_eq!(outcome.trailing, Some(b"tail".to_vec()));
    assert_eq!(reader.pending_len(), 0);
  }

  #[test]
  fn poll_reports_readable_pipe() {
    let (reader, mut writer) = pipe_pair();
    let ready = wait_readable(&[reader.raw_fd()], Some(Duration::from_millis(0))).unwrap();
    assert_eq!(ready, vec![false]);

    writer.write_all(b"x").unwrap();
    let ready = wait_readable(&[reader.raw_fd()], Some(Duration::from_millis(100))).unwrap();
    assert_eq!(ready, vec![true]);
  }
}
