//! FIFO callback mailbox drained on the main thread.
//!
//! Callbacks land here from anywhere (worker threads, signal dispatch,
//! future continuations) and run on the main thread at well-defined
//! points: once per input-loop iteration, and whenever the editor would
//! otherwise block. A callback may enqueue further callbacks; they run
//! after everything already enqueued.
//!
//! Entries may also carry a scheduled-at timestamp; [`WorkQueue::execute`]
//! moves entries whose time has come into the ready mailbox before
//! draining it, and [`WorkQueue::next_deadline`] tells the main loop how
//! long it may sleep.

use std::{
  collections::{
    BinaryHeap,
    VecDeque,
  },
  sync::Arc,
  time::Instant,
};

use parking_lot::Mutex;

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct ScheduledEntry {
  at:       Instant,
  sequence: u64,
  callback: Callback,
}

impl PartialEq for ScheduledEntry {
  fn eq(&self, other: &Self) -> bool {
    self.at == other.at && self.sequence == other.sequence
  }
}

impl Eq for ScheduledEntry {}

impl PartialOrd for ScheduledEntry {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for ScheduledEntry {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    // Reversed so the BinaryHeap pops the earliest entry first.
    (other.at, other.sequence).cmp(&(self.at, self.sequence))
  }
}

#[derive(Default)]
struct QueueState {
  ready:         VecDeque<Callback>,
  scheduled:     BinaryHeap<ScheduledEntry>,
  next_sequence: u64,
}

/// Cheaply clonable handle; all clones share one mailbox.
#[derive(Clone, Default)]
pub struct WorkQueue {
  state: Arc<Mutex<QueueState>>,
}

impl WorkQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Enqueues a callback to run on the next [`execute`](Self::execute).
  pub fn schedule(&self, callback: impl FnOnce() + Send + 'static) {
    self.state.lock().ready.push_back(Box::new(callback));
  }

  /// Enqueues a callback that becomes ready at `at`.
  pub fn schedule_at(&self, at: Instant, callback: impl FnOnce() + Send + 'static) {
    let mut state = self.state.lock();
    let sequence = state.next_sequence;
    state.next_sequence += 1;
    state.scheduled.push(ScheduledEntry {
      at,
      sequence,
      callback: Box::new(callback),
    });
  }

  /// Runs every ready callback in FIFO order, including callbacks they
  /// enqueue while running. Timed entries due at `now` are promoted first.
  /// Returns the number of callbacks executed.
  pub fn execute(&self, now: Instant) -> usize {
    let mut executed = 0;
    loop {
      let callback = {
        let mut state = self.state.lock();
        while state
          .scheduled
          .peek()
          .is_some_and(|entry| entry.at <= now)
        {
          let entry = state.scheduled.pop().expect("peeked entry");
          state.ready.push_back(entry.callback);
        }
        state.ready.pop_front()
      };
      match callback {
        None => return executed,
        Some(callback) => {
          callback();
          executed += 1;
        },
      }
    }
  }

  /// Whether a callback is ready to run right now.
  pub fn has_ready(&self, now: Instant) -> bool {
    let state = self.state.lock();
    !state.ready.is_empty()
      || state
        .scheduled
        .peek()
        .is_some_and(|entry| entry.at <= now)
  }

  /// The instant of the earliest timed entry, if any.
  pub fn next_deadline(&self) -> Option<Instant> {
    let state = self.state.lock();
    if !state.ready.is_empty() {
      return Some(Instant::now());
    }
    state.scheduled.peek().map(|entry| entry.at)
  }
}
