//! One-shot cancellation flags.

use std::sync::{
  Arc,
  atomic::{
    AtomicBool,
    Ordering,
  },
};

/// A flag that transitions to "notified" exactly once and can be queried
/// from any thread. Long-running async work receives one of these and must
/// short-circuit at its next I/O boundary once it fires.
#[derive(Debug, Clone, Default)]
pub struct Notification {
  flag: Arc<AtomicBool>,
}

impl Notification {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn notify(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn has_been_notified(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn clones_share_the_flag() {
    let notification = Notification::new();
    let observer = notification.clone();
    assert!(!observer.has_been_notified());
    notification.notify();
    assert!(observer.has_been_notified());
  }
}
