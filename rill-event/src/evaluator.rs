//! Background evaluator for filesystem and search work.
//!
//! One [`AsyncEvaluator`] owns one worker thread consuming jobs from a
//! bounded mailbox. Results never reach the caller from the worker
//! directly: the worker hands the finished value to the work queue, and
//! the main thread resolves the job's future on its next drain. This keeps
//! every future consumer on the main thread.

use std::thread::JoinHandle;

use crossbeam_channel::{
  Receiver,
  Sender,
  bounded,
};
use tracing::debug;

use crate::{
  future::{
    Value,
    channel,
  },
  work_queue::WorkQueue,
};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct AsyncEvaluator {
  sender: Option<Sender<Job>>,
  worker: Option<JoinHandle<()>>,
  queue:  WorkQueue,
}

impl AsyncEvaluator {
  /// Spawns the worker thread. `capacity` bounds the mailbox; callers
  /// block once it fills up.
  pub fn new(name: &str, queue: WorkQueue, capacity: usize) -> Self {
    let (sender, receiver): (Sender<Job>, Receiver<Job>) = bounded(capacity);
    let thread_name = format!("evaluator:{name}");
    let worker = std::thread::Builder::new()
      .name(thread_name.clone())
      .spawn(move || {
        for job in receiver {
          job();
        }
        debug!(worker = %thread_name, "evaluator worker exiting");
      })
      .expect("spawn evaluator worker");
    Self {
      sender: Some(sender),
      worker: Some(worker),
      queue,
    }
  }

  /// Submits a job; the returned future resolves on the main thread after
  /// a subsequent work-queue drain.
  pub fn run<T, F>(&self, job: F) -> Value<T>
  where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
  {
    let (producer, value) = channel();
    let queue = self.queue.clone();
    let boxed: Job = Box::new(move || {
      let result = job();
      queue.schedule(move || producer.produce(result));
    });
    self
      .sender
      .as_ref()
      .expect("evaluator mailbox open")
      .send(boxed)
      .expect("evaluator worker alive");
    value
  }
}

impl Drop for AsyncEvaluator {
  fn drop(&mut self) {
    self.sender.take();
    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{
      Arc,
      atomic::{
        AtomicBool,
        Ordering,
      },
    },
    time::{
      Duration,
      Instant,
    },
  };

  use super::*;

  fn drain_until(queue: &WorkQueue, done: &Arc<AtomicBool>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done.load(Ordering::SeqCst) {
      queue.execute(Instant::now());
      assert!(Instant::now() < deadline, "evaluator result never arrived");
      std::thread::yield_now();
    }
  }

  #[test]
  fn result_arrives_through_the_work_queue() {
    let queue = WorkQueue::new();
    let evaluator = AsyncEvaluator::new("test", queue.clone(), 4);
    let done = Arc::new(AtomicBool::new(false));

    let observed = done.clone();
    evaluator.run(|| 6 * 7).set_consumer(move |result| {
      assert_eq!(result, 42);
      observed.store(true, Ordering::SeqCst);
    });

    drain_until(&queue, &done);
  }

  #[test]
  fn jobs_complete_in_submission_order() {
    let queue = WorkQueue::new();
    let evaluator = AsyncEvaluator::new("ordered", queue.clone(), 16);
    let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let done = Arc::new(AtomicBool::new(false));

    for i in 0..5 {
      let log = log.clone();
      let done = done.clone();
      evaluator.run(move || i).set_consumer(move |i| {
        log.lock().push(i);
        if i == 4 {
          done.store(true, Ordering::SeqCst);
        }
      });
    }

    drain_until(&queue, &done);
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn drop_joins_the_worker() {
    let queue = WorkQueue::new();
    let evaluator = AsyncEvaluator::new("short-lived", queue.clone(), 1);
    let _ = evaluator.run(|| ());
    drop(evaluator);
    queue.execute(Instant::now());
  }
}
