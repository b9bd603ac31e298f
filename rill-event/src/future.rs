//! One-shot, single-consumer value channels.
//!
//! A [`Value`] carries exactly one `T` from a producer to a consumer.
//! Either side may arrive first:
//!
//! - consumer first: the callback is stored and invoked by the producer;
//! - producer first: the value is stored and handed over the moment the
//!   consumer registers.
//!
//! Setting either side twice is a programming error and aborts. Values are
//! moved, never copied.
//!
//! The [`transform`], [`for_each`] and [`while_loop`] combinators chain
//! asynchronous steps without blocking; iteration steps yield a
//! [`Control`] to continue or stop.

use std::sync::Arc;

use parking_lot::Mutex;

type Consumer<T> = Box<dyn FnOnce(T) + Send + 'static>;

enum State<T> {
  Empty,
  HasValue(T),
  HasConsumer(Consumer<T>),
  Done,
}

/// Consumer end of the one-shot channel.
pub struct Value<T> {
  cell: Arc<Mutex<State<T>>>,
}

/// Producer end of the one-shot channel.
pub struct Producer<T> {
  cell: Arc<Mutex<State<T>>>,
}

/// Creates a connected producer/value pair.
pub fn channel<T>() -> (Producer<T>, Value<T>) {
  let cell = Arc::new(Mutex::new(State::Empty));
  (
    Producer { cell: cell.clone() },
    Value { cell },
  )
}

/// A value that has already been produced.
pub fn past<T>(value: T) -> Value<T> {
  let (producer, future) = channel();
  producer.produce(value);
  future
}

impl<T> Value<T> {
  /// Registers the consumer. Runs it immediately if the value already
  /// arrived; otherwise the producer will run it on arrival.
  pub fn set_consumer(self, consumer: impl FnOnce(T) + Send + 'static) {
    let mut state = self.cell.lock();
    match std::mem::replace(&mut *state, State::Done) {
      State::Empty => {
        *state = State::HasConsumer(Box::new(consumer));
      },
      State::HasValue(value) => {
        drop(state);
        consumer(value);
      },
      State::HasConsumer(_) | State::Done => {
        panic!("future consumer set twice");
      },
    }
  }
}

impl<T> Producer<T> {
  /// Delivers the value. Runs the consumer inline when one is already
  /// registered.
  pub fn produce(self, value: T) {
    let mut state = self.cell.lock();
    match std::mem::replace(&mut *state, State::Done) {
      State::Empty => {
        *state = State::HasValue(value);
      },
      State::HasConsumer(consumer) => {
        drop(state);
        consumer(value);
      },
      State::HasValue(_) | State::Done => {
        panic!("future value produced twice");
      },
    }
  }
}

/// Outcome of one iteration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  Continue,
  Stop,
}

/// Monadic bind: once `value` resolves to an `A`, run `step` and forward
/// its result.
pub fn transform<A, B>(
  value: Value<A>,
  step: impl FnOnce(A) -> Value<B> + Send + 'static,
) -> Value<B>
where
  A: Send + 'static,
  B: Send + 'static,
{
  let (producer, output) = channel();
  value.set_consumer(move |input| {
    step(input).set_consumer(move |result| producer.produce(result));
  });
  output
}

/// Runs `step` for each element in order, waiting for each returned value
/// before moving on. Resolves to [`Control::Stop`] as soon as a step stops,
/// or [`Control::Continue`] after the last element.
pub fn for_each<I, F>(iter: I, step: F) -> Value<Control>
where
  I: Iterator + Send + 'static,
  I::Item: Send,
  F: FnMut(I::Item) -> Value<Control> + Send + 'static,
{
  let (producer, output) = channel();
  resume_for_each(iter, step, producer);
  output
}

fn resume_for_each<I, F>(mut iter: I, mut step: F, producer: Producer<Control>)
where
  I: Iterator + Send + 'static,
  I::Item: Send,
  F: FnMut(I::Item) -> Value<Control> + Send + 'static,
{
  match iter.next() {
    None => producer.produce(Control::Continue),
    Some(item) => {
      step(item).set_consumer(move |control| {
        match control {
          Control::Stop => producer.produce(Control::Stop),
          Control::Continue => resume_for_each(iter, step, producer),
        }
      });
    },
  }
}

/// Runs `step` repeatedly until it resolves to [`Control::Stop`].
pub fn while_loop<F>(step: F) -> Value<Control>
where
  F: FnMut() -> Value<Control> + Send + 'static,
{
  let (producer, output) = channel();
  resume_while(step, producer);
  output
}

fn resume_while<F>(mut step: F, producer: Producer<Control>)
where
  F: FnMut() -> Value<Control> + Send + 'static,
{
  step().set_consumer(move |control| {
    match control {
      Control::Stop => producer.produce(Control::Stop),
      Control::Continue => resume_while(step, producer),
    }
  });
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use super::*;

  #[test]
  fn consumer_then_producer() {
    let (producer, value) = channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = calls.clone();
    value.set_consumer(move |v: i32| {
      assert_eq!(v, 7);
      observed.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    producer.produce(7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn producer_then_consumer() {
    let (producer, value) = channel();
    producer.produce(String::from("moved"));
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = calls.clone();
    value.set_consumer(move |v| {
      assert_eq!(v, "moved");
      observed.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn past_resolves_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = calls.clone();
    past(3).set_consumer(move |v| {
      assert_eq!(v, 3);
      observed.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn transform_chains() {
    let result = Arc::new(Mutex::new(None));
    let observed = result.clone();
    transform(past(4), |n: i32| past(n * 10)).set_consumer(move |v| {
      *observed.lock() = Some(v);
    });
    assert_eq!(*result.lock(), Some(40));
  }

  #[test]
  fn for_each_visits_all_then_continue() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = seen.clone();
    let outcome = Arc::new(Mutex::new(None));
    let outcome_observed = outcome.clone();
    for_each(vec![1, 2, 3].into_iter(), move |item| {
      observed.lock().push(item);
      past(Control::Continue)
    })
    .set_consumer(move |control| *outcome_observed.lock() = Some(control));
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
    assert_eq!(*outcome.lock(), Some(Control::Continue));
  }

  #[test]
  fn for_each_stops_early() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = seen.clone();
    let outcome = Arc::new(Mutex::new(None));
    let outcome_observed = outcome.clone();
    for_each(vec![1, 2, 3].into_iter(), move |item| {
      observed.lock().push(item);
      past(if item == 2 {
        Control::Stop
      } else {
        Control::Continue
      })
    })
    .set_consumer(move |control| *outcome_observed.lock() = Some(control));
    assert_eq!(*seen.lock(), vec![1, 2]);
    assert_eq!(*outcome.lock(), Some(Control::Stop));
  }

  #[test]
  fn while_loop_runs_until_stop() {
    let count = Arc::new(AtomicUsize::new(0));
    let observed = count.clone();
    while_loop(move || {
      let n = observed.fetch_add(1, Ordering::SeqCst);
      past(if n == 4 { Control::Stop } else { Control::Continue })
    })
    .set_consumer(|_| {});
    assert_eq!(count.load(Ordering::SeqCst), 5);
  }

  #[test]
  #[should_panic(expected = "future value produced twice")]
  fn double_produce_panics() {
    let (producer, _value) = channel();
    let cell = Producer {
      cell: producer.cell.clone(),
    };
    producer.produce(1);
    cell.produce(2);
  }
}
