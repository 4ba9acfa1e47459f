use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use smallvec::SmallVec;

use super::{subscribe_to, HasObservers, Observers, Subject};
use crate::prelude::*;

/// Subject replaying buffered values to every new subscriber, followed by
/// the stop event if the subject has terminated.
///
/// ```
/// use rxcore::{prelude::*, testing::TestObserver};
///
/// let subject = ReplaySubject::<i32, ()>::create(2);
/// subject.next(1);
/// subject.next(2);
/// subject.next(3);
/// let observer = TestObserver::new();
/// subject.subscribe_with(observer.clone());
/// assert_eq!(observer.values(), vec![2, 3]);
/// ```
pub struct ReplaySubject<T, E> {
  state: Arc<Mutex<ReplayState<T, E>>>,
}

enum ReplayBuffer<T> {
  Single(Option<T>),
  Bounded(usize, VecDeque<T>),
  Unbounded(Vec<T>),
}

impl<T: Clone> ReplayBuffer<T> {
  fn push(&mut self, value: T) {
    match self {
      ReplayBuffer::Single(slot) => *slot = Some(value),
      ReplayBuffer::Bounded(size, buffer) => {
        if buffer.len() == *size {
          buffer.pop_front();
        }
        buffer.push_back(value);
      }
      ReplayBuffer::Unbounded(buffer) => buffer.push(value),
    }
  }

  fn snapshot<E>(&self) -> SmallVec<[Event<T, E>; 2]> {
    match self {
      ReplayBuffer::Single(slot) => slot.iter().cloned().map(Event::Next).collect(),
      ReplayBuffer::Bounded(_, buffer) => buffer.iter().cloned().map(Event::Next).collect(),
      ReplayBuffer::Unbounded(buffer) => buffer.iter().cloned().map(Event::Next).collect(),
    }
  }
}

struct ReplayState<T, E> {
  buffer: ReplayBuffer<T>,
  observers: Observers<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> HasObservers<T, E> for ReplayState<T, E> {
  fn observers(&mut self) -> &mut Observers<T, E> { &mut self.observers }
}

impl<T, E> ReplaySubject<T, E> {
  /// Replays at most `buffer_size` of the latest values.
  ///
  /// # Panics
  /// If `buffer_size` is zero.
  pub fn create(buffer_size: usize) -> Self {
    assert!(buffer_size > 0, "replay buffer size must be positive");
    let buffer = if buffer_size == 1 {
      ReplayBuffer::Single(None)
    } else {
      ReplayBuffer::Bounded(buffer_size, VecDeque::with_capacity(buffer_size.min(64)))
    };
    Self::with_buffer(buffer)
  }

  /// Replays every value ever received.
  pub fn create_unbounded() -> Self { Self::with_buffer(ReplayBuffer::Unbounded(Vec::new())) }

  fn with_buffer(buffer: ReplayBuffer<T>) -> Self {
    Self { state: Arc::new(Mutex::new(ReplayState { buffer, observers: Observers::default() })) }
  }
}

impl<T, E> Clone for ReplaySubject<T, E> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<T, E> Observer<T, E> for ReplaySubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let pending = {
      let mut state = self.state.rc_deref_mut();
      if state.observers.is_stopped() {
        return;
      }
      match event {
        Event::Next(v) => {
          state.buffer.push(v.clone());
          state.observers.next(v)
        }
        stop => state.observers.stop(stop),
      }
    };
    pending.deliver();
  }
}

impl<T, E> Observable for ReplaySubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_to(&self.state, observer, |state| state.buffer.snapshot())
  }
}

impl<T, E> Subject<T, E> for ReplaySubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn is_stopped(&self) -> bool { self.state.rc_deref_mut().observers.is_stopped() }

  fn observer_count(&self) -> usize { self.state.rc_deref_mut().observers.len() }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn single_slot_keeps_latest() {
    let subject = ReplaySubject::<i32, ()>::create(1);
    subject.next(1);
    subject.next(2);
    let observer = TestObserver::new();
    subject.subscribe_with(observer.clone());
    subject.next(3);
    assert_eq!(observer.values(), vec![2, 3]);
  }

  #[test]
  fn unbounded_replays_everything_then_stop() {
    let subject = ReplaySubject::<i32, &str>::create_unbounded();
    for v in 0..5 {
      subject.next(v);
    }
    subject.error("boom");
    let observer = TestObserver::new();
    subject.subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2, 3, 4]);
    assert_eq!(observer.error(), Some("boom"));
  }

  #[test]
  #[should_panic]
  fn zero_buffer_rejected() { ReplaySubject::<i32, ()>::create(0); }
}
