use std::sync::{Arc, Mutex};

use smallvec::{smallvec, SmallVec};

use super::{subscribe_to, HasObservers, Observers, Pending, Subject};
use crate::prelude::*;

/// Subject emitting only the last value it received, and only once it
/// completes. An error is forwarded without any value.
pub struct AsyncSubject<T, E> {
  state: Arc<Mutex<AsyncState<T, E>>>,
}

struct AsyncState<T, E> {
  last: Option<T>,
  observers: Observers<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> HasObservers<T, E> for AsyncState<T, E> {
  fn observers(&mut self) -> &mut Observers<T, E> { &mut self.observers }
}

impl<T, E> AsyncSubject<T, E> {
  pub fn new() -> Self {
    Self { state: Arc::new(Mutex::new(AsyncState { last: None, observers: Observers::default() })) }
  }
}

impl<T, E> Default for AsyncSubject<T, E> {
  fn default() -> Self { Self::new() }
}

impl<T, E> Clone for AsyncSubject<T, E> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<T, E> Observer<T, E> for AsyncSubject<T, E>
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
          state.last = Some(v);
          Pending::none()
        }
        Event::Completed => match state.last.clone() {
          Some(last) => {
            // The stop below queues to the same observers and drains both.
            let _ = state.observers.next(last);
            state.observers.stop(Event::Completed)
          }
          None => state.observers.stop(Event::Completed),
        },
        Event::Error(e) => {
          state.last = None;
          state.observers.stop(Event::Error(e))
        }
      }
    };
    pending.deliver();
  }
}

impl<T, E> Observable for AsyncSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_to(&self.state, observer, |state| -> SmallVec<[Event<T, E>; 2]> {
      match (&state.last, state.observers.stop_event()) {
        (Some(last), Some(Event::Completed)) => smallvec![Event::Next(last.clone())],
        _ => smallvec![],
      }
    })
  }
}

impl<T, E> Subject<T, E> for AsyncSubject<T, E>
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
  fn emits_last_value_on_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    let early = TestObserver::new();
    subject.subscribe_with(early.clone());
    subject.next(1);
    subject.next(2);
    assert!(early.events().is_empty());
    subject.complete();
    let late = TestObserver::new();
    subject.subscribe_with(late.clone());
    assert_eq!(early.events(), vec![Event::Next(2), Event::Completed]);
    assert_eq!(late.events(), vec![Event::Next(2), Event::Completed]);
  }

  #[test]
  fn error_drops_value() {
    let subject = AsyncSubject::<i32, &str>::new();
    let observer = TestObserver::new();
    subject.subscribe_with(observer.clone());
    subject.next(1);
    subject.error("boom");
    assert_eq!(observer.events(), vec![Event::Error("boom")]);
  }

  #[test]
  fn empty_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    let observer = TestObserver::new();
    subject.subscribe_with(observer.clone());
    subject.complete();
    assert_eq!(observer.events(), vec![Event::Completed]);
  }
}
