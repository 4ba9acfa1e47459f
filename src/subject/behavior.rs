use std::sync::{Arc, Mutex};

use smallvec::smallvec;

use super::{subscribe_to, HasObservers, Observers, Subject};
use crate::prelude::*;

/// Subject holding a current value. Every subscriber first receives the
/// latest value (initially the seed), then live events.
pub struct BehaviorSubject<T, E> {
  state: Arc<Mutex<BehaviorState<T, E>>>,
}

struct BehaviorState<T, E> {
  value: T,
  observers: Observers<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> HasObservers<T, E> for BehaviorState<T, E> {
  fn observers(&mut self) -> &mut Observers<T, E> { &mut self.observers }
}

impl<T, E> BehaviorSubject<T, E> {
  pub fn new(value: T) -> Self {
    Self { state: Arc::new(Mutex::new(BehaviorState { value, observers: Observers::default() })) }
  }
}

impl<T: Clone + Send, E: Clone + Send> BehaviorSubject<T, E> {
  /// The latest value, or the error the subject was terminated with.
  /// A completed subject keeps reporting its last value.
  pub fn value(&self) -> Result<T, E> {
    let state = self.state.rc_deref_mut();
    match state.observers.stop_event() {
      Some(Event::Error(e)) => Err(e.clone()),
      _ => Ok(state.value.clone()),
    }
  }
}

impl<T, E> Clone for BehaviorSubject<T, E> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<T, E> Observer<T, E> for BehaviorSubject<T, E>
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
          state.value = v.clone();
          state.observers.next(v)
        }
        stop => state.observers.stop(stop),
      }
    };
    pending.deliver();
  }
}

impl<T, E> Observable for BehaviorSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_to(&self.state, observer, |state| {
      if state.observers.is_stopped() {
        smallvec![]
      } else {
        smallvec![Event::Next(state.value.clone())]
      }
    })
  }
}

impl<T, E> Subject<T, E> for BehaviorSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn is_stopped(&self) -> bool { self.state.rc_deref_mut().observers.is_stopped() }

  fn observer_count(&self) -> usize { self.state.rc_deref_mut().observers.len() }
}
