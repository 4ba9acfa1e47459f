use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use super::{subscribe_to, HasObservers, Observers, Subject};
use crate::prelude::*;

/// Subject without replay: subscribers see only the events emitted after
/// they subscribed. Late subscribers of a stopped subject receive its stop
/// event.
pub struct PublishSubject<T, E> {
  state: Arc<Mutex<PublishState<T, E>>>,
}

struct PublishState<T, E> {
  observers: Observers<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> HasObservers<T, E> for PublishState<T, E> {
  fn observers(&mut self) -> &mut Observers<T, E> { &mut self.observers }
}

impl<T, E> PublishSubject<T, E> {
  pub fn new() -> Self {
    Self { state: Arc::new(Mutex::new(PublishState { observers: Observers::default() })) }
  }
}

impl<T, E> Default for PublishSubject<T, E> {
  fn default() -> Self { Self::new() }
}

impl<T, E> Clone for PublishSubject<T, E> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<T, E> Observer<T, E> for PublishSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let pending = {
      let mut state = self.state.rc_deref_mut();
      match event {
        Event::Next(v) if !state.observers.is_stopped() => state.observers.next(v),
        Event::Next(_) => return,
        stop => state.observers.stop(stop),
      }
    };
    pending.deliver();
  }
}

impl<T, E> Observable for PublishSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_to(&self.state, observer, |_| SmallVec::new())
  }
}

impl<T, E> Subject<T, E> for PublishSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn is_stopped(&self) -> bool { self.state.rc_deref_mut().observers.is_stopped() }

  fn observer_count(&self) -> usize { self.state.rc_deref_mut().observers.len() }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn only_events_after_subscription() {
    let subject = PublishSubject::<i32, ()>::new();
    subject.next(1);
    let observer = TestObserver::new();
    subject.subscribe_with(observer.clone());
    subject.next(2);
    subject.complete();
    subject.next(3);
    assert_eq!(observer.values(), vec![2]);
    assert!(observer.is_completed());
  }

  #[test]
  fn late_subscriber_gets_stop_event() {
    let subject = PublishSubject::<i32, &str>::new();
    subject.error("boom");
    let observer = TestObserver::new();
    let subscription = subject.subscribe_with(observer.clone());
    assert_eq!(observer.error(), Some("boom"));
    assert!(subscription.is_disposed());
    assert!(!subject.has_observers());
  }

  #[test]
  fn unsubscribe_removes_observer() {
    let subject = PublishSubject::<i32, ()>::new();
    let a = TestObserver::new();
    let b = TestObserver::new();
    let sub_a = subject.subscribe_with(a.clone());
    subject.subscribe_with(b.clone());
    assert_eq!(subject.observer_count(), 2);
    subject.next(1);
    sub_a.dispose();
    subject.next(2);
    assert_eq!(subject.observer_count(), 1);
    assert_eq!(a.values(), vec![1]);
    assert_eq!(b.values(), vec![1, 2]);
  }

  #[test]
  fn reentrant_emission_keeps_order() {
    let subject = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let (c_subject, c_seen) = (subject.clone(), seen.clone());
    subject.subscribe(move |v| {
      c_seen.lock().unwrap().push(v);
      if v == 1 {
        c_subject.next(2);
        c_seen.lock().unwrap().push(10);
      }
    });
    subject.next(1);
    assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2]);
  }
}
