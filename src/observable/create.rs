use std::{marker::PhantomData, sync::Arc};

use crate::prelude::*;

/// Creates an observable from a subscribe function.
///
/// `subscribe` runs once per subscription with an [`Emitter`] bound to that
/// subscriber and returns the subscription tearing down whatever it set up.
/// The emitter enforces the event contract: nothing is delivered after a
/// stop event or after the subscriber disposed.
///
/// ```
/// use rxcore::{prelude::*, testing::TestObserver};
///
/// let source = observable::create(|emitter: Emitter<i32, ()>| {
///   emitter.next(1);
///   emitter.complete();
///   emitter.next(2);
///   Subscription::empty()
/// });
/// let observer = TestObserver::new();
/// source.subscribe_with(observer.clone());
/// assert_eq!(observer.values(), vec![1]);
/// ```
pub fn create<T, E, F>(subscribe: F) -> CreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Subscription + Send + Sync + 'static,
{
  CreateObservable { subscribe, _p: PhantomData }
}

/// Like [`create`] with a fallible subscribe function; an `Err` is
/// delivered as the error event.
pub fn try_create<T, E, F>(subscribe: F) -> TryCreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Result<Subscription, E> + Send + Sync + 'static,
{
  TryCreateObservable { subscribe, _p: PhantomData }
}

/// The observer handed to a [`create`] subscribe function.
pub struct Emitter<T, E>(Arc<Sink<T, E>>);

impl<T, E> Clone for Emitter<T, E> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Send, E: Send> Emitter<T, E> {
  /// `true` once the subscriber is gone or a stop event was emitted.
  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl<T: Send, E: Send> Observer<T, E> for Emitter<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}

pub struct CreateObservable<F, T, E> {
  subscribe: F,
  _p: PhantomData<fn() -> (T, E)>,
}

impl<F, T, E> Observable for CreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Subscription + Send + Sync + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<F, T, E> Producer for CreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Subscription + Send + Sync + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<T, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Arc::new(Sink::new(observer, cancel));
    let handle = sink.handle();
    let subscription = (self.subscribe)(Emitter(sink));
    (handle, subscription)
  }
}

pub struct TryCreateObservable<F, T, E> {
  subscribe: F,
  _p: PhantomData<fn() -> (T, E)>,
}

impl<F, T, E> Observable for TryCreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Result<Subscription, E> + Send + Sync + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<F, T, E> Producer for TryCreateObservable<F, T, E>
where
  F: Fn(Emitter<T, E>) -> Result<Subscription, E> + Send + Sync + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<T, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let emitter = Emitter(Arc::new(Sink::new(observer, cancel)));
    let handle = emitter.0.handle();
    let subscription = match (self.subscribe)(emitter.clone()) {
      Ok(subscription) => subscription,
      Err(e) => {
        emitter.error(e);
        Subscription::empty()
      }
    };
    (handle, subscription)
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::*};

  #[test]
  fn teardown_runs_on_dispose() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let c_torn_down = torn_down.clone();
    let observer = TestObserver::<i32, ()>::new();
    let subscription = observable::create(move |emitter: Emitter<i32, ()>| {
      emitter.next(1);
      let c_torn_down = c_torn_down.clone();
      Subscription::from_fn(move || c_torn_down.store(true, Ordering::SeqCst))
    })
    .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1]);
    assert!(!torn_down.load(Ordering::SeqCst));
    subscription.dispose();
    assert!(torn_down.load(Ordering::SeqCst));
  }

  #[test]
  fn completion_tears_down() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let c_torn_down = torn_down.clone();
    observable::create(move |emitter: Emitter<i32, ()>| {
      emitter.complete();
      let c_torn_down = c_torn_down.clone();
      Subscription::from_fn(move || c_torn_down.store(true, Ordering::SeqCst))
    })
    .subscribe(|_| {});
    assert!(torn_down.load(Ordering::SeqCst));
  }

  #[test]
  fn emitter_reports_disposal() {
    let scheduler = TestScheduler::new();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      let c_scheduler = c_scheduler.clone();
      observable::create(move |emitter: Emitter<u64, ()>| {
        c_scheduler.schedule_periodic(0u64, std::time::Duration::from_millis(300), {
          let emitter = emitter.clone();
          move |n| {
            if !emitter.is_disposed() {
              emitter.next(n);
            }
            n + 1
          }
        })
      })
    });
    assert_eq!(res.events(), vec![next(500, 0), next(800, 1)]);
  }

  #[test]
  fn try_create_turns_err_into_event() {
    let observer = TestObserver::<i32, &str>::new();
    observable::try_create(|emitter: Emitter<i32, &str>| {
      emitter.next(1);
      Err("setup failed")
    })
    .subscribe_with(observer.clone());
    assert_eq!(observer.events(), vec![Event::Next(1), Event::Error("setup failed")]);
  }
}
