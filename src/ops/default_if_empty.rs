use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::prelude::*;

/// Emits `default` if the source completes without emitting anything.
/// Created by [`ObservableExt::default_if_empty`].
pub struct DefaultIfEmptyOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) default: S::Item,
}

impl<S> Observable for DefaultIfEmptyOp<S>
where
  S: Observable,
  S::Item: Clone + Sync,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for DefaultIfEmptyOp<S>
where
  S: Observable,
  S::Item: Clone + Sync,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let default_if_empty =
      DefaultIfEmptySink { sink, default: self.default.clone(), is_empty: AtomicBool::new(true) };
    (handle, self.source.actual_subscribe(Box::new(default_if_empty)))
  }
}

struct DefaultIfEmptySink<T, E> {
  sink: Sink<T, E>,
  default: T,
  is_empty: AtomicBool,
}

impl<T: Clone + Send + Sync, E: Send> Observer<T, E> for DefaultIfEmptySink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        self.is_empty.store(false, Ordering::Release);
        self.sink.next(v);
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => {
        if self.is_empty.load(Ordering::Acquire) {
          self.sink.next(self.default.clone());
        }
        self.sink.complete();
      }
    }
  }
}

/// Continues with `fallback` if the source completes without emitting
/// anything. Created by [`ObservableExt::switch_if_empty`].
pub struct SwitchIfEmptyOp<S, F> {
  pub(crate) source: S,
  pub(crate) fallback: Arc<F>,
}

impl<S, F> Observable for SwitchIfEmptyOp<S, F>
where
  S: Observable,
  F: Observable<Item = S::Item, Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F> Producer for SwitchIfEmptyOp<S, F>
where
  S: Observable,
  F: Observable<Item = S::Item, Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let switch = Arc::new(SwitchIfEmptySink {
      sink: Sink::new(observer, cancel),
      fallback: self.fallback.clone(),
      is_empty: AtomicBool::new(true),
      source: SingleAssignmentDisposable::new(),
      fallback_subscription: SingleAssignmentDisposable::new(),
    });
    let handle = switch.sink.handle();
    let source = self.source.actual_subscribe(Box::new(SwitchIfEmptySource(switch.clone())));
    switch.source.set(source);
    (handle, Subscription::from(switch))
  }
}

struct SwitchIfEmptySink<T, E, F> {
  sink: Sink<T, E>,
  fallback: Arc<F>,
  is_empty: AtomicBool,
  source: SingleAssignmentDisposable,
  fallback_subscription: SingleAssignmentDisposable,
}

impl<T, E, F> Disposable for SwitchIfEmptySink<T, E, F>
where
  T: Send,
  E: Send,
  F: Observable<Item = T, Err = E>,
{
  fn dispose(&self) {
    self.source.dispose();
    self.fallback_subscription.dispose();
  }

  fn is_disposed(&self) -> bool { self.source.is_disposed() }
}

struct SwitchIfEmptySource<T, E, F>(Arc<SwitchIfEmptySink<T, E, F>>);

impl<T, E, F> Observer<T, E> for SwitchIfEmptySource<T, E, F>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Observable<Item = T, Err = E>,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        self.0.is_empty.store(false, Ordering::Release);
        self.0.sink.next(v);
      }
      Event::Completed if self.0.is_empty.load(Ordering::Acquire) => {
        let fallback = self.0.fallback.actual_subscribe(Box::new(FallbackObserver(self.0.clone())));
        self.0.fallback_subscription.set(fallback);
      }
      stop => self.0.sink.forward_on(stop),
    }
  }
}

struct FallbackObserver<T, E, F>(Arc<SwitchIfEmptySink<T, E, F>>);

impl<T, E, F> Observer<T, E> for FallbackObserver<T, E, F>
where
  T: Send,
  E: Send,
  F: Observable<Item = T, Err = E>,
{
  fn on(&self, event: Event<T, E>) { self.0.sink.forward_on(event) }
}
