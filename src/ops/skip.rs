use std::sync::{
  atomic::{AtomicBool, AtomicUsize, Ordering},
  Arc,
};

use crate::prelude::*;

/// Ignores the first `count` values. Created by [`ObservableExt::skip`].
pub struct SkipOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for SkipOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for SkipOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let skip = SkipSink { sink, remaining: AtomicUsize::new(self.count) };
    (handle, self.source.actual_subscribe(Box::new(skip)))
  }
}

struct SkipSink<T, E> {
  sink: Sink<T, E>,
  remaining: AtomicUsize,
}

impl<T: Send, E: Send> Observer<T, E> for SkipSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let skipped = self
          .remaining
          .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| r.checked_sub(1))
          .is_ok();
        if !skipped {
          self.sink.next(v);
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

/// Ignores values while the predicate holds; from the first failing value
/// on, everything passes. Created by [`ObservableExt::skip_while`].
pub struct SkipWhileOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
}

impl<S, F> Observable for SkipWhileOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F> Producer for SkipWhileOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let skip_while =
      SkipWhileSink { sink, predicate: self.predicate.clone(), passing: AtomicBool::new(false) };
    (handle, self.source.actual_subscribe(Box::new(skip_while)))
  }
}

struct SkipWhileSink<T, E, F> {
  sink: Sink<T, E>,
  predicate: Arc<F>,
  passing: AtomicBool,
}

impl<T, E, F> Observer<T, E> for SkipWhileSink<T, E, F>
where
  T: Send,
  E: Send,
  F: Fn(&T) -> bool + Send + Sync,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if self.passing.load(Ordering::Acquire) || !(self.predicate)(&v) {
          self.passing.store(true, Ordering::Release);
          self.sink.next(v);
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn base_function() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..10).skip(5).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![5, 6, 7, 8, 9]);
    assert!(observer.is_completed());
  }

  #[test]
  fn skip_more_than_length() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..3).skip(5).subscribe_with(observer.clone());
    assert!(observer.values().is_empty());
    assert!(observer.is_completed());
  }

  #[test]
  fn skip_while_latches() {
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 2, 5, 1, 7]).skip_while(|v| *v < 3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![5, 1, 7]);
  }
}
