use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::prelude::*;

/// Emits only the first `count` values, then completes. Created by
/// [`ObservableExt::take`].
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for TakeOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    if self.count == 0 {
      sink.complete();
      return (handle, Subscription::empty());
    }
    let take = TakeSink { sink, remaining: AtomicUsize::new(self.count) };
    (handle, self.source.actual_subscribe(Box::new(take)))
  }
}

struct TakeSink<T, E> {
  sink: Sink<T, E>,
  remaining: AtomicUsize,
}

impl<T: Send, E: Send> Observer<T, E> for TakeSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let prev =
          self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| r.checked_sub(1));
        if let Ok(prev) = prev {
          self.sink.next(v);
          if prev == 1 {
            self.sink.complete();
          }
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

/// Emits values while the predicate holds, then completes. Created by
/// [`ObservableExt::take_while`].
pub struct TakeWhileOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
  pub(crate) inclusive: bool,
}

impl<S, F> Observable for TakeWhileOp<S, F>
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

impl<S, F> Producer for TakeWhileOp<S, F>
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
    let take_while =
      TakeWhileSink { sink, predicate: self.predicate.clone(), inclusive: self.inclusive };
    (handle, self.source.actual_subscribe(Box::new(take_while)))
  }
}

struct TakeWhileSink<T, E, F> {
  sink: Sink<T, E>,
  predicate: Arc<F>,
  inclusive: bool,
}

impl<T, E, F> Observer<T, E> for TakeWhileSink<T, E, F>
where
  T: Send,
  E: Send,
  F: Fn(&T) -> bool + Send + Sync,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if self.sink.is_disposed() {
          return;
        }
        if (self.predicate)(&v) {
          self.sink.next(v);
        } else {
          if self.inclusive {
            self.sink.next(v);
          }
          self.sink.complete();
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn base_function() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..100).take(5).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2, 3, 4]);
    assert!(observer.is_completed());
  }

  #[test]
  fn take_stops_infinite_source() {
    let observer = TestObserver::<i64, ()>::new();
    observable::from_iter(0i64..).take(3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2]);
  }

  #[test]
  fn take_zero_never_subscribes() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let observer = TestObserver::<i32, ()>::new();
    observable::create(move |emitter: Emitter<i32, ()>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      emitter.next(1);
      Subscription::empty()
    })
    .take(0)
    .subscribe_with(observer.clone());
    assert_eq!(subscribed.load(Ordering::SeqCst), 0);
    assert!(observer.is_completed());
  }

  #[test]
  fn take_while() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..).take_while(|v| *v < 3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2]);
    assert!(observer.is_completed());

    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..).take_while_inclusive(|v| *v < 3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2, 3]);
  }
}
