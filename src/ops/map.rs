use std::{marker::PhantomData, sync::Arc};

use crate::prelude::*;

/// Applies a function to every element. Created by
/// [`ObservableExt::map`].
pub struct MapOp<S, F, U> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
  pub(crate) _p: PhantomData<fn() -> U>,
}

impl<S, F, U> Observable for MapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> U + Send + Sync + 'static,
  U: Send + 'static,
{
  type Item = U;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<U, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, U> Producer for MapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> U + Send + Sync + 'static,
  U: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<U, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let subscription =
      self.source.actual_subscribe(Box::new(MapSink { sink, func: self.func.clone() }));
    (handle, subscription)
  }
}

struct MapSink<F, U, E> {
  sink: Sink<U, E>,
  func: Arc<F>,
}

impl<T, U, E, F> Observer<T, E> for MapSink<F, U, E>
where
  F: Fn(T) -> U + Send + Sync,
  U: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) { self.sink.forward_on(event.map(&*self.func)) }
}

/// Like [`MapOp`] with a fallible function; an `Err` terminates the sequence
/// with that error. Created by [`ObservableExt::try_map`].
pub struct TryMapOp<S, F, U> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
  pub(crate) _p: PhantomData<fn() -> U>,
}

impl<S, F, U> Observable for TryMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Result<U, S::Err> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Item = U;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<U, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, U> Producer for TryMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Result<U, S::Err> + Send + Sync + 'static,
  U: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<U, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let subscription =
      self.source.actual_subscribe(Box::new(TryMapSink { sink, func: self.func.clone() }));
    (handle, subscription)
  }
}

struct TryMapSink<F, U, E> {
  sink: Sink<U, E>,
  func: Arc<F>,
}

impl<T, U, E, F> Observer<T, E> for TryMapSink<F, U, E>
where
  F: Fn(T) -> Result<U, E> + Send + Sync,
  U: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => match (self.func)(v) {
        Ok(v) => self.sink.next(v),
        Err(e) => self.sink.error(e),
      },
      Event::Error(e) => self.sink.error(e),
      Event::Completed => self.sink.complete(),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn primitive_type() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(100..101).map(|v| v * 2).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![200]);
    assert!(observer.is_completed());
  }

  #[test]
  fn map_types_mixed() {
    let observer = TestObserver::<String, ()>::new();
    observable::of(['a', 'b', 'c'])
      .map(|c| c.to_string().repeat(2))
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec!["aa", "bb", "cc"]);
  }

  #[test]
  fn try_map_error_terminates() {
    let observer = TestObserver::<i32, String>::new();
    observable::from_iter(1..10)
      .try_map(|v| if v < 3 { Ok(v) } else { Err(format!("too big: {v}")) })
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 2]);
    assert_eq!(observer.error(), Some("too big: 3".to_string()));
  }

  #[test]
  fn error_passes_through() {
    let observer = TestObserver::<i32, &str>::new();
    observable::throw_err("boom").map(|v: i32| v + 1).subscribe_with(observer.clone());
    assert_eq!(observer.error(), Some("boom"));
  }
}
