use std::{marker::PhantomData, sync::Arc};

use crate::prelude::*;

/// Maps every element and drops the `None` results. Created by
/// [`ObservableExt::filter_map`].
pub struct FilterMapOp<S, F, U> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
  pub(crate) _p: PhantomData<fn() -> U>,
}

impl<S, F, U> Observable for FilterMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Option<U> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Item = U;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<U, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, U> Producer for FilterMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Option<U> + Send + Sync + 'static,
  U: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<U, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let func = self.func.clone();
    let subscription = self.source.actual_subscribe(Box::new(FilterMapSink { sink, func }));
    (handle, subscription)
  }
}

struct FilterMapSink<F, U, E> {
  sink: Sink<U, E>,
  func: Arc<F>,
}

impl<T, U, E, F> Observer<T, E> for FilterMapSink<F, U, E>
where
  F: Fn(T) -> Option<U> + Send + Sync,
  U: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if let Some(v) = (self.func)(v) {
          self.sink.next(v)
        }
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => self.sink.complete(),
    }
  }
}

/// [`FilterMapOp`] with a fallible function. Created by
/// [`ObservableExt::try_filter_map`].
pub struct TryFilterMapOp<S, F, U> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
  pub(crate) _p: PhantomData<fn() -> U>,
}

impl<S, F, U> Observable for TryFilterMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Result<Option<U>, S::Err> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Item = U;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<U, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, U> Producer for TryFilterMapOp<S, F, U>
where
  S: Observable,
  F: Fn(S::Item) -> Result<Option<U>, S::Err> + Send + Sync + 'static,
  U: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<U, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let func = self.func.clone();
    let subscription = self.source.actual_subscribe(Box::new(TryFilterMapSink { sink, func }));
    (handle, subscription)
  }
}

struct TryFilterMapSink<F, U, E> {
  sink: Sink<U, E>,
  func: Arc<F>,
}

impl<T, U, E, F> Observer<T, E> for TryFilterMapSink<F, U, E>
where
  F: Fn(T) -> Result<Option<U>, E> + Send + Sync,
  U: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => match (self.func)(v) {
        Ok(Some(v)) => self.sink.next(v),
        Ok(None) => {}
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
  fn map_types_mixed() {
    let observer = TestObserver::<i32, ()>::new();
    observable::of(["1", "x", "3"]).filter_map(|s| s.parse().ok()).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 3]);
    assert!(observer.is_completed());
  }

  #[test]
  fn try_filter_map_error() {
    let observer = TestObserver::<u8, String>::new();
    observable::of(["1", "", "x"])
      .try_filter_map(|s| {
        if s.is_empty() {
          Ok(None)
        } else {
          s.parse::<u8>().map(Some).map_err(|e| e.to_string())
        }
      })
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1]);
    assert!(observer.error().is_some());
  }
}
