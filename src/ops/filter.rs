use std::sync::Arc;

use crate::prelude::*;

/// Emits only the elements that satisfy a predicate. Created by
/// [`ObservableExt::filter`].
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
}

impl<S, F> Observable for FilterOp<S, F>
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

impl<S, F> Producer for FilterOp<S, F>
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
    let predicate = self.predicate.clone();
    let subscription = self.source.actual_subscribe(Box::new(FilterSink { sink, predicate }));
    (handle, subscription)
  }
}

struct FilterSink<F, T, E> {
  sink: Sink<T, E>,
  predicate: Arc<F>,
}

impl<T, E, F> Observer<T, E> for FilterSink<F, T, E>
where
  F: Fn(&T) -> bool + Send + Sync,
  T: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if (self.predicate)(&v) {
          self.sink.next(v)
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

/// [`FilterOp`] with a fallible predicate. Created by
/// [`ObservableExt::try_filter`].
pub struct TryFilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
}

impl<S, F> Observable for TryFilterOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> Result<bool, S::Err> + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F> Producer for TryFilterOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> Result<bool, S::Err> + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let predicate = self.predicate.clone();
    let subscription = self.source.actual_subscribe(Box::new(TryFilterSink { sink, predicate }));
    (handle, subscription)
  }
}

struct TryFilterSink<F, T, E> {
  sink: Sink<T, E>,
  predicate: Arc<F>,
}

impl<T, E, F> Observer<T, E> for TryFilterSink<F, T, E>
where
  F: Fn(&T) -> Result<bool, E> + Send + Sync,
  T: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => match (self.predicate)(&v) {
        Ok(true) => self.sink.next(v),
        Ok(false) => {}
        Err(e) => self.sink.error(e),
      },
      stop => self.sink.forward_on(stop),
    }
  }
}
