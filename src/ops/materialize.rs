use std::marker::PhantomData;

use crate::prelude::*;

/// Turns every event of the source into a value; the output completes right
/// after delivering the source's stop event. Created by
/// [`ObservableExt::materialize`].
pub struct MaterializeOp<S> {
  pub(crate) source: S,
}

impl<S: Observable> Observable for MaterializeOp<S> {
  type Item = Event<S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for MaterializeOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    (handle, self.source.actual_subscribe(Box::new(MaterializeSink(sink))))
  }
}

struct MaterializeSink<T, E>(Sink<Event<T, E>, E>);

impl<T: Send, E: Send> Observer<T, E> for MaterializeSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    let stop = event.is_stop_event();
    self.0.next(event);
    if stop {
      self.0.complete();
    }
  }
}

/// Inverse of [`MaterializeOp`]: replays the events carried as values.
/// Created by [`ObservableExt::dematerialize`].
pub struct DematerializeOp<S, T> {
  pub(crate) source: S,
  pub(crate) _p: PhantomData<fn() -> T>,
}

impl<S, T, E> Observable for DematerializeOp<S, T>
where
  S: Observable<Item = Event<T, E>, Err = E>,
  T: Send + 'static,
  E: Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, T, E> Producer for DematerializeOp<S, T>
where
  S: Observable<Item = Event<T, E>, Err = E>,
  T: Send + 'static,
  E: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<T, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    (handle, self.source.actual_subscribe(Box::new(DematerializeSink(sink))))
  }
}

struct DematerializeSink<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<Event<T, E>, E> for DematerializeSink<T, E> {
  fn on(&self, event: Event<Event<T, E>, E>) {
    match event {
      Event::Next(inner) => self.0.forward_on(inner),
      Event::Error(e) => self.0.error(e),
      Event::Completed => self.0.complete(),
    }
  }
}
