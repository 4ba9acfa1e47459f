use std::sync::Arc;

use crate::prelude::*;

/// Invokes a side effect for every event, then forwards it unchanged.
/// Created by [`ObservableExt::tap`].
pub struct TapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
}

impl<S, F> Observable for TapOp<S, F>
where
  S: Observable,
  F: Fn(&Event<S::Item, S::Err>) + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F> Producer for TapOp<S, F>
where
  S: Observable,
  F: Fn(&Event<S::Item, S::Err>) + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    (handle, self.source.actual_subscribe(Box::new(TapSink { sink, func: self.func.clone() })))
  }
}

struct TapSink<T, E, F> {
  sink: Sink<T, E>,
  func: Arc<F>,
}

impl<T, E, F> Observer<T, E> for TapSink<T, E, F>
where
  T: Send,
  E: Send,
  F: Fn(&Event<T, E>) + Send + Sync,
{
  fn on(&self, event: Event<T, E>) {
    if !self.sink.is_disposed() {
      (self.func)(&event);
    }
    self.sink.forward_on(event)
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn sees_every_event() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 2])
      .tap(move |e: &Event<i32, ()>| c_seen.lock().unwrap().push(e.clone()))
      .subscribe_with(observer.clone());
    assert_eq!(*seen.lock().unwrap(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
    assert_eq!(observer.values(), vec![1, 2]);
  }
}
