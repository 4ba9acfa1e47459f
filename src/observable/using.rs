use std::sync::Arc;

use crate::prelude::*;

/// Creates a resource per subscription and an observable built on it; the
/// resource is disposed together with the subscription, whether the
/// sequence terminates or the subscriber leaves.
pub fn using<R, O, RF, OF>(resource_factory: RF, observable_factory: OF) -> UsingObservable<RF, OF>
where
  R: Disposable + 'static,
  O: Observable,
  RF: Fn() -> R + Send + Sync + 'static,
  OF: Fn(&R) -> O + Send + Sync + 'static,
{
  UsingObservable {
    resource_factory: Arc::new(resource_factory),
    observable_factory: Arc::new(observable_factory),
  }
}

pub struct UsingObservable<RF, OF> {
  resource_factory: Arc<RF>,
  observable_factory: Arc<OF>,
}

impl<R, O, RF, OF> Observable for UsingObservable<RF, OF>
where
  R: Disposable + 'static,
  O: Observable,
  RF: Fn() -> R + Send + Sync + 'static,
  OF: Fn(&R) -> O + Send + Sync + 'static,
{
  type Item = O::Item;
  type Err = O::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<O::Item, O::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<R, O, RF, OF> Producer for UsingObservable<RF, OF>
where
  R: Disposable + 'static,
  O: Observable,
  RF: Fn() -> R + Send + Sync + 'static,
  OF: Fn(&R) -> O + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<O::Item, O::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let resource = (self.resource_factory)();
    let source = (self.observable_factory)(&resource);
    let resource = Subscription::new(resource);
    let subscription = source.actual_subscribe(Box::new(UsingSink(sink)));
    (handle, Subscription::pair(subscription, resource))
  }
}

struct UsingSink<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<T, E> for UsingSink<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}
