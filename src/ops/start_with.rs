use crate::prelude::*;

/// Emits `values` before subscribing to the source. Created by
/// [`ObservableExt::start_with`].
pub struct StartWithOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) values: Vec<S::Item>,
}

impl<S> Observable for StartWithOp<S>
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

impl<S> Producer for StartWithOp<S>
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
    for v in self.values.iter().cloned() {
      if sink.is_disposed() {
        return (handle, Subscription::empty());
      }
      sink.next(v);
    }
    (handle, self.source.actual_subscribe(Box::new(StartWithSink(sink))))
  }
}

struct StartWithSink<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<T, E> for StartWithSink<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}
