use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prelude::*;

/// Pairs every element with its zero-based index. Created by
/// [`ObservableExt::enumerate`].
pub struct EnumerateOp<S> {
  pub(crate) source: S,
}

impl<S: Observable> Observable for EnumerateOp<S> {
  type Item = (usize, S::Item);
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<(usize, S::Item), S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for EnumerateOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<(usize, S::Item), S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let enumerate = EnumerateSink { sink, index: AtomicUsize::new(0) };
    (handle, self.source.actual_subscribe(Box::new(enumerate)))
  }
}

struct EnumerateSink<T, E> {
  sink: Sink<(usize, T), E>,
  index: AtomicUsize,
}

impl<T: Send, E: Send> Observer<T, E> for EnumerateSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let index = self
          .index
          .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| i.checked_add(1))
          .unwrap_or_else(|_| panic!("enumerate index overflow"));
        self.sink.next((index, v));
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => self.sink.complete(),
    }
  }
}
