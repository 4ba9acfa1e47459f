use std::{collections::VecDeque, sync::Mutex};

use crate::prelude::*;

/// Emits the last `count` values once the source completes. Created by
/// [`ObservableExt::take_last`].
pub struct TakeLastOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for TakeLastOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for TakeLastOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let take_last = TakeLastSink { sink, count: self.count, queue: Mutex::new(VecDeque::new()) };
    (handle, self.source.actual_subscribe(Box::new(take_last)))
  }
}

struct TakeLastSink<T, E> {
  sink: Sink<T, E>,
  count: usize,
  queue: Mutex<VecDeque<T>>,
}

impl<T: Send, E: Send> Observer<T, E> for TakeLastSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if self.count == 0 {
          return;
        }
        let mut queue = self.queue.rc_deref_mut();
        if queue.len() == self.count {
          queue.pop_front();
        }
        queue.push_back(v);
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => {
        let queue = std::mem::take(&mut *self.queue.rc_deref_mut());
        for v in queue {
          self.sink.next(v);
        }
        self.sink.complete();
      }
    }
  }
}
