use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Running accumulation: emits the accumulator after every element. Created
/// by [`ObservableExt::scan`].
pub struct ScanOp<S, F, Acc> {
  pub(crate) source: S,
  pub(crate) seed: Acc,
  pub(crate) func: Arc<F>,
}

impl<S, F, Acc> Observable for ScanOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Acc, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, Acc> Producer for ScanOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Acc, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let func = self.func.clone();
    let scan = ScanSink {
      sink,
      acc: Mutex::new(Some(self.seed.clone())),
      func: move |acc, v| Ok(func(acc, v)),
    };
    (handle, self.source.actual_subscribe(Box::new(scan)))
  }
}

/// [`ScanOp`] with a fallible accumulator. Created by
/// [`ObservableExt::try_scan`].
pub struct TryScanOp<S, F, Acc> {
  pub(crate) source: S,
  pub(crate) seed: Acc,
  pub(crate) func: Arc<F>,
}

impl<S, F, Acc> Observable for TryScanOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Result<Acc, S::Err> + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Acc, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, Acc> Producer for TryScanOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Result<Acc, S::Err> + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Acc, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let func = self.func.clone();
    let scan =
      ScanSink { sink, acc: Mutex::new(Some(self.seed.clone())), func: move |acc, v| func(acc, v) };
    (handle, self.source.actual_subscribe(Box::new(scan)))
  }
}

struct ScanSink<Acc, E, G> {
  sink: Sink<Acc, E>,
  acc: Mutex<Option<Acc>>,
  func: G,
}

impl<T, Acc, E, G> Observer<T, E> for ScanSink<Acc, E, G>
where
  G: Fn(Acc, T) -> Result<Acc, E> + Send + Sync,
  Acc: Clone + Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let result = {
          let mut acc = self.acc.rc_deref_mut();
          let Some(current) = acc.take() else { return };
          let next = (self.func)(current, v);
          if let Ok(next) = &next {
            *acc = Some(next.clone());
          }
          next
        };
        match result {
          Ok(next) => self.sink.next(next),
          Err(e) => self.sink.error(e),
        }
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => self.sink.complete(),
    }
  }
}
