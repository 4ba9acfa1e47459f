use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Pairs every source value with the latest value of `from`. Source values
/// arriving before `from` has emitted are dropped; completion of `from` is
/// ignored.
///
/// This struct is created by [`ObservableExt::with_latest_from`].
pub struct WithLatestFromOp<S, FS> {
  pub(crate) source: S,
  pub(crate) from: FS,
}

impl<S, FS> Observable for WithLatestFromOp<S, FS>
where
  S: Observable,
  FS: Observable<Err = S::Err>,
  FS::Item: Clone,
{
  type Item = (S::Item, FS::Item);
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, FS> Producer for WithLatestFromOp<S, FS>
where
  S: Observable,
  FS: Observable<Err = S::Err>,
  FS::Item: Clone,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let with_latest = Arc::new(WithLatestFromSink {
      sink: SerialSink::new(observer, cancel),
      latest: Mutex::new(None),
    });
    let handle = with_latest.sink.handle();
    let from = self.from.actual_subscribe(Box::new(FromObserver(with_latest.clone())));
    let source = self.source.actual_subscribe(Box::new(SourceObserver(with_latest)));
    (handle, Subscription::pair(from, source))
  }
}

struct WithLatestFromSink<A, B, E> {
  sink: SerialSink<(A, B), E>,
  latest: Mutex<Option<B>>,
}

struct SourceObserver<A, B, E>(Arc<WithLatestFromSink<A, B, E>>);

impl<A: Send, B: Clone + Send, E: Send> Observer<A, E> for SourceObserver<A, B, E> {
  fn on(&self, event: Event<A, E>) {
    match event {
      Event::Next(a) => {
        {
          let latest = self.0.latest.rc_deref_mut();
          if let Some(b) = latest.as_ref() {
            self.0.sink.push(Event::Next((a, b.clone())));
          }
        }
        self.0.sink.drain();
      }
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => self.0.sink.forward_on(Event::Completed),
    }
  }
}

struct FromObserver<A, B, E>(Arc<WithLatestFromSink<A, B, E>>);

impl<A: Send, B: Send, E: Send> Observer<B, E> for FromObserver<A, B, E> {
  fn on(&self, event: Event<B, E>) {
    match event {
      Event::Next(b) => *self.0.latest.rc_deref_mut() = Some(b),
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => {}
    }
  }
}
