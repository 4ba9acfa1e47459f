use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::prelude::*;

/// Mirrors the source until `notifier` emits, then completes. Created by
/// [`ObservableExt::take_until`].
pub struct TakeUntilOp<S, N> {
  pub(crate) source: S,
  pub(crate) notifier: N,
}

impl<S, N> Observable for TakeUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, N> Producer for TakeUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Arc::new(SerialSink::new(observer, cancel));
    let handle = sink.handle();
    let notifier = self.notifier.actual_subscribe(Box::new(TakeUntilNotifier(sink.clone())));
    let source = self.source.actual_subscribe(Box::new(ForwardSink(sink)));
    (handle, Subscription::pair(notifier, source))
  }
}

pub(crate) struct ForwardSink<T, E>(pub(crate) Arc<SerialSink<T, E>>);

impl<T: Send, E: Send> Observer<T, E> for ForwardSink<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}

struct TakeUntilNotifier<T, E>(Arc<SerialSink<T, E>>);

impl<T: Send, U, E: Send> Observer<U, E> for TakeUntilNotifier<T, E> {
  fn on(&self, event: Event<U, E>) {
    match event {
      Event::Next(_) => self.0.forward_on(Event::Completed),
      Event::Error(e) => self.0.forward_on(Event::Error(e)),
      Event::Completed => {}
    }
  }
}

/// Drops source values until `notifier` emits. Created by
/// [`ObservableExt::skip_until`].
pub struct SkipUntilOp<S, N> {
  pub(crate) source: S,
  pub(crate) notifier: N,
}

impl<S, N> Observable for SkipUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, N> Producer for SkipUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let skip_until = Arc::new(SkipUntilSink {
      sink: SerialSink::new(observer, cancel),
      forwarding: AtomicBool::new(false),
      notifier: SingleAssignmentDisposable::new(),
    });
    let handle = skip_until.sink.handle();
    let source = self.source.actual_subscribe(Box::new(skip_until.clone()));
    let notifier = self.notifier.actual_subscribe(Box::new(SkipUntilNotifier(skip_until.clone())));
    skip_until.notifier.set(notifier);
    (handle, Subscription::pair(source, Subscription::from(skip_until)))
  }
}

struct SkipUntilSink<T, E> {
  sink: SerialSink<T, E>,
  forwarding: AtomicBool,
  notifier: SingleAssignmentDisposable,
}

impl<T: Send, E: Send> Observer<T, E> for SkipUntilSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        if self.forwarding.load(Ordering::Acquire) {
          self.sink.forward_on(Event::Next(v))
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

impl<T: Send, E: Send> Disposable for SkipUntilSink<T, E> {
  fn dispose(&self) { self.notifier.dispose() }
  fn is_disposed(&self) -> bool { self.notifier.is_disposed() }
}

struct SkipUntilNotifier<T, E>(Arc<SkipUntilSink<T, E>>);

impl<T: Send, U, E: Send> Observer<U, E> for SkipUntilNotifier<T, E> {
  fn on(&self, event: Event<U, E>) {
    match event {
      Event::Next(_) => {
        self.0.forwarding.store(true, Ordering::Release);
        self.0.notifier.dispose();
      }
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => {}
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::*};

  #[test]
  fn take_until_notifier_fires() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![
      next(150, 1),
      next(210, 2),
      next(220, 3),
      next(240, 4),
      completed(300),
    ]);
    let notifier = scheduler.create_hot_observable(vec![next(230, ()), completed(500)]);
    let c_source = source.clone();
    let c_notifier = notifier.clone();
    let res = scheduler.start(move || c_source.take_until(c_notifier));
    assert_eq!(res.events(), vec![next(210, 2), next(220, 3), completed(230)]);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 230)]);
    assert_eq!(notifier.subscriptions(), vec![SubscriptionLog::new(200, 230)]);
  }

  #[test]
  fn take_until_notifier_completes_silently() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![next(210, 2), completed(300)]);
    let notifier = scheduler.create_hot_observable::<(), ()>(vec![completed(220)]);
    let res = scheduler.start(move || source.take_until(notifier));
    assert_eq!(res.events(), vec![next(210, 2), completed(300)]);
  }

  #[test]
  fn skip_until_notifier_fires() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![
      next(210, 2),
      next(220, 3),
      next(240, 4),
      completed(300),
    ]);
    let notifier = scheduler.create_hot_observable(vec![next(225, "go")]);
    let res = scheduler.start(move || source.skip_until(notifier));
    assert_eq!(res.events(), vec![next(240, 4), completed(300)]);
  }
}
