use std::sync::Arc;

use crate::prelude::*;

/// Performs the subscription to the source, and its disposal, on the given
/// scheduler. Created by [`ObservableExt::subscribe_on`].
pub struct SubscribeOnOp<S, SD> {
  pub(crate) source: Arc<S>,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for SubscribeOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, SD> Producer for SubscribeOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let source = self.source.clone();
    let scheduler = self.scheduler.clone();
    let subscription = self.scheduler.schedule(move || {
      let inner = source.actual_subscribe(Box::new(SubscribeOnSink(sink)));
      Subscription::new(ScheduledDisposable::new(scheduler, inner))
    });
    (handle, subscription)
  }
}

struct SubscribeOnSink<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<T, E> for SubscribeOnSink<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::*};

  #[test]
  fn subscribes_when_scheduler_runs() {
    let scheduler = VirtualTimeScheduler::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let observer = TestObserver::<i32, ()>::new();
    observable::defer(move || {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      observable::of([1, 2])
    })
    .subscribe_on(scheduler.clone())
    .subscribe_with(observer.clone());
    assert_eq!(subscribed.load(Ordering::SeqCst), 0);
    scheduler.start();
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(observer.values(), vec![1, 2]);
  }

  #[test]
  fn disposal_runs_on_scheduler() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![next(300, 1)]);
    let c_source = source.clone();
    let observer = TestObserver::<i32, ()>::new();
    let subscription = c_source.subscribe_on(scheduler.clone()).subscribe_with(observer.clone());
    scheduler.advance_to(250);
    subscription.dispose();
    scheduler.advance_to(260);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(0, 250)]);
    assert!(observer.events().is_empty());
  }
}
