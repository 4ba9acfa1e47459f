use std::sync::Arc;

use crate::prelude::*;

/// Routes source errors into an observable handed to `notifier_factory`;
/// the notifier it returns decides what happens next. A value from the
/// notifier resubscribes to the source, its completion completes the
/// sequence and its error terminates the sequence with that error. Created
/// by [`ObservableExt::retry_when`].
pub struct RetryWhenOp<S, F> {
  pub(crate) source: Arc<S>,
  pub(crate) notifier_factory: Arc<F>,
}

impl<S, F, N> Observable for RetryWhenOp<S, F>
where
  S: Observable,
  S::Err: Clone + Sync,
  F: Fn(PublishSubject<S::Err, S::Err>) -> N + Send + Sync + 'static,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, N> Producer for RetryWhenOp<S, F>
where
  S: Observable,
  S::Err: Clone + Sync,
  F: Fn(PublishSubject<S::Err, S::Err>) -> N + Send + Sync + 'static,
  N: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let errors = PublishSubject::new();
    let notifier = (self.notifier_factory)(errors.clone());
    let retry = Arc::new(RetryWhenSink {
      sink: SerialSink::new(observer, cancel),
      source: self.source.clone(),
      errors,
      subscription: SerialDisposable::new(),
      notifier: SingleAssignmentDisposable::new(),
    });
    let handle = retry.sink.handle();
    retry.notifier.set(notifier.actual_subscribe(Box::new(NotifierObserver(retry.clone()))));
    retry.subscribe_source();
    (handle, Subscription::from(retry))
  }
}

struct RetryWhenSink<S: Observable> {
  sink: SerialSink<S::Item, S::Err>,
  source: Arc<S>,
  errors: PublishSubject<S::Err, S::Err>,
  subscription: SerialDisposable,
  notifier: SingleAssignmentDisposable,
}

impl<S> RetryWhenSink<S>
where
  S: Observable,
  S::Err: Clone + Sync,
{
  fn subscribe_source(self: &Arc<Self>) {
    if self.sink.is_disposed() {
      return;
    }
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.subscription.set(Subscription::from(slot.clone()));
    slot.set(self.source.actual_subscribe(Box::new(SourceObserver(self.clone()))));
  }
}

impl<S: Observable> Disposable for RetryWhenSink<S> {
  fn dispose(&self) {
    self.subscription.dispose();
    self.notifier.dispose();
  }

  fn is_disposed(&self) -> bool { self.subscription.is_disposed() }
}

struct SourceObserver<S: Observable>(Arc<RetryWhenSink<S>>);

impl<S> Observer<S::Item, S::Err> for SourceObserver<S>
where
  S: Observable,
  S::Err: Clone + Sync,
{
  fn on(&self, event: Event<S::Item, S::Err>) {
    match event {
      Event::Error(e) => {
        if let Some(attempt) = self.0.subscription.current() {
          attempt.dispose();
        }
        self.0.errors.next(e)
      }
      event => self.0.sink.forward_on(event),
    }
  }
}

struct NotifierObserver<S: Observable>(Arc<RetryWhenSink<S>>);

impl<S, U> Observer<U, S::Err> for NotifierObserver<S>
where
  S: Observable,
  S::Err: Clone + Sync,
{
  fn on(&self, event: Event<U, S::Err>) {
    let retry = &self.0;
    match event {
      Event::Next(_) => {
        tracing::debug!("notifier requested resubscription");
        let c_retry = retry.clone();
        let pending = Arc::new(SingleAssignmentDisposable::new());
        retry.subscription.set(Subscription::from(pending.clone()));
        pending.set(CurrentThreadScheduler.schedule(move || {
          c_retry.subscribe_source();
          Subscription::empty()
        }));
      }
      Event::Error(e) => retry.sink.forward_on(Event::Error(e)),
      Event::Completed => retry.sink.forward_on(Event::Completed),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::*};

  #[test]
  fn notifier_values_resubscribe() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_cold_observable::<i32, &str>(vec![next(10, 1), error(20, "boom")]);
    let c_source = source.clone();
    let res = scheduler.start(move || c_source.retry_when(|errors| errors.take(2)));
    assert_eq!(res.events(), vec![next(210, 1), next(230, 1), completed(240)]);
    assert_eq!(source.subscriptions().len(), 3);
  }

  #[test]
  fn notifier_error_terminates() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_cold_observable::<i32, &str>(vec![next(10, 1), error(20, "boom")]);
    let res = scheduler.start(move || {
      source.retry_when(|errors| {
        errors.try_map(|e| if e == "boom" { Err("fatal") } else { Ok(e) })
      })
    });
    assert_eq!(res.events(), vec![next(210, 1), error(220, "fatal")]);
  }

  #[test]
  fn notifier_delays_resubscription() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_cold_observable::<i32, &str>(vec![next(5, 1), error(10, "boom")]);
    let c_source = source.clone();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      let c_scheduler = c_scheduler.clone();
      c_source.retry_when(move |errors| {
        errors
          .enumerate()
          .filter(|(attempt, _)| *attempt == 0)
          .delay(std::time::Duration::from_millis(50), c_scheduler.clone())
      })
    });
    assert_eq!(res.events(), vec![next(205, 1), next(265, 1)]);
    assert_eq!(
      source.subscriptions(),
      vec![SubscriptionLog::new(200, 210), SubscriptionLog::new(260, 270)]
    );
  }
}
