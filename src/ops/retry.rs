//! Retry operator implementation
//!
//! Resubscribes to the source when it errors, as directed by a
//! [`RetryPolicy`]. A plain `usize` is the maximum number of subscription
//! attempts; [`RetryConfig`] adds a delay between attempts and resetting the
//! attempt counter after a successful value.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rxcore::{ops::retry::RetryConfig, prelude::*};
//!
//! let config = RetryConfig::new().count(5).delay(Duration::from_secs(1)).reset_on_success();
//! assert_eq!(RetryPolicy::<()>::should_retry(&config, &(), 4), Some(Duration::from_secs(1)));
//! assert_eq!(RetryPolicy::<()>::should_retry(&config, &(), 5), None);
//! ```

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::prelude::*;

/// Decides whether an error is retried and after how long.
///
/// `attempt` is the number of retries already made for the current failure
/// streak (0 for the first error).
pub trait RetryPolicy<Err>: Send + Sync + 'static {
  /// `Some(delay)` to resubscribe after `delay`, `None` to forward the error.
  fn should_retry(&self, err: &Err, attempt: usize) -> Option<Duration>;

  /// Whether a value from the source resets the attempt counter.
  fn reset_on_success(&self) -> bool { false }
}

/// At most `self` subscription attempts in total; `0` behaves like `1`.
impl<Err> RetryPolicy<Err> for usize {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    (attempt + 1 < *self).then_some(Duration::ZERO)
  }
}

/// Builder for a retry policy: number of retries, delay between them and
/// whether a value resets the count.
#[derive(Debug, Clone, Default)]
pub struct RetryConfig {
  count: Option<usize>,
  delay: Option<Duration>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retries forever, without delay.
  pub fn new() -> Self { Self::default() }

  /// Maximum number of retries; `count(3)` allows up to 4 subscriptions.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  pub fn delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

impl<Err> RetryPolicy<Err> for RetryConfig {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    match self.count {
      Some(count) if attempt >= count => None,
      _ => Some(self.delay.unwrap_or(Duration::ZERO)),
    }
  }

  fn reset_on_success(&self) -> bool { self.reset_on_success }
}

pub struct RetryOp<S, P, SD> {
  pub(crate) source: Arc<S>,
  pub(crate) policy: Arc<P>,
  pub(crate) scheduler: SD,
}

impl<S, P, SD> Observable for RetryOp<S, P, SD>
where
  S: Observable,
  P: RetryPolicy<S::Err>,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, P, SD> Producer for RetryOp<S, P, SD>
where
  S: Observable,
  P: RetryPolicy<S::Err>,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let retry = Arc::new(RetrySink {
      sink: Sink::new(observer, cancel),
      source: self.source.clone(),
      policy: self.policy.clone(),
      scheduler: self.scheduler.clone(),
      attempts: Mutex::new(0),
      subscription: SerialDisposable::new(),
    });
    let handle = retry.sink.handle();
    retry.subscribe_source();
    (handle, Subscription::from(retry))
  }
}

struct RetrySink<S: Observable, P, SD> {
  sink: Sink<S::Item, S::Err>,
  source: Arc<S>,
  policy: Arc<P>,
  scheduler: SD,
  attempts: Mutex<usize>,
  subscription: SerialDisposable,
}

impl<S, P, SD> RetrySink<S, P, SD>
where
  S: Observable,
  P: RetryPolicy<S::Err>,
  SD: Scheduler + 'static,
{
  fn subscribe_source(self: &Arc<Self>) {
    // A synchronous error replaces `subscription` before `actual_subscribe`
    // returns; the slot keeps this attempt's handle from overwriting it.
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.subscription.set(Subscription::from(slot.clone()));
    slot.set(self.source.actual_subscribe(Box::new(RetryObserver(self.clone()))));
  }
}

impl<S: Observable, P: Send + Sync, SD: Scheduler> Disposable for RetrySink<S, P, SD> {
  fn dispose(&self) { self.subscription.dispose() }
  fn is_disposed(&self) -> bool { self.subscription.is_disposed() }
}

struct RetryObserver<S: Observable, P, SD>(Arc<RetrySink<S, P, SD>>);

impl<S, P, SD> Observer<S::Item, S::Err> for RetryObserver<S, P, SD>
where
  S: Observable,
  P: RetryPolicy<S::Err>,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<S::Item, S::Err>) {
    let retry = &self.0;
    match event {
      Event::Next(v) => {
        if retry.policy.reset_on_success() {
          *retry.attempts.rc_deref_mut() = 0;
        }
        retry.sink.next(v);
      }
      Event::Error(e) => {
        if retry.sink.is_disposed() {
          return;
        }
        let decision = {
          let mut attempts = retry.attempts.rc_deref_mut();
          let decision = retry.policy.should_retry(&e, *attempts).map(|delay| (*attempts, delay));
          if decision.is_some() {
            *attempts += 1;
          }
          decision
        };
        match decision {
          Some((attempt, delay)) => {
            tracing::debug!(attempt = attempt + 1, ?delay, "resubscribing after error");
            let pending = Arc::new(SingleAssignmentDisposable::new());
            retry.subscription.set(Subscription::from(pending.clone()));
            let c_retry = retry.clone();
            pending.set(retry.scheduler.schedule_relative(delay, move || {
              c_retry.subscribe_source();
              Subscription::empty()
            }));
          }
          None => retry.sink.error(e),
        }
      }
      Event::Completed => retry.sink.complete(),
    }
  }
}
