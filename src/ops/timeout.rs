//! Timeout operator implementation
//!
//! A timer is started on subscription and restarted by every value. If it
//! fires before the next event, the source is disposed and the sequence
//! switches to a fallback observable; `timeout` uses a fallback that errors
//! with [`RxError::Timeout`].
//!
//! Each timer carries the generation id current when it was scheduled; any
//! event bumps the id, so a timer that lost the race is ignored.

use std::{
  marker::PhantomData,
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::prelude::*;

pub struct TimeoutOp<S, O, SD> {
  pub(crate) source: S,
  pub(crate) due: Duration,
  pub(crate) other: Arc<O>,
  pub(crate) scheduler: SD,
}

impl<S, O, SD> Observable for TimeoutOp<S, O, SD>
where
  S: Observable,
  O: Observable<Item = S::Item, Err = S::Err>,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, O, SD> Producer for TimeoutOp<S, O, SD>
where
  S: Observable,
  O: Observable<Item = S::Item, Err = S::Err>,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let timeout = Arc::new(TimeoutSink {
      sink: SerialSink::new(observer, cancel),
      due: self.due,
      other: self.other.clone(),
      scheduler: self.scheduler.clone(),
      state: Mutex::new(TimeoutState { id: 0, switched: false }),
      subscription: SerialDisposable::new(),
      timer: SerialDisposable::new(),
    });
    let handle = timeout.sink.handle();
    let original = Arc::new(SingleAssignmentDisposable::new());
    timeout.subscription.set(Subscription::from(original.clone()));
    timeout.create_timer(0);
    original.set(self.source.actual_subscribe(Box::new(TimeoutObserver(timeout.clone()))));
    (handle, Subscription::from(timeout))
  }
}

struct TimeoutState {
  id: u64,
  switched: bool,
}

struct TimeoutSink<O: Observable, SD> {
  sink: SerialSink<O::Item, O::Err>,
  due: Duration,
  other: Arc<O>,
  scheduler: SD,
  state: Mutex<TimeoutState>,
  subscription: SerialDisposable,
  timer: SerialDisposable,
}

impl<O: Observable, SD: Scheduler + 'static> TimeoutSink<O, SD> {
  fn create_timer(self: &Arc<Self>, id: u64) {
    if self.timer.is_disposed() {
      return;
    }
    let timeout = self.clone();
    let timer = self.scheduler.schedule_relative(self.due, move || {
      let wins = {
        let mut state = timeout.state.rc_deref_mut();
        state.switched = state.id == id;
        state.switched
      };
      if wins {
        tracing::debug!(due = ?timeout.due, "timeout elapsed, switching to fallback");
        let fallback = timeout.other.actual_subscribe(Box::new(FallbackObserver(timeout.clone())));
        timeout.subscription.set(fallback);
      }
      Subscription::empty()
    });
    self.timer.set(timer);
  }
}

impl<O: Observable, SD: Scheduler> Disposable for TimeoutSink<O, SD> {
  fn dispose(&self) {
    self.subscription.dispose();
    self.timer.dispose();
  }

  fn is_disposed(&self) -> bool { self.subscription.is_disposed() }
}

struct TimeoutObserver<O: Observable, SD>(Arc<TimeoutSink<O, SD>>);

impl<O: Observable, SD: Scheduler + 'static> Observer<O::Item, O::Err> for TimeoutObserver<O, SD> {
  fn on(&self, event: Event<O::Item, O::Err>) {
    let timeout = &self.0;
    let is_next = !event.is_stop_event();
    let next_id = {
      let mut state = timeout.state.rc_deref_mut();
      if state.switched {
        return;
      }
      state.id = state.id.wrapping_add(1);
      timeout.sink.push(event);
      state.id
    };
    timeout.sink.drain();
    if is_next {
      timeout.create_timer(next_id);
    }
  }
}

struct FallbackObserver<O: Observable, SD>(Arc<TimeoutSink<O, SD>>);

impl<O: Observable, SD: Scheduler> Observer<O::Item, O::Err> for FallbackObserver<O, SD> {
  fn on(&self, event: Event<O::Item, O::Err>) { self.0.sink.forward_on(event) }
}

/// Fallback used by [`ObservableExt::timeout`]: errors with
/// [`RxError::Timeout`] on subscription.
pub struct TimeoutError<I, E>(PhantomData<fn() -> (I, E)>);

impl<I, E> Default for TimeoutError<I, E> {
  fn default() -> Self { Self(PhantomData) }
}

impl<I, E> Observable for TimeoutError<I, E>
where
  I: Send + 'static,
  E: From<RxError> + Send + 'static,
{
  type Item = I;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<I, E>) -> Subscription {
    observer.error(RxError::Timeout.into());
    Subscription::empty()
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use crate::{prelude::*, testing::*};

  #[test]
  fn values_in_time_pass_through() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, RxError>(vec![
      next(210, 1),
      next(240, 2),
      next(270, 3),
      completed(290),
    ]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || source.timeout(Duration::from_millis(50), c_scheduler));
    assert_eq!(res.events(), vec![next(210, 1), next(240, 2), next(270, 3), completed(290)]);
  }

  #[test]
  fn errors_when_silent() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, RxError>(vec![next(210, 1), next(300, 2)]);
    let c_source = source.clone();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || c_source.timeout(Duration::from_millis(50), c_scheduler));
    assert_eq!(res.events(), vec![next(210, 1), error(260, RxError::Timeout)]);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 260)]);
  }

  #[test]
  fn switches_to_fallback() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), next(300, 2)]);
    let fallback = scheduler.create_cold_observable(vec![next(10, 100), completed(20)]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      source.timeout_with(Duration::from_millis(50), fallback, c_scheduler)
    });
    assert_eq!(res.events(), vec![next(210, 1), next(270, 100), completed(280)]);
  }
}
