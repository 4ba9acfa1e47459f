use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use crate::prelude::*;

/// Shifts every value and the completion forward in time by `delay`.
/// Errors are forwarded immediately and drop the values still waiting.
/// Created by [`ObservableExt::delay`].
pub struct DelayOp<S, SD> {
  pub(crate) source: S,
  pub(crate) delay: Duration,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for DelayOp<S, SD>
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

impl<S, SD> Producer for DelayOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let delay = Arc::new(DelaySink {
      sink: SerialSink::new(observer, cancel),
      scheduler: self.scheduler.clone(),
      delay: self.delay,
      state: Mutex::new(DelayState { queue: VecDeque::new(), running: false }),
      drain_task: SerialDisposable::new(),
    });
    let handle = delay.sink.handle();
    let source = self.source.actual_subscribe(Box::new(DelayObserver(delay.clone())));
    (handle, Subscription::pair(source, Subscription::from(delay)))
  }
}

struct DelayState<T, E> {
  queue: VecDeque<(Instant, Event<T, E>)>,
  running: bool,
}

struct DelaySink<T, E, SD> {
  sink: SerialSink<T, E>,
  scheduler: SD,
  delay: Duration,
  state: Mutex<DelayState<T, E>>,
  drain_task: SerialDisposable,
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for DelaySink<T, E, SD> {
  fn dispose(&self) { self.drain_task.dispose() }
  fn is_disposed(&self) -> bool { self.drain_task.is_disposed() }
}

impl<T, E, SD> DelaySink<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  /// Forwards every due event; returns how long to wait for the next one.
  fn drain_due(&self) -> Option<Duration> {
    let wait = {
      let mut state = self.state.rc_deref_mut();
      let now = self.scheduler.now();
      while state.queue.front().map_or(false, |(due, _)| *due <= now) {
        if let Some((_, event)) = state.queue.pop_front() {
          self.sink.push(event);
        }
      }
      let wait = state.queue.front().map(|(due, _)| due.saturating_duration_since(now));
      state.running = wait.is_some();
      wait
    };
    self.sink.drain();
    wait
  }
}

struct DelayObserver<T, E, SD>(Arc<DelaySink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for DelayObserver<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let delay = &self.0;
    if let Event::Error(e) = event {
      {
        let mut state = delay.state.rc_deref_mut();
        state.queue.clear();
        delay.sink.push(Event::Error(e));
      }
      delay.sink.drain();
      return;
    }
    let start = {
      let mut state = delay.state.rc_deref_mut();
      let due = delay.scheduler.now() + delay.delay;
      state.queue.push_back((due, event));
      !std::mem::replace(&mut state.running, true)
    };
    if start {
      let c_delay = delay.clone();
      let task =
        delay.scheduler.schedule_recursive_after((), Some(delay.delay), move |_, recursion| {
          if let Some(wait) = c_delay.drain_due() {
            recursion.again_after((), wait);
          }
        });
      delay.drain_task.set(task);
    }
  }
}

/// Subscribes to the source only after `delay`. Created by
/// [`ObservableExt::delay_subscription`].
pub struct DelaySubscriptionOp<S, SD> {
  pub(crate) source: Arc<S>,
  pub(crate) delay: Duration,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for DelaySubscriptionOp<S, SD>
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

impl<S, SD> Producer for DelaySubscriptionOp<S, SD>
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
    let subscription = self.scheduler.schedule_relative(self.delay, move || {
      source.actual_subscribe(Box::new(DelayedSubscriber(sink)))
    });
    (handle, subscription)
  }
}

struct DelayedSubscriber<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<T, E> for DelayedSubscriber<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}
