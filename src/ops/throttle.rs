use std::{
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use crate::prelude::*;

/// Emits a value, then ignores values for `duration`. With `latest` set, the
/// last value ignored during the window is emitted when the window closes.
/// Created by [`ObservableExt::throttle`].
pub struct ThrottleOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
  pub(crate) duration: Duration,
  pub(crate) latest: bool,
}

impl<S, SD> Observable for ThrottleOp<S, SD>
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

impl<S, SD> Producer for ThrottleOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let throttle = Arc::new(ThrottleSink {
      sink: SerialSink::new(observer, cancel),
      scheduler: self.scheduler.clone(),
      duration: self.duration,
      latest: self.latest,
      state: Mutex::new(ThrottleState { last_unsent: None, last_sent_at: None, completed: false }),
      timer: SerialDisposable::new(),
    });
    let handle = throttle.sink.handle();
    let source = self.source.actual_subscribe(Box::new(ThrottleObserver(throttle.clone())));
    (handle, Subscription::pair(source, Subscription::from(throttle)))
  }
}

struct ThrottleState<T> {
  last_unsent: Option<T>,
  last_sent_at: Option<Instant>,
  completed: bool,
}

struct ThrottleSink<T, E, SD> {
  sink: SerialSink<T, E>,
  scheduler: SD,
  duration: Duration,
  latest: bool,
  state: Mutex<ThrottleState<T>>,
  timer: SerialDisposable,
}

impl<T: Send, E: Send, SD: Scheduler> ThrottleSink<T, E, SD> {
  fn send_now(&self, state: &mut ThrottleState<T>, value: T) {
    state.last_unsent = None;
    self.sink.push(Event::Next(value));
    state.last_sent_at = Some(self.scheduler.now());
  }

  fn propagate(&self) {
    {
      let mut state = self.state.rc_deref_mut();
      if let Some(v) = state.last_unsent.take() {
        self.send_now(&mut state, v);
      }
      if state.completed {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for ThrottleSink<T, E, SD> {
  fn dispose(&self) { self.timer.dispose() }
  fn is_disposed(&self) -> bool { self.timer.is_disposed() }
}

struct ThrottleObserver<T, E, SD>(Arc<ThrottleSink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for ThrottleObserver<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let throttle = &self.0;
    let mut schedule_after = None;
    {
      let mut state = throttle.state.rc_deref_mut();
      match event {
        Event::Next(v) => {
          let now = throttle.scheduler.now();
          let elapsed = state.last_sent_at.map(|at| now.saturating_duration_since(at));
          match elapsed {
            Some(elapsed) if elapsed < throttle.duration => {
              if throttle.latest {
                let in_flight = state.last_unsent.is_some();
                state.last_unsent = Some(v);
                if !in_flight {
                  schedule_after = Some(throttle.duration - elapsed);
                }
              }
            }
            _ => throttle.send_now(&mut state, v),
          }
        }
        Event::Error(e) => {
          state.last_unsent = None;
          throttle.sink.push(Event::Error(e));
        }
        Event::Completed => {
          if state.last_unsent.is_some() {
            state.completed = true;
          } else {
            throttle.sink.push(Event::Completed);
          }
        }
      }
    }
    throttle.sink.drain();
    if let Some(due) = schedule_after {
      let c_throttle = throttle.clone();
      let timer = throttle.scheduler.schedule_relative(due, move || {
        c_throttle.propagate();
        Subscription::empty()
      });
      throttle.timer.set(timer);
    }
  }
}
