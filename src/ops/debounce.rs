use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::prelude::*;

/// Emits a value only after `duration` has passed without another value.
/// Every value restarts the timer; a pending value is flushed on completion.
/// Created by [`ObservableExt::debounce`].
pub struct DebounceOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
  pub(crate) duration: Duration,
}

impl<S, SD> Observable for DebounceOp<S, SD>
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

impl<S, SD> Producer for DebounceOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let debounce = Arc::new(DebounceSink {
      sink: SerialSink::new(observer, cancel),
      scheduler: self.scheduler.clone(),
      duration: self.duration,
      state: Mutex::new(DebounceState { id: 0, value: None }),
      timer: SerialDisposable::new(),
    });
    let handle = debounce.sink.handle();
    let source = self.source.actual_subscribe(Box::new(DebounceObserver(debounce.clone())));
    (handle, Subscription::pair(source, Subscription::from(debounce)))
  }
}

struct DebounceState<T> {
  id: u64,
  value: Option<T>,
}

struct DebounceSink<T, E, SD> {
  sink: SerialSink<T, E>,
  scheduler: SD,
  duration: Duration,
  state: Mutex<DebounceState<T>>,
  timer: SerialDisposable,
}

impl<T: Send + 'static, E: Send + 'static, SD: Scheduler + 'static> DebounceSink<T, E, SD> {
  fn propagate(&self, id: u64) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.id == id {
        if let Some(v) = state.value.take() {
          self.sink.push(Event::Next(v));
        }
      }
    }
    self.sink.drain();
  }
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for DebounceSink<T, E, SD> {
  fn dispose(&self) { self.timer.dispose() }
  fn is_disposed(&self) -> bool { self.timer.is_disposed() }
}

struct DebounceObserver<T, E, SD>(Arc<DebounceSink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for DebounceObserver<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let debounce = &self.0;
    match event {
      Event::Next(v) => {
        let id = {
          let mut state = debounce.state.rc_deref_mut();
          state.id = state.id.wrapping_add(1);
          state.value = Some(v);
          state.id
        };
        let c_debounce = debounce.clone();
        let timer = debounce.scheduler.schedule_relative(debounce.duration, move || {
          c_debounce.propagate(id);
          Subscription::empty()
        });
        debounce.timer.set(timer);
      }
      Event::Error(e) => {
        {
          let mut state = debounce.state.rc_deref_mut();
          state.id = state.id.wrapping_add(1);
          state.value = None;
          debounce.sink.push(Event::Error(e));
        }
        debounce.sink.drain();
      }
      Event::Completed => {
        {
          let mut state = debounce.state.rc_deref_mut();
          state.id = state.id.wrapping_add(1);
          if let Some(v) = state.value.take() {
            debounce.sink.push(Event::Next(v));
          }
          debounce.sink.push(Event::Completed);
        }
        debounce.sink.drain();
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use crate::{prelude::*, testing::*};

  #[test]
  fn emits_after_quiet_period() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![
      next(210, 1),
      next(260, 2),
      next(310, 3),
      next(610, 4),
    ]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || source.debounce(Duration::from_millis(200), c_scheduler));
    assert_eq!(res.events(), vec![next(510, 3), next(810, 4)]);
  }

  #[test]
  fn completion_flushes_pending() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), next(220, 2), completed(230)]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || source.debounce(Duration::from_millis(50), c_scheduler));
    assert_eq!(res.events(), vec![next(230, 2), completed(230)]);
  }

  #[test]
  fn error_drops_pending() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_hot_observable::<i32, &str>(vec![next(210, 1), error(220, "boom")]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || source.debounce(Duration::from_millis(50), c_scheduler));
    assert_eq!(res.events(), vec![error(220, "boom")]);
  }
}
