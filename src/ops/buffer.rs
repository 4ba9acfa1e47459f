//! Buffer operator implementation
//!
//! Collects values into `Vec`s that are emitted when `time_span` elapses or
//! `count` values have been collected, whichever comes first. A flush
//! restarts the timer. Timers are tagged with the window id current when
//! they were scheduled so that a timer outrun by a count flush is ignored.
//! Timer flushes emit empty buffers too.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::prelude::*;

pub struct BufferOp<S, SD> {
  pub(crate) source: S,
  pub(crate) time_span: Duration,
  pub(crate) count: usize,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for BufferOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Vec<S::Item>, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, SD> Producer for BufferOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Vec<S::Item>, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    assert!(self.count > 0, "buffer count must be positive");
    let buffer = Arc::new(BufferSink {
      sink: SerialSink::new(observer, cancel),
      time_span: self.time_span,
      count: self.count,
      scheduler: self.scheduler.clone(),
      state: Mutex::new(BufferState { buffer: Vec::new(), window_id: 0 }),
      timer: SerialDisposable::new(),
    });
    let handle = buffer.sink.handle();
    buffer.create_timer(0);
    let source = self.source.actual_subscribe(Box::new(BufferObserver(buffer.clone())));
    (handle, Subscription::pair(source, Subscription::from(buffer)))
  }
}

struct BufferState<T> {
  buffer: Vec<T>,
  window_id: u64,
}

struct BufferSink<T, E, SD> {
  sink: SerialSink<Vec<T>, E>,
  time_span: Duration,
  count: usize,
  scheduler: SD,
  state: Mutex<BufferState<T>>,
  timer: SerialDisposable,
}

impl<T, E, SD> BufferSink<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  /// Emits the current buffer and opens the next window. Must be called with
  /// the state locked; returns the new window id.
  fn flush(&self, state: &mut BufferState<T>) -> u64 {
    state.window_id = state.window_id.wrapping_add(1);
    self.sink.push(Event::Next(std::mem::take(&mut state.buffer)));
    state.window_id
  }

  fn create_timer(self: &Arc<Self>, window_id: u64) {
    if self.timer.is_disposed() {
      return;
    }
    let buffer = self.clone();
    let timer = self.scheduler.schedule_relative(self.time_span, move || {
      let next_id = {
        let mut state = buffer.state.rc_deref_mut();
        (state.window_id == window_id).then(|| buffer.flush(&mut state))
      };
      buffer.sink.drain();
      if let Some(next_id) = next_id {
        buffer.create_timer(next_id);
      }
      Subscription::empty()
    });
    self.timer.set(timer);
  }
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for BufferSink<T, E, SD> {
  fn dispose(&self) { self.timer.dispose() }
  fn is_disposed(&self) -> bool { self.timer.is_disposed() }
}

struct BufferObserver<T, E, SD>(Arc<BufferSink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for BufferObserver<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let buffer = &self.0;
    let mut next_timer = None;
    {
      let mut state = buffer.state.rc_deref_mut();
      match event {
        Event::Next(v) => {
          state.buffer.push(v);
          if state.buffer.len() == buffer.count {
            next_timer = Some(buffer.flush(&mut state));
          }
        }
        Event::Error(e) => {
          state.buffer.clear();
          buffer.sink.push(Event::Error(e));
        }
        Event::Completed => {
          buffer.sink.push(Event::Next(std::mem::take(&mut state.buffer)));
          buffer.sink.push(Event::Completed);
        }
      }
    }
    buffer.sink.drain();
    if let Some(id) = next_timer {
      buffer.create_timer(id);
    }
  }
}
