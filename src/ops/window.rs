//! Window operator implementation
//!
//! Like `buffer`, but each window is emitted as an observable as soon as it
//! opens and receives values live. Window observables keep the upstream
//! subscription alive while subscribed, even after the outer sequence has
//! been disposed.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::prelude::*;

pub struct WindowOp<S, SD> {
  pub(crate) source: S,
  pub(crate) time_span: Duration,
  pub(crate) count: usize,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for WindowOp<S, SD>
where
  S: Observable,
  S::Item: Clone + Sync,
  S::Err: Clone + Sync,
  SD: Scheduler + Clone + 'static,
{
  type Item = BoxedObservable<S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, SD> Producer for WindowOp<S, SD>
where
  S: Observable,
  S::Item: Clone + Sync,
  S::Err: Clone + Sync,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    assert!(self.count > 0, "window count must be positive");
    let group = Arc::new(CompositeDisposable::new());
    let ref_count = RefCountDisposable::new(Subscription::from(group.clone()));
    let first = PublishSubject::new();
    let window = Arc::new(WindowSink {
      sink: Sink::new(observer, cancel),
      time_span: self.time_span,
      count: self.count,
      scheduler: self.scheduler.clone(),
      ref_count: ref_count.clone(),
      state: Mutex::new(WindowState { subject: first.clone(), count: 0, window_id: 0 }),
      commands: Serializer::new(),
      timer: SerialDisposable::new(),
    });
    let handle = window.sink.handle();
    group.insert(Subscription::from(window.clone()));
    window.commands.push(WindowCommand::Outer(Event::Next(window.window_observable(first))));
    window.drain();
    window.create_timer(0);
    group.insert(self.source.actual_subscribe(Box::new(WindowObserver(window))));
    (handle, Subscription::new(ref_count))
  }
}

enum WindowCommand<T, E> {
  Inner(PublishSubject<T, E>, Event<T, E>),
  Outer(Event<BoxedObservable<T, E>, E>),
}

struct WindowState<T, E> {
  subject: PublishSubject<T, E>,
  count: usize,
  window_id: u64,
}

struct WindowSink<T, E, SD> {
  sink: Sink<BoxedObservable<T, E>, E>,
  time_span: Duration,
  count: usize,
  scheduler: SD,
  ref_count: RefCountDisposable,
  state: Mutex<WindowState<T, E>>,
  commands: Serializer<WindowCommand<T, E>>,
  timer: SerialDisposable,
}

impl<T, E, SD> WindowSink<T, E, SD>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
  SD: Scheduler + 'static,
{
  fn window_observable(&self, subject: PublishSubject<T, E>) -> BoxedObservable<T, E> {
    Arc::new(WindowObservable { subject, ref_count: self.ref_count.clone() })
  }

  /// Closes the current window and opens the next one. Must be called with
  /// the state locked; returns the new window id.
  fn start_new_window(&self, state: &mut WindowState<T, E>) -> u64 {
    let next = PublishSubject::new();
    let previous = std::mem::replace(&mut state.subject, next.clone());
    state.count = 0;
    state.window_id = state.window_id.wrapping_add(1);
    self.commands.push(WindowCommand::Inner(previous, Event::Completed));
    self.commands.push(WindowCommand::Outer(Event::Next(self.window_observable(next))));
    state.window_id
  }

  fn drain(&self) {
    self.commands.drain(|command| match command {
      WindowCommand::Inner(subject, event) => subject.on(event),
      WindowCommand::Outer(event) => self.sink.forward_on(event),
    })
  }

  fn create_timer(self: &Arc<Self>, window_id: u64) {
    if self.timer.is_disposed() {
      return;
    }
    let window = self.clone();
    let timer = self.scheduler.schedule_relative(self.time_span, move || {
      let next_id = {
        let mut state = window.state.rc_deref_mut();
        (state.window_id == window_id).then(|| window.start_new_window(&mut state))
      };
      window.drain();
      if let Some(next_id) = next_id {
        window.create_timer(next_id);
      }
      Subscription::empty()
    });
    self.timer.set(timer);
  }
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for WindowSink<T, E, SD> {
  fn dispose(&self) { self.timer.dispose() }
  fn is_disposed(&self) -> bool { self.timer.is_disposed() }
}

struct WindowObserver<T, E, SD>(Arc<WindowSink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for WindowObserver<T, E, SD>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let window = &self.0;
    let mut next_timer = None;
    {
      let mut state = window.state.rc_deref_mut();
      match event {
        Event::Next(v) => {
          window.commands.push(WindowCommand::Inner(state.subject.clone(), Event::Next(v)));
          state.count += 1;
          if state.count == window.count {
            next_timer = Some(window.start_new_window(&mut state));
          }
        }
        Event::Error(e) => {
          window
            .commands
            .push(WindowCommand::Inner(state.subject.clone(), Event::Error(e.clone())));
          window.commands.push(WindowCommand::Outer(Event::Error(e)));
        }
        Event::Completed => {
          window.commands.push(WindowCommand::Inner(state.subject.clone(), Event::Completed));
          window.commands.push(WindowCommand::Outer(Event::Completed));
        }
      }
    }
    window.drain();
    if let Some(id) = next_timer {
      window.create_timer(id);
    }
  }
}

/// One emitted window: the window's subject plus a retained reference on
/// the upstream subscription.
struct WindowObservable<T, E> {
  subject: PublishSubject<T, E>,
  ref_count: RefCountDisposable,
}

impl<T, E> Observable for WindowObservable<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    let retained = self.ref_count.retain();
    Subscription::pair(retained, self.subject.actual_subscribe(observer))
  }
}
