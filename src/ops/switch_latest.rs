use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Mirrors the most recent inner observable, disposing the previous one on
/// every new arrival. Created by [`ObservableExt::switch_latest`] and
/// [`ObservableExt::flat_map_latest`].
///
/// Completes once the outer source has completed and the current inner
/// source, if any, has completed too.
pub struct SwitchLatestOp<S> {
  pub(crate) source: S,
}

impl<S> Observable for SwitchLatestOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
{
  type Item = <S::Item as Observable>::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for SwitchLatestOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let switch = Arc::new(SwitchSink {
      sink: SerialSink::new(observer, cancel),
      state: Mutex::new(SwitchState { latest: 0, has_latest: false, stopped: false }),
      inner: SerialDisposable::new(),
    });
    let handle = switch.sink.handle();
    let outer = self.source.actual_subscribe(Box::new(SwitchOuter(switch.clone())));
    (handle, Subscription::pair(outer, Subscription::from(switch)))
  }
}

struct SwitchState {
  latest: u64,
  has_latest: bool,
  stopped: bool,
}

struct SwitchSink<T, E> {
  sink: SerialSink<T, E>,
  state: Mutex<SwitchState>,
  inner: SerialDisposable,
}

impl<T: Send, E: Send> Disposable for SwitchSink<T, E> {
  fn dispose(&self) { self.inner.dispose() }
  fn is_disposed(&self) -> bool { self.inner.is_disposed() }
}

struct SwitchOuter<T, E>(Arc<SwitchSink<T, E>>);

impl<O> Observer<O, O::Err> for SwitchOuter<O::Item, O::Err>
where
  O: Observable,
{
  fn on(&self, event: Event<O, O::Err>) {
    match event {
      Event::Next(inner) => {
        let id = {
          let mut state = self.0.state.rc_deref_mut();
          state.latest = state.latest.wrapping_add(1);
          state.has_latest = true;
          state.latest
        };
        let slot = Arc::new(SingleAssignmentDisposable::new());
        self.0.inner.set(Subscription::from(slot.clone()));
        slot.set(inner.actual_subscribe(Box::new(SwitchInner { switch: self.0.clone(), id })));
      }
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => {
        {
          let mut state = self.0.state.rc_deref_mut();
          state.stopped = true;
          if !state.has_latest {
            self.0.sink.push(Event::Completed);
          }
        }
        self.0.sink.drain();
      }
    }
  }
}

struct SwitchInner<T, E> {
  switch: Arc<SwitchSink<T, E>>,
  id: u64,
}

impl<T: Send, E: Send> Observer<T, E> for SwitchInner<T, E> {
  fn on(&self, event: Event<T, E>) {
    {
      let mut state = self.switch.state.rc_deref_mut();
      if state.latest != self.id {
        return;
      }
      match event {
        Event::Completed => {
          state.has_latest = false;
          if state.stopped {
            self.switch.sink.push(Event::Completed);
          }
        }
        other => self.switch.sink.push(other),
      }
    }
    self.switch.sink.drain();
  }
}
