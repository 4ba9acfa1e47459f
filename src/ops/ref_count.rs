use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Turns a [`Connectable`] back into an ordinary observable: the first
/// subscriber connects it, the last one to leave disconnects it. Created by
/// [`Connectable::ref_count`].
///
/// Connections are numbered; a subscriber only ever releases the connection
/// it was counted against, so a late release from an earlier connection
/// cannot tear down a newer one.
pub struct RefCountOp<C> {
  source: C,
  state: Arc<Mutex<RefCountState>>,
}

#[derive(Default)]
struct RefCountState {
  count: usize,
  connection: Option<Subscription>,
  connection_id: u64,
}

impl<C> RefCountOp<C> {
  pub(crate) fn new(source: C) -> Self {
    Self { source, state: Arc::new(Mutex::new(RefCountState::default())) }
  }
}

impl<C: Clone> Clone for RefCountOp<C> {
  fn clone(&self) -> Self { Self { source: self.source.clone(), state: self.state.clone() } }
}

impl<C: Connectable> Observable for RefCountOp<C> {
  type Item = C::Item;
  type Err = C::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<C::Item, C::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<C: Connectable> Producer for RefCountOp<C> {
  fn run(
    &self,
    observer: BoxedObserver<C::Item, C::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let subscription = self.source.actual_subscribe(Box::new(RefCountSink(sink)));

    let (first, id) = {
      let mut state = self.state.rc_deref_mut();
      state.count += 1;
      tracing::trace!(subscribers = state.count, "ref_count subscribed");
      (state.count == 1, state.connection_id)
    };
    if first {
      let connection = self.source.connect();
      let stale = {
        let mut state = self.state.rc_deref_mut();
        if state.connection_id == id && state.count > 0 {
          state.connection = Some(connection);
          None
        } else {
          Some(connection)
        }
      };
      if let Some(stale) = stale {
        stale.dispose();
      }
    }

    let state = self.state.clone();
    let release = Subscription::from_fn(move || {
      let connection = {
        let mut state = state.rc_deref_mut();
        if state.connection_id != id {
          return;
        }
        state.count -= 1;
        tracing::trace!(subscribers = state.count, "ref_count released");
        if state.count == 0 {
          state.connection_id += 1;
          state.connection.take()
        } else {
          None
        }
      };
      if let Some(connection) = connection {
        tracing::debug!("last subscriber left, disconnecting");
        connection.dispose();
      }
    });
    (handle, Subscription::pair(subscription, release))
  }
}

struct RefCountSink<T, E>(Sink<T, E>);

impl<T: Send, E: Send> Observer<T, E> for RefCountSink<T, E> {
  fn on(&self, event: Event<T, E>) { self.0.forward_on(event) }
}
