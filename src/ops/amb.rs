use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Mirrors whichever source produces an event first and disposes the
/// others. An empty collection never emits. Created by
/// [`ObservableExt::amb_with`] and
/// [`observable::amb_all`](crate::observable::amb_all).
pub struct AmbOp<S> {
  pub(crate) sources: Vec<S>,
}

impl<S: Observable> Observable for AmbOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for AmbOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let amb = Arc::new(AmbSink {
      sink: SerialSink::new(observer, cancel),
      winner: Mutex::new(None),
      subscriptions: self.sources.iter().map(|_| SingleAssignmentDisposable::new()).collect(),
    });
    let handle = amb.sink.handle();
    for (index, source) in self.sources.iter().enumerate() {
      if amb.subscriptions[index].is_disposed() {
        continue;
      }
      let subscription = source.actual_subscribe(Box::new(AmbObserver { amb: amb.clone(), index }));
      amb.subscriptions[index].set(subscription);
    }
    (handle, Subscription::from(amb))
  }
}

struct AmbSink<T, E> {
  sink: SerialSink<T, E>,
  winner: Mutex<Option<usize>>,
  subscriptions: Vec<SingleAssignmentDisposable>,
}

impl<T: Send, E: Send> Disposable for AmbSink<T, E> {
  fn dispose(&self) { self.subscriptions.iter().for_each(Disposable::dispose) }

  fn is_disposed(&self) -> bool { self.subscriptions.iter().all(Disposable::is_disposed) }
}

struct AmbObserver<T, E> {
  amb: Arc<AmbSink<T, E>>,
  index: usize,
}

impl<T: Send, E: Send> Observer<T, E> for AmbObserver<T, E> {
  fn on(&self, event: Event<T, E>) {
    let (won, first) = {
      let mut winner = self.amb.winner.rc_deref_mut();
      match *winner {
        Some(w) => (w == self.index, false),
        None => {
          *winner = Some(self.index);
          (true, true)
        }
      }
    };
    if !won {
      return;
    }
    if first {
      tracing::trace!(index = self.index, "amb winner selected");
      let losers = self.amb.subscriptions.iter().enumerate().filter(|(i, _)| *i != self.index);
      losers.for_each(|(_, s)| s.dispose());
    }
    self.amb.sink.forward_on(event);
  }
}
