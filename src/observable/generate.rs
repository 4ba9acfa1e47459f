use std::{marker::PhantomData, sync::Arc};

use crate::prelude::*;

/// Emits `initial`, then keeps applying `iterate` for as long as
/// `condition` holds, like a `for` loop.
pub fn generate<S, E, C, I>(initial: S, condition: C, iterate: I) -> GenerateObservable<S, E, C, I>
where
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> S + Send + Sync + 'static,
{
  GenerateObservable {
    initial,
    condition: Arc::new(condition),
    iterate: Arc::new(iterate),
    _p: PhantomData,
  }
}

pub struct GenerateObservable<S, E, C, I> {
  initial: S,
  condition: Arc<C>,
  iterate: Arc<I>,
  _p: PhantomData<fn() -> E>,
}

impl<S, E, C, I> Observable for GenerateObservable<S, E, C, I>
where
  S: Clone + Send + Sync + 'static,
  E: Send + 'static,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> S + Send + Sync + 'static,
{
  type Item = S;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<S, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, E, C, I> Producer for GenerateObservable<S, E, C, I>
where
  S: Clone + Send + Sync + 'static,
  E: Send + 'static,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> S + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let (condition, iterate) = (self.condition.clone(), self.iterate.clone());
    let initial = self.initial.clone();
    let subscription = CurrentThreadScheduler.schedule_recursive(initial, move |state, recursion| {
      if sink.is_disposed() {
        return;
      }
      if condition(&state) {
        sink.next(state.clone());
        recursion.again(iterate(state));
      } else {
        sink.complete();
      }
    });
    (handle, subscription)
  }
}
