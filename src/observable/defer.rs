use crate::prelude::*;

/// Calls `factory` on every subscription and subscribes to the observable
/// it returns.
pub fn defer<F, O>(factory: F) -> DeferObservable<F>
where
  F: Fn() -> O + Send + Sync + 'static,
  O: Observable,
{
  DeferObservable(factory)
}

#[derive(Clone)]
pub struct DeferObservable<F>(F);

impl<F, O> Observable for DeferObservable<F>
where
  F: Fn() -> O + Send + Sync + 'static,
  O: Observable,
{
  type Item = O::Item;
  type Err = O::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<O::Item, O::Err>) -> Subscription {
    (self.0)().actual_subscribe(observer)
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn factory_runs_per_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c_calls = calls.clone();
    let source =
      observable::defer(move || observable::just::<_, ()>(c_calls.fetch_add(1, Ordering::SeqCst)));
    let first = TestObserver::new();
    let second = TestObserver::new();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    source.subscribe_with(first.clone());
    source.subscribe_with(second.clone());
    assert_eq!(first.values(), vec![0]);
    assert_eq!(second.values(), vec![1]);
  }
}
