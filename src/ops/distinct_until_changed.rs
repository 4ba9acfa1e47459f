//! DistinctUntilChanged operator implementation
//!
//! Suppresses consecutive duplicates. Two values are duplicates when the
//! comparer returns `true` for them; `distinct_until_changed()` uses
//! `PartialEq`.

use std::sync::{Arc, Mutex};

use crate::prelude::*;

pub struct DistinctUntilChangedOp<S, F> {
  pub(crate) source: S,
  pub(crate) comparer: Arc<F>,
}

impl<S, F> Observable for DistinctUntilChangedOp<S, F>
where
  S: Observable,
  S::Item: Clone,
  F: Fn(&S::Item, &S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F> Producer for DistinctUntilChangedOp<S, F>
where
  S: Observable,
  S::Item: Clone,
  F: Fn(&S::Item, &S::Item) -> bool + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let distinct =
      DistinctUntilChangedSink { sink, comparer: self.comparer.clone(), last: Mutex::new(None) };
    (handle, self.source.actual_subscribe(Box::new(distinct)))
  }
}

struct DistinctUntilChangedSink<T, E, F> {
  sink: Sink<T, E>,
  comparer: Arc<F>,
  last: Mutex<Option<T>>,
}

impl<T, E, F> Observer<T, E> for DistinctUntilChangedSink<T, E, F>
where
  T: Clone + Send,
  E: Send,
  F: Fn(&T, &T) -> bool + Send + Sync,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let changed = {
          let mut last = self.last.rc_deref_mut();
          let changed = last.as_ref().map_or(true, |prev| !(self.comparer)(prev, &v));
          if changed {
            *last = Some(v.clone());
          }
          changed
        };
        if changed {
          self.sink.next(v);
        }
      }
      stop => self.sink.forward_on(stop),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn drops_consecutive_duplicates() {
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 1, 2, 2, 2, 1, 3, 3])
      .distinct_until_changed()
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 2, 1, 3]);
    assert!(observer.is_completed());
  }

  #[test]
  fn custom_comparer() {
    let observer = TestObserver::<&str, ()>::new();
    observable::of(["a", "A", "b", "B", "a"])
      .distinct_until_changed_by(|a: &&str, b: &&str| a.eq_ignore_ascii_case(b))
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec!["a", "b", "a"]);
  }
}
