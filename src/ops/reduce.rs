use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Folds the whole sequence and emits the final accumulator on completion.
/// Created by [`ObservableExt::reduce`] and [`ObservableExt::to_vec`].
pub struct ReduceOp<S, F, Acc> {
  pub(crate) source: S,
  pub(crate) seed: Acc,
  pub(crate) func: Arc<F>,
}

/// `to_vec` is a reduce that pushes every element.
pub type ToVecOp<S, T> = ReduceOp<S, fn(Vec<T>, T) -> Vec<T>, Vec<T>>;

pub(crate) fn push_item<T>(mut acc: Vec<T>, item: T) -> Vec<T> {
  acc.push(item);
  acc
}

impl<S, F, Acc> Observable for ReduceOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Acc, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, Acc> Producer for ReduceOp<S, F, Acc>
where
  S: Observable,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Acc, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let reduce =
      ReduceSink { sink, acc: Mutex::new(Some(self.seed.clone())), func: self.func.clone() };
    (handle, self.source.actual_subscribe(Box::new(reduce)))
  }
}

struct ReduceSink<Acc, E, F> {
  sink: Sink<Acc, E>,
  acc: Mutex<Option<Acc>>,
  func: Arc<F>,
}

impl<T, Acc, E, F> Observer<T, E> for ReduceSink<Acc, E, F>
where
  F: Fn(Acc, T) -> Acc + Send + Sync,
  Acc: Send,
  E: Send,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let mut acc = self.acc.rc_deref_mut();
        if let Some(current) = acc.take() {
          *acc = Some((self.func)(current, v));
        }
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => {
        let result = self.acc.rc_deref_mut().take();
        if let Some(result) = result {
          self.sink.next(result);
        }
        self.sink.complete();
      }
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn reduce_initial() {
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 1, 1, 1, 1]).reduce(100, |acc, v| acc + v).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![105]);
    assert!(observer.is_completed());
  }

  #[test]
  fn reduce_on_empty_emits_seed() {
    let observer = TestObserver::<i32, ()>::new();
    observable::empty().reduce(100, |acc, v: i32| acc + v).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![100]);
  }

  #[test]
  fn to_vec_collects() {
    let observer = TestObserver::<Vec<i32>, ()>::new();
    observable::from_iter(0..4).to_vec().subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![vec![0, 1, 2, 3]]);
  }

  #[test]
  fn error_discards_accumulator() {
    let observer = TestObserver::<Vec<i32>, &str>::new();
    observable::from_iter(0..4)
      .concat_with(observable::throw_err("x"))
      .to_vec()
      .subscribe_with(observer.clone());
    assert!(observer.values().is_empty());
    assert_eq!(observer.error(), Some("x"));
  }
}
