use std::{
  iter::Repeat,
  marker::PhantomData,
  ops::Range,
};

use crate::prelude::*;

/// Creates an observable that emits every value of `iter`, then completes.
///
/// Values are produced by a recursive action on the current-thread
/// scheduler, one per step, so long or infinite iterators neither grow the
/// stack nor block a `take` downstream from cancelling them.
///
/// ```
/// use rxcore::{prelude::*, testing::TestObserver};
///
/// let observer = TestObserver::<i32, ()>::new();
/// observable::from_iter(vec![0, 1, 2, 3]).subscribe_with(observer.clone());
/// assert_eq!(observer.values(), vec![0, 1, 2, 3]);
/// ```
pub fn from_iter<I, E>(iter: I) -> ObservableIter<I, E, CurrentThreadScheduler>
where
  I: IntoIterator,
{
  ObservableIter { iter, scheduler: CurrentThreadScheduler, _p: PhantomData }
}

/// Alias of [`from_iter`] for literal lists.
pub fn of<I, E>(items: I) -> ObservableIter<I, E, CurrentThreadScheduler>
where
  I: IntoIterator,
{
  from_iter(items)
}

/// Like [`from_iter`], producing the values on `scheduler`.
pub fn from_iter_on<I, E, SD>(iter: I, scheduler: SD) -> ObservableIter<I, E, SD>
where
  I: IntoIterator,
  SD: Scheduler + Clone + 'static,
{
  ObservableIter { iter, scheduler, _p: PhantomData }
}

/// Emits `count` consecutive integers starting at `start`.
///
/// # Panics
/// If the range would overflow `i64`.
pub fn range<E>(start: i64, count: u64) -> ObservableIter<Range<i64>, E, CurrentThreadScheduler> {
  let end = i64::try_from(count).ok().and_then(|count| start.checked_add(count));
  let Some(end) = end else {
    panic!("range overflow: {start} + {count}");
  };
  from_iter(start..end)
}

/// Emits `value` forever.
pub fn repeat_element<T, E>(value: T) -> ObservableIter<Repeat<T>, E, CurrentThreadScheduler>
where
  T: Clone,
{
  from_iter(std::iter::repeat(value))
}

#[derive(Clone)]
pub struct ObservableIter<I, E, SD> {
  iter: I,
  scheduler: SD,
  _p: PhantomData<fn() -> E>,
}

impl<I, E, SD> Observable for ObservableIter<I, E, SD>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + Clone + 'static,
{
  type Item = I::Item;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<I::Item, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<I, E, SD> Producer for ObservableIter<I, E, SD>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<I::Item, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let iter = self.iter.clone().into_iter();
    let subscription = self.scheduler.schedule_recursive(iter, move |mut iter, recursion| {
      if sink.is_disposed() {
        return;
      }
      match iter.next() {
        Some(v) => {
          sink.next(v);
          recursion.again(iter);
        }
        None => sink.complete(),
      }
    });
    (handle, subscription)
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::*};

  #[test]
  fn emits_all_then_completes() {
    let observer = TestObserver::<i32, ()>::new();
    observable::from_iter(0..4).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2, 3]);
    assert!(observer.is_completed());
  }

  #[test]
  fn each_subscription_restarts() {
    let source = observable::of::<_, ()>(vec!["a", "b"]);
    let first = TestObserver::new();
    let second = TestObserver::new();
    source.subscribe_with(first.clone());
    source.subscribe_with(second.clone());
    assert_eq!(first.values(), second.values());
  }

  #[test]
  fn infinite_source_is_cancelled_by_take() {
    let observer = TestObserver::<i32, ()>::new();
    observable::repeat_element(7).take(3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![7, 7, 7]);
    assert!(observer.is_completed());
  }

  #[test]
  fn range_counts_from_start() {
    let observer = TestObserver::<i64, ()>::new();
    observable::range(-2, 4).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![-2, -1, 0, 1]);
  }

  #[test]
  fn runs_on_given_scheduler() {
    let scheduler = TestScheduler::new();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      observable::from_iter_on::<_, (), _>(vec![1, 2], c_scheduler.clone())
    });
    assert_eq!(res.events(), vec![next(200, 1), next(200, 2), completed(200)]);
  }

  #[test]
  fn long_source_does_not_grow_the_stack() {
    let observer = TestObserver::<usize, ()>::new();
    observable::from_iter(0..100_000).skip(99_999).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![99_999]);
  }
}
