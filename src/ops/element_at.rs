use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Mutex,
};

use crate::prelude::*;

/// Emits the element at `index` and completes; errors with
/// [`RxError::ArgumentOutOfRange`] when the source is shorter. Created by
/// [`ObservableExt::element_at`].
pub struct ElementAtOp<S> {
  pub(crate) source: S,
  pub(crate) index: usize,
}

impl<S> Observable for ElementAtOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for ElementAtOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let element_at = ElementAtSink { sink, remaining: AtomicUsize::new(self.index) };
    (handle, self.source.actual_subscribe(Box::new(element_at)))
  }
}

struct ElementAtSink<T, E> {
  sink: Sink<T, E>,
  remaining: AtomicUsize,
}

impl<T: Send, E: Send + From<RxError>> Observer<T, E> for ElementAtSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let hit =
          self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| r.checked_sub(1));
        if hit == Err(0) {
          self.sink.next(v);
          self.sink.complete();
        }
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => self.sink.error(RxError::ArgumentOutOfRange.into()),
    }
  }
}

/// Emits the only element of the source. Errors with
/// [`RxError::NoElements`] on an empty source and with
/// [`RxError::MoreThanOneElement`] as soon as a second element arrives.
/// Created by [`ObservableExt::single`].
pub struct SingleOp<S> {
  pub(crate) source: S,
  /// Completing without a value is fine; used by `as_maybe`.
  pub(crate) allow_empty: bool,
}

impl<S> Observable for SingleOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for SingleOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let single =
      SingleSink { sink, allow_empty: self.allow_empty, value: Mutex::new(SingleState::Empty) };
    (handle, self.source.actual_subscribe(Box::new(single)))
  }
}

enum SingleState<T> {
  Empty,
  One(T),
  Done,
}

struct SingleSink<T, E> {
  sink: Sink<T, E>,
  allow_empty: bool,
  value: Mutex<SingleState<T>>,
}

impl<T: Send, E: Send + From<RxError>> Observer<T, E> for SingleSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => {
        let second = {
          let mut state = self.value.rc_deref_mut();
          match std::mem::replace(&mut *state, SingleState::Done) {
            SingleState::Empty => {
              *state = SingleState::One(v);
              false
            }
            SingleState::One(_) => true,
            SingleState::Done => false,
          }
        };
        if second {
          self.sink.error(RxError::MoreThanOneElement.into());
        }
      }
      Event::Error(e) => self.sink.error(e),
      Event::Completed => {
        let state = std::mem::replace(&mut *self.value.rc_deref_mut(), SingleState::Done);
        match state {
          SingleState::One(v) => {
            self.sink.next(v);
            self.sink.complete();
          }
          SingleState::Empty if self.allow_empty => self.sink.complete(),
          SingleState::Empty => self.sink.error(RxError::NoElements.into()),
          SingleState::Done => {}
        }
      }
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn element_at_index() {
    let observer = TestObserver::<i32, RxError>::new();
    observable::from_iter(10..20).element_at(3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![13]);
    assert!(observer.is_completed());
  }

  #[test]
  fn element_at_out_of_range() {
    let observer = TestObserver::<i32, RxError>::new();
    observable::from_iter(0..3).element_at(3).subscribe_with(observer.clone());
    assert!(observer.values().is_empty());
    assert_eq!(observer.error(), Some(RxError::ArgumentOutOfRange));
  }

  #[test]
  fn first_of_empty() {
    let observer = TestObserver::<i32, RxError>::new();
    observable::empty().first().subscribe_with(observer.clone());
    assert_eq!(observer.error(), Some(RxError::ArgumentOutOfRange));

    let observer = TestObserver::<i32, RxError>::new();
    observable::from_iter(5..).first().subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![5]);
  }

  #[test]
  fn single_errors() {
    let observer = TestObserver::<i32, RxError>::new();
    observable::just(1).single().subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1]);
    assert!(observer.is_completed());

    let observer = TestObserver::<i32, RxError>::new();
    observable::from_iter(0..).single().subscribe_with(observer.clone());
    assert_eq!(observer.error(), Some(RxError::MoreThanOneElement));

    let observer = TestObserver::<i32, RxError>::new();
    observable::empty().single().subscribe_with(observer.clone());
    assert_eq!(observer.error(), Some(RxError::NoElements));
  }
}
