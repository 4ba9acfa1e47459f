//! Sequences with a fixed shape: [`Single`] emits exactly one value or an
//! error, [`Maybe`] emits at most one value.
//!
//! Both are ordinary observables, so every operator still applies, and add
//! a callback subscribe that reports the outcome as one `Result`.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::prelude::*;
//!
//! let outcome = Arc::new(Mutex::new(None));
//! let c_outcome = outcome.clone();
//! observable::of::<_, RxError>([7])
//!   .as_single()
//!   .subscribe_result(move |r| *c_outcome.lock().unwrap() = Some(r));
//! assert_eq!(*outcome.lock().unwrap(), Some(Ok(7)));
//! ```

use std::sync::Mutex;

use crate::prelude::*;

/// Exactly one value, or an error. Created by [`ObservableExt::as_single`]
/// or [`Single::create`].
#[derive(Clone)]
pub struct Single<S>(pub(crate) S);

/// Zero or one value, or an error. Created by [`ObservableExt::as_maybe`]
/// or [`Maybe::create`].
#[derive(Clone)]
pub struct Maybe<S>(pub(crate) S);

impl<S: Observable> Observable for Single<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    self.0.actual_subscribe(observer)
  }
}

impl<S: Observable> Observable for Maybe<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    self.0.actual_subscribe(observer)
  }
}

impl<S: Observable> Single<S> {
  /// Calls `f` once with the value or the error.
  pub fn subscribe_result<F>(&self, f: F) -> Subscription
  where
    F: FnOnce(Result<S::Item, S::Err>) + Send + 'static,
  {
    let callback = Mutex::new(Some(f));
    self.0.subscribe_on_event(move |event| {
      let outcome = match event {
        Event::Next(v) => Ok(v),
        Event::Error(e) => Err(e),
        Event::Completed => return,
      };
      let f = callback.rc_deref_mut().take();
      if let Some(f) = f {
        f(outcome);
      }
    })
  }
}

impl<S: Observable> Maybe<S> {
  /// Calls `f` once with the value, `None` for an empty completion, or the
  /// error.
  pub fn subscribe_option<F>(&self, f: F) -> Subscription
  where
    F: FnOnce(Result<Option<S::Item>, S::Err>) + Send + 'static,
  {
    let callback = Mutex::new(Some(f));
    self.0.subscribe_on_event(move |event| {
      let outcome = match event {
        Event::Next(v) => Ok(Some(v)),
        Event::Error(e) => Err(e),
        Event::Completed => Ok(None),
      };
      let f = callback.rc_deref_mut().take();
      if let Some(f) = f {
        f(outcome);
      }
    })
  }
}

/// The producing side handed to [`Single::create`].
pub struct SingleEmitter<T, E>(Emitter<T, E>);

impl<T: Send, E: Send> SingleEmitter<T, E> {
  pub fn success(&self, value: T) {
    self.0.next(value);
    self.0.complete();
  }

  pub fn failure(&self, err: E) { self.0.error(err) }

  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

/// The producing side handed to [`Maybe::create`].
pub struct MaybeEmitter<T, E>(Emitter<T, E>);

impl<T: Send, E: Send> MaybeEmitter<T, E> {
  pub fn success(&self, value: T) {
    self.0.next(value);
    self.0.complete();
  }

  pub fn completed(&self) { self.0.complete() }

  pub fn failure(&self, err: E) { self.0.error(err) }

  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl<T, E> Single<BoxedObservable<T, E>>
where
  T: Send + 'static,
  E: Send + 'static,
{
  /// A single whose outcome is produced by `subscribe`, once per
  /// subscription. Only the first call on the emitter has any effect.
  pub fn create<F>(subscribe: F) -> Self
  where
    F: Fn(SingleEmitter<T, E>) -> Subscription + Send + Sync + 'static,
  {
    Single(observable::create(move |emitter| subscribe(SingleEmitter(emitter))).boxed())
  }
}

impl<T, E> Maybe<BoxedObservable<T, E>>
where
  T: Send + 'static,
  E: Send + 'static,
{
  /// A maybe whose outcome is produced by `subscribe`, once per
  /// subscription.
  pub fn create<F>(subscribe: F) -> Self
  where
    F: Fn(MaybeEmitter<T, E>) -> Subscription + Send + Sync + 'static,
  {
    Maybe(observable::create(move |emitter| subscribe(MaybeEmitter(emitter))).boxed())
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, testing::*};

  fn recorded<R: Send + 'static>() -> (Arc<Mutex<Option<R>>>, impl FnOnce(R) + Send + 'static) {
    let outcome = Arc::new(Mutex::new(None));
    let c_outcome = outcome.clone();
    (outcome, move |r| *c_outcome.lock().unwrap() = Some(r))
  }

  #[test]
  fn single_reports_value_or_protocol_error() {
    let (ok, record) = recorded();
    observable::just::<_, RxError>(1).as_single().subscribe_result(record);
    assert_eq!(*ok.lock().unwrap(), Some(Ok(1)));

    let (empty, record) = recorded();
    observable::empty::<i32, RxError>().as_single().subscribe_result(record);
    assert_eq!(*empty.lock().unwrap(), Some(Err(RxError::NoElements)));

    let (many, record) = recorded();
    observable::of::<_, RxError>([1, 2]).as_single().subscribe_result(record);
    assert_eq!(*many.lock().unwrap(), Some(Err(RxError::MoreThanOneElement)));
  }

  #[test]
  fn maybe_allows_empty() {
    let (empty, record) = recorded();
    observable::empty::<i32, RxError>().as_maybe().subscribe_option(record);
    assert_eq!(*empty.lock().unwrap(), Some(Ok(None)));

    let (one, record) = recorded();
    observable::just::<_, RxError>(3).as_maybe().subscribe_option(record);
    assert_eq!(*one.lock().unwrap(), Some(Ok(Some(3))));

    let many = TestObserver::<i32, RxError>::new();
    observable::of([1, 2]).as_maybe().subscribe_with(many.clone());
    assert_eq!(many.error(), Some(RxError::MoreThanOneElement));
  }

  #[test]
  fn created_single_ignores_later_calls() {
    let single = Single::<BoxedObservable<i32, &str>>::create(|emitter| {
      emitter.success(5);
      emitter.failure("late");
      Subscription::empty()
    });
    let observer = TestObserver::new();
    single.subscribe_with(observer.clone());
    assert_eq!(observer.events(), vec![Event::Next(5), Event::Completed]);
  }

  #[test]
  fn created_maybe_can_complete_empty() {
    let maybe = Maybe::<BoxedObservable<i32, ()>>::create(|emitter| {
      emitter.completed();
      Subscription::empty()
    });
    let observer = TestObserver::new();
    maybe.subscribe_with(observer.clone());
    assert_eq!(observer.events(), vec![Event::Completed]);
  }

  #[test]
  fn single_is_still_an_observable() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_cold_observable::<i32, RxError>(vec![next(10, 4), completed(20)]);
    let res = scheduler.start(move || source.as_single().map(|v| v * 2));
    assert_eq!(res.events(), vec![next(220, 8), completed(220)]);
  }
}
