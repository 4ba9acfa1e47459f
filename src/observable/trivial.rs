use std::marker::PhantomData;

use crate::prelude::*;

/// Emits `value` and completes.
pub fn just<T, E>(value: T) -> JustObservable<T, E> { JustObservable { value, _p: PhantomData } }

/// Completes immediately without emitting.
pub fn empty<T, E>() -> EmptyObservable<T, E> { EmptyObservable(PhantomData) }

/// Never emits and never terminates.
pub fn never<T, E>() -> NeverObservable<T, E> { NeverObservable(PhantomData) }

/// Terminates with `err` immediately.
pub fn throw_err<T, E>(err: E) -> ThrowObservable<T, E> { ThrowObservable { err, _p: PhantomData } }

#[derive(Clone)]
pub struct JustObservable<T, E> {
  value: T,
  _p: PhantomData<fn() -> E>,
}

impl<T, E> Observable for JustObservable<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Send + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    observer.next(self.value.clone());
    observer.complete();
    Subscription::empty()
  }
}

pub struct EmptyObservable<T, E>(PhantomData<fn() -> (T, E)>);

impl<T, E> Clone for EmptyObservable<T, E> {
  fn clone(&self) -> Self { Self(PhantomData) }
}

impl<T: Send + 'static, E: Send + 'static> Observable for EmptyObservable<T, E> {
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    observer.complete();
    Subscription::empty()
  }
}

pub struct NeverObservable<T, E>(PhantomData<fn() -> (T, E)>);

impl<T, E> Clone for NeverObservable<T, E> {
  fn clone(&self) -> Self { Self(PhantomData) }
}

impl<T: Send + 'static, E: Send + 'static> Observable for NeverObservable<T, E> {
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, _: BoxedObserver<T, E>) -> Subscription { Subscription::empty() }
}

#[derive(Clone)]
pub struct ThrowObservable<T, E> {
  err: E,
  _p: PhantomData<fn() -> T>,
}

impl<T, E> Observable for ThrowObservable<T, E>
where
  T: Send + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    observer.error(self.err.clone());
    Subscription::empty()
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn just_emits_once() {
    let observer = TestObserver::<&str, ()>::new();
    observable::just("x").subscribe_with(observer.clone());
    assert_eq!(observer.events(), vec![Event::Next("x"), Event::Completed]);
  }

  #[test]
  fn empty_never_throw() {
    let empty = TestObserver::<i32, ()>::new();
    observable::empty().subscribe_with(empty.clone());
    assert_eq!(empty.events(), vec![Event::Completed]);

    let never = TestObserver::<i32, ()>::new();
    observable::never().subscribe_with(never.clone());
    assert!(never.events().is_empty());

    let throw = TestObserver::<i32, &str>::new();
    observable::throw_err("boom").subscribe_with(throw.clone());
    assert_eq!(throw.events(), vec![Event::Error("boom")]);
  }
}
