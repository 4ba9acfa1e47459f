//! Observer trait and implementations
//!
//! An observer receives a sequence of [`Event`]s through the single `on`
//! entry point. After the first stop event (`Error` or `Completed`) an
//! observer must not be called again; every sink in this crate enforces that
//! locally instead of trusting its upstream.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::rc::RcDerefMut;

mod serialized;
pub use serialized::{SerializedObserver, Serializer};

// ============================================================================
// Event
// ============================================================================

/// A notification delivered to an [`Observer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item, Err> {
  /// Next element of the sequence.
  Next(Item),
  /// Sequence terminated with an error.
  Error(Err),
  /// Sequence completed successfully.
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  /// `true` for `Error` and `Completed`.
  #[inline]
  pub fn is_stop_event(&self) -> bool { !matches!(self, Event::Next(_)) }

  #[inline]
  pub fn element(&self) -> Option<&Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }

  #[inline]
  pub fn error(&self) -> Option<&Err> {
    match self {
      Event::Error(e) => Some(e),
      _ => None,
    }
  }

  #[inline]
  pub fn is_completed(&self) -> bool { matches!(self, Event::Completed) }

  /// Maps the element of a `Next` event, keeping stop events untouched.
  pub fn map<U>(self, f: impl FnOnce(Item) -> U) -> Event<U, Err> {
    match self {
      Event::Next(v) => Event::Next(f(v)),
      Event::Error(e) => Event::Error(e),
      Event::Completed => Event::Completed,
    }
  }

  /// Maps the error of an `Error` event.
  pub fn map_err<E2>(self, f: impl FnOnce(Err) -> E2) -> Event<Item, E2> {
    match self {
      Event::Next(v) => Event::Next(v),
      Event::Error(e) => Event::Error(f(e)),
      Event::Completed => Event::Completed,
    }
  }
}

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: the consumer of data in reactive programming.
///
/// Sources call `on` serially: two events are never delivered to the same
/// observer concurrently.
pub trait Observer<Item, Err>: Send + Sync {
  fn on(&self, event: Event<Item, Err>);

  #[inline]
  fn next(&self, value: Item) { self.on(Event::Next(value)) }

  #[inline]
  fn error(&self, err: Err) { self.on(Event::Error(err)) }

  #[inline]
  fn complete(&self) { self.on(Event::Completed) }
}

/// Type-erased observer handed from a source to its subscriber chain.
pub type BoxedObserver<Item, Err> = Box<dyn Observer<Item, Err>>;

impl<Item, Err, O> Observer<Item, Err> for Arc<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn on(&self, event: Event<Item, Err>) { (**self).on(event) }
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn on(&self, event: Event<Item, Err>) { (**self).on(event) }
}

// ============================================================================
// Closure observers
// ============================================================================

/// Observer backed by a single event handler.
///
/// The handler sees at most one stop event; anything after it is dropped.
pub struct AnonymousObserver<F> {
  handler: F,
  stopped: AtomicBool,
}

impl<F> AnonymousObserver<F> {
  pub fn new(handler: F) -> Self { Self { handler, stopped: AtomicBool::new(false) } }
}

impl<Item, Err, F> Observer<Item, Err> for AnonymousObserver<F>
where
  F: Fn(Event<Item, Err>) + Send + Sync,
{
  fn on(&self, event: Event<Item, Err>) {
    if event.is_stop_event() {
      if !self.stopped.swap(true, Ordering::AcqRel) {
        (self.handler)(event);
      }
    } else if !self.stopped.load(Ordering::Acquire) {
      (self.handler)(event);
    }
  }
}

/// Observer built from separate `next`, `error` and `complete` callbacks.
///
/// The terminal callbacks are `FnOnce`; whichever fires first consumes both.
pub struct CallbackObserver<N, E, C> {
  next: N,
  terminal: std::sync::Mutex<Option<(E, C)>>,
}

impl<N, E, C> CallbackObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    Self { next, terminal: std::sync::Mutex::new(Some((error, complete))) }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for CallbackObserver<N, E, C>
where
  N: Fn(Item) + Send + Sync,
  E: FnOnce(Err) + Send,
  C: FnOnce() + Send,
{
  fn on(&self, event: Event<Item, Err>) {
    match event {
      Event::Next(v) => {
        if self.terminal.rc_deref_mut().is_some() {
          (self.next)(v)
        }
      }
      Event::Error(err) => {
        let handlers = self.terminal.rc_deref_mut().take();
        if let Some((error, _)) = handlers {
          error(err)
        }
      }
      Event::Completed => {
        let handlers = self.terminal.rc_deref_mut().take();
        if let Some((_, complete)) = handlers {
          complete()
        }
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;

  #[test]
  fn event_helpers() {
    let e: Event<i32, &str> = Event::Next(1);
    assert!(!e.is_stop_event());
    assert_eq!(e.element(), Some(&1));
    assert_eq!(e.map(|v| v + 1), Event::Next(2));
    let e: Event<i32, &str> = Event::Error("boom");
    assert!(e.is_stop_event());
    assert_eq!(e.error(), Some(&"boom"));
    assert_eq!(e.map_err(|s| s.len()), Event::Error(4));
    assert!(Event::<i32, ()>::Completed.is_completed());
  }

  #[test]
  fn anonymous_observer_ignores_after_stop() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let observer = AnonymousObserver::new(move |e: Event<i32, ()>| c_seen.lock().unwrap().push(e));
    observer.next(1);
    observer.complete();
    observer.next(2);
    observer.error(());
    assert_eq!(*seen.lock().unwrap(), vec![Event::Next(1), Event::Completed]);
  }

  #[test]
  fn callback_observer_runs_one_terminal() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let observer = CallbackObserver::new(
      move |v: i32| l1.lock().unwrap().push(format!("next {v}")),
      move |e: &str| l2.lock().unwrap().push(format!("error {e}")),
      move || l3.lock().unwrap().push("complete".to_string()),
    );
    let boxed: BoxedObserver<i32, &str> = Box::new(observer);
    boxed.next(1);
    boxed.error("x");
    boxed.complete();
    boxed.next(2);
    assert_eq!(*log.lock().unwrap(), vec!["next 1".to_string(), "error x".to_string()]);
  }
}
