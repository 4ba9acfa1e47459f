use std::sync::{Arc, Mutex};

use super::{Disposable, Subscription};
use crate::rc::RcDerefMut;

/// Wraps one subscription with a retain count.
///
/// The wrapped subscription is released once the primary handle has been
/// disposed and every handle handed out by [`retain`](Self::retain) has been
/// disposed as well.
#[derive(Clone)]
pub struct RefCountDisposable {
  inner: Arc<Mutex<RefCountState>>,
}

struct RefCountState {
  primary_disposed: bool,
  count: usize,
  underlying: Option<Subscription>,
}

impl RefCountDisposable {
  pub fn new(underlying: Subscription) -> Self {
    Self {
      inner: Arc::new(Mutex::new(RefCountState {
        primary_disposed: false,
        count: 0,
        underlying: Some(underlying),
      })),
    }
  }

  /// Returns a dependent handle that keeps the underlying subscription alive
  /// until it is disposed. After the underlying subscription is released the
  /// returned handle is a no-op.
  pub fn retain(&self) -> Subscription {
    {
      let mut state = self.inner.rc_deref_mut();
      if state.underlying.is_none() {
        return Subscription::empty();
      }
      state.count = state.count.checked_add(1).expect("RefCountDisposable retain count overflow");
    }
    let inner = self.inner.clone();
    Subscription::from_fn(move || release(&inner))
  }
}

fn release(inner: &Mutex<RefCountState>) {
  let underlying = {
    let mut state = inner.rc_deref_mut();
    if state.underlying.is_none() {
      return;
    }
    state.count = state
      .count
      .checked_sub(1)
      .expect("RefCountDisposable released more times than retained");
    if state.primary_disposed && state.count == 0 {
      state.underlying.take()
    } else {
      None
    }
  };
  if let Some(underlying) = underlying {
    underlying.dispose();
  }
}

impl Disposable for RefCountDisposable {
  fn dispose(&self) {
    let underlying = {
      let mut state = self.inner.rc_deref_mut();
      if state.primary_disposed || state.underlying.is_none() {
        return;
      }
      state.primary_disposed = true;
      if state.count == 0 {
        state.underlying.take()
      } else {
        None
      }
    };
    if let Some(underlying) = underlying {
      underlying.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.inner.rc_deref_mut().underlying.is_none() }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[test]
  fn released_after_primary_and_all_retains() {
    let underlying = Arc::new(BooleanDisposable::new());
    let rc = RefCountDisposable::new(Subscription::from(underlying.clone()));
    let a = rc.retain();
    let b = rc.retain();
    rc.dispose();
    assert!(!underlying.is_disposed());
    a.dispose();
    a.dispose();
    assert!(!underlying.is_disposed());
    b.dispose();
    assert!(underlying.is_disposed());
    assert!(rc.is_disposed());
  }

  #[test]
  fn primary_alone_releases_when_never_retained() {
    let underlying = Arc::new(BooleanDisposable::new());
    let rc = RefCountDisposable::new(Subscription::from(underlying.clone()));
    rc.dispose();
    assert!(underlying.is_disposed());
    assert!(!rc.retain().is_disposed());
  }
}
