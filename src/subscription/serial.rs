use std::sync::Mutex;

use super::{Disposable, Subscription};
use crate::rc::RcDerefMut;

/// A reassignable slot. Assigning a new subscription disposes the previous
/// one; assigning after disposal disposes the new one right away.
#[derive(Default)]
pub struct SerialDisposable {
  state: Mutex<SerialState>,
}

#[derive(Default)]
struct SerialState {
  current: Option<Subscription>,
  disposed: bool,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: Subscription) {
    let old = {
      let mut state = self.state.rc_deref_mut();
      if state.disposed {
        Some(subscription)
      } else {
        state.current.replace(subscription)
      }
    };
    if let Some(old) = old {
      old.dispose();
    }
  }

  pub fn current(&self) -> Option<Subscription> { self.state.rc_deref_mut().current.clone() }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut state = self.state.rc_deref_mut();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.state.rc_deref_mut().disposed }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::BooleanDisposable;
  use std::sync::Arc;

  #[test]
  fn replacing_disposes_previous() {
    let serial = SerialDisposable::new();
    let first = Arc::new(BooleanDisposable::new());
    let second = Arc::new(BooleanDisposable::new());
    serial.set(Subscription::from(first.clone()));
    serial.set(Subscription::from(second.clone()));
    assert!(first.is_disposed());
    assert!(!second.is_disposed());
    serial.dispose();
    assert!(second.is_disposed());

    let late = Arc::new(BooleanDisposable::new());
    serial.set(Subscription::from(late.clone()));
    assert!(late.is_disposed());
    assert!(serial.current().is_none());
  }
}
