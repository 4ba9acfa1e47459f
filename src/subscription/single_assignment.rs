use std::sync::{
  atomic::{AtomicU8, Ordering},
  Mutex,
};

use super::{Disposable, Subscription};
use crate::rc::RcDerefMut;

const DISPOSED: u8 = 1;
const SET: u8 = 1 << 1;

/// Holds at most one subscription, assigned exactly once.
///
/// Disposing before the assignment marks the slot disposed; the late
/// assignment is then disposed immediately. Assigning twice is a contract
/// violation and panics.
#[derive(Default)]
pub struct SingleAssignmentDisposable {
  state: AtomicU8,
  current: Mutex<Option<Subscription>>,
}

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: Subscription) {
    *self.current.rc_deref_mut() = Some(subscription);
    let prev = self.state.fetch_or(SET, Ordering::AcqRel);
    if prev & SET != 0 {
      panic!("SingleAssignmentDisposable was already assigned");
    }
    if prev & DISPOSED != 0 {
      self.release();
    }
  }

  fn release(&self) {
    let current = self.current.rc_deref_mut().take();
    if let Some(current) = current {
      current.dispose();
    }
  }
}

impl Disposable for SingleAssignmentDisposable {
  fn dispose(&self) {
    let prev = self.state.fetch_or(DISPOSED, Ordering::AcqRel);
    if prev & DISPOSED != 0 {
      return;
    }
    if prev & SET != 0 {
      self.release();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.state.load(Ordering::Acquire) & DISPOSED != 0 }
}
