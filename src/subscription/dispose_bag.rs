use std::sync::Mutex;

use super::{Disposable, Subscription};
use crate::rc::RcDerefMut;

/// Collects subscriptions and disposes all of them when the bag is dropped.
///
/// Inserting into a bag that was already disposed explicitly disposes the
/// inserted subscription immediately.
pub struct DisposeBag {
  // `None` once disposed.
  items: Mutex<Option<Vec<Subscription>>>,
}

impl Default for DisposeBag {
  fn default() -> Self { Self { items: Mutex::new(Some(Vec::new())) } }
}

impl DisposeBag {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&self, subscription: Subscription) {
    let rejected = {
      let mut items = self.items.rc_deref_mut();
      match items.as_mut() {
        Some(items) => {
          items.push(subscription);
          return;
        }
        None => subscription,
      }
    };
    rejected.dispose();
  }

  pub fn len(&self) -> usize { self.items.rc_deref_mut().as_ref().map_or(0, Vec::len) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for DisposeBag {
  fn dispose(&self) {
    let items = self.items.rc_deref_mut().take();
    items.into_iter().flatten().for_each(|s| s.dispose());
  }

  fn is_disposed(&self) -> bool { self.items.rc_deref_mut().is_none() }
}

impl Drop for DisposeBag {
  fn drop(&mut self) { self.dispose() }
}
