use std::sync::Mutex;

use super::{Disposable, Subscription};
use crate::{
  bag::{Bag, BagKey},
  rc::RcDerefMut,
};

/// A group of subscriptions disposed together.
pub struct CompositeDisposable {
  // `None` once disposed.
  items: Mutex<Option<Bag<Subscription>>>,
}

impl Default for CompositeDisposable {
  fn default() -> Self { Self { items: Mutex::new(Some(Bag::new())) } }
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Adds `subscription` and returns the key that removes it again. If the
  /// composite is already disposed the subscription is disposed immediately
  /// and `None` is returned.
  pub fn insert(&self, subscription: Subscription) -> Option<BagKey> {
    let rejected = {
      let mut items = self.items.rc_deref_mut();
      match items.as_mut() {
        Some(bag) => return Some(bag.insert(subscription)),
        None => subscription,
      }
    };
    rejected.dispose();
    None
  }

  /// Removes and disposes the subscription stored under `key`.
  pub fn remove(&self, key: BagKey) {
    let removed = self.items.rc_deref_mut().as_mut().and_then(|bag| bag.remove(key));
    if let Some(removed) = removed {
      removed.dispose();
    }
  }

  pub fn len(&self) -> usize { self.items.rc_deref_mut().as_ref().map_or(0, Bag::len) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let items = self.items.rc_deref_mut().take();
    if let Some(mut items) = items {
      items.drain().for_each(|s| s.dispose());
    }
  }

  fn is_disposed(&self) -> bool { self.items.rc_deref_mut().is_none() }
}
