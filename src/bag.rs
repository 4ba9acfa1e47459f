//! Keyed, insertion-ordered collection used for observer lists and
//! composite disposables.

use smallvec::SmallVec;

/// Unique identifier for an element inserted into a [`Bag`].
pub type BagKey = u64;

/// Insertion-ordered storage with stable removal keys.
///
/// Most bags hold one or two entries (a subject with a single subscriber, a
/// merge with two inner subscriptions), so entries are stored inline.
pub struct Bag<T> {
  next_key: BagKey,
  items: SmallVec<[(BagKey, T); 2]>,
}

impl<T> Default for Bag<T> {
  fn default() -> Self { Self { next_key: 0, items: SmallVec::new() } }
}

impl<T> Bag<T> {
  pub fn new() -> Self { Self::default() }

  /// Inserts `item` and returns the key that removes it again.
  pub fn insert(&mut self, item: T) -> BagKey {
    let key = self.next_key;
    self.next_key = self.next_key.wrapping_add(1);
    self.items.push((key, item));
    key
  }

  pub fn remove(&mut self, key: BagKey) -> Option<T> {
    let idx = self.items.iter().position(|(k, _)| *k == key)?;
    Some(self.items.remove(idx).1)
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &T> { self.items.iter().map(|(_, v)| v) }

  /// Removes every element, yielding them in insertion order.
  pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ { self.items.drain(..).map(|(_, v)| v) }
}

impl<T: Clone> Bag<T> {
  /// Copies the current contents so they can be used after a lock guarding
  /// the bag is released.
  pub fn snapshot(&self) -> SmallVec<[T; 2]> { self.iter().cloned().collect() }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn insert_remove_keeps_order() {
    let mut bag = Bag::new();
    let a = bag.insert("a");
    let b = bag.insert("b");
    let c = bag.insert("c");
    assert_eq!(bag.len(), 3);
    assert_eq!(bag.remove(b), Some("b"));
    assert_eq!(bag.remove(b), None);
    assert_eq!(bag.iter().copied().collect::<Vec<_>>(), vec!["a", "c"]);
    assert_ne!(a, c);
  }

  #[test]
  fn keys_are_not_reused() {
    let mut bag = Bag::new();
    let a = bag.insert(1);
    bag.remove(a);
    let b = bag.insert(2);
    assert_ne!(a, b);
  }

  #[test]
  fn drain_empties() {
    let mut bag = Bag::new();
    bag.insert(1);
    bag.insert(2);
    assert_eq!(bag.drain().collect::<Vec<_>>(), vec![1, 2]);
    assert!(bag.is_empty());
  }
}
