use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock access used for every piece of shared sink and subject state.
///
/// A panic inside a user callback never runs while one of these guards is
/// held, so a poisoned lock still protects consistent data and is recovered
/// instead of propagating the poison.
pub trait RcDerefMut {
  type Target;
  fn rc_deref_mut(&self) -> MutexGuard<'_, Self::Target>;
}

impl<T> RcDerefMut for Mutex<T> {
  type Target = T;
  #[inline]
  fn rc_deref_mut(&self) -> MutexGuard<'_, T> {
    self.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
