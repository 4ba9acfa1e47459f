use std::sync::atomic::{AtomicBool, Ordering};

use super::Disposable;

/// A disposable that only records whether it was disposed.
#[derive(Debug, Default)]
pub struct BooleanDisposable(AtomicBool);

impl BooleanDisposable {
  pub fn new() -> Self { Self::default() }

  /// A disposable that starts out disposed.
  pub fn disposed() -> Self { Self(AtomicBool::new(true)) }
}

impl Disposable for BooleanDisposable {
  #[inline]
  fn dispose(&self) { self.0.store(true, Ordering::Release) }
  #[inline]
  fn is_disposed(&self) -> bool { self.0.load(Ordering::Acquire) }
}
