//! Disposables: handles that release a resource exactly once.
//!
//! Every `subscribe` returns a [`Subscription`]; disposing it stops event
//! delivery, tears down upstream subscriptions and cancels pending scheduled
//! work. `dispose` is idempotent and safe to call from any thread.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
};

use once_cell::sync::Lazy;

use crate::rc::RcDerefMut;

mod boolean;
mod composite;
mod dispose_bag;
mod ref_count;
mod scheduled;
mod serial;
mod single_assignment;

pub use boolean::BooleanDisposable;
pub use composite::CompositeDisposable;
pub use dispose_bag::DisposeBag;
pub use ref_count::RefCountDisposable;
pub use scheduled::ScheduledDisposable;
pub use serial::SerialDisposable;
pub use single_assignment::SingleAssignmentDisposable;

/// A releasable resource.
pub trait Disposable: Send + Sync {
  /// Releases the resource. Calling it again is a no-op.
  fn dispose(&self);

  fn is_disposed(&self) -> bool;
}

impl<D: Disposable + ?Sized> Disposable for Arc<D> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }
  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

/// A cheap-to-clone, type-erased disposable.
#[derive(Clone)]
pub struct Subscription(Arc<dyn Disposable>);

static EMPTY: Lazy<Subscription> = Lazy::new(|| Subscription(Arc::new(NopDisposable)));
static DISPOSED: Lazy<Subscription> =
  Lazy::new(|| Subscription(Arc::new(BooleanDisposable::disposed())));

impl Subscription {
  pub fn new<D: Disposable + 'static>(d: D) -> Self { Self(Arc::new(d)) }

  /// A subscription that owns nothing. It never reports itself disposed,
  /// since there is no resource whose release it could track.
  pub fn empty() -> Self { EMPTY.clone() }

  /// A subscription that is already over, e.g. one handed to an observer
  /// that joined a terminated subject.
  pub fn disposed() -> Self { DISPOSED.clone() }

  /// Runs `f` the first time the subscription is disposed.
  pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
    Self::new(AnonymousDisposable {
      action: Mutex::new(Some(Box::new(f))),
      disposed: AtomicBool::new(false),
    })
  }

  /// Disposes both `first` and `second`, in that order.
  pub fn pair(first: Subscription, second: Subscription) -> Self {
    Self::new(BinaryDisposable {
      parts: Mutex::new(Some((first, second))),
      disposed: AtomicBool::new(false),
    })
  }

  #[inline]
  pub fn dispose(&self) { self.0.dispose() }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }

  /// Activates "RAII" behavior for this subscription. That means
  /// `dispose()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `dispose()` is called immediately, which is probably not what you want!
  #[must_use]
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(self) }

  /// Hands the subscription to `bag`, which disposes it when dropped.
  pub fn disposed_by(self, bag: &DisposeBag) { bag.insert(self) }

  pub fn ptr_eq(&self, other: &Subscription) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl Disposable for Subscription {
  #[inline]
  fn dispose(&self) { self.0.dispose() }
  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl<D: Disposable + 'static> From<Arc<D>> for Subscription {
  fn from(d: Arc<D>) -> Self { Self(d) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").field("is_disposed", &self.is_disposed()).finish()
  }
}

struct NopDisposable;

impl Disposable for NopDisposable {
  fn dispose(&self) {}
  fn is_disposed(&self) -> bool { false }
}

struct AnonymousDisposable {
  action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
  disposed: AtomicBool,
}

impl Disposable for AnonymousDisposable {
  fn dispose(&self) {
    if !self.disposed.swap(true, Ordering::AcqRel) {
      let action = self.action.rc_deref_mut().take();
      if let Some(action) = action {
        action();
      }
    }
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

struct BinaryDisposable {
  parts: Mutex<Option<(Subscription, Subscription)>>,
  disposed: AtomicBool,
}

impl Disposable for BinaryDisposable {
  fn dispose(&self) {
    if !self.disposed.swap(true, Ordering::AcqRel) {
      let parts = self.parts.rc_deref_mut().take();
      if let Some((first, second)) = parts {
        first.dispose();
        second.dispose();
      }
    }
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be disposed.
///
/// This structure is created by the [`Subscription::unsubscribe_when_dropped`]
/// method.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(pub(crate) Subscription);

impl SubscriptionGuard {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: Subscription) -> SubscriptionGuard { SubscriptionGuard(subscription) }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.dispose() }
}
