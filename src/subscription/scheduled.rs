use std::sync::{
  atomic::{AtomicBool, Ordering},
  Mutex,
};

use super::{Disposable, Subscription};
use crate::{
  rc::RcDerefMut,
  scheduler::{Scheduler, SchedulerExt},
};

/// Disposes the wrapped subscription on a given scheduler instead of on the
/// thread that calls `dispose`.
pub struct ScheduledDisposable<S> {
  scheduler: S,
  inner: Mutex<Option<Subscription>>,
  disposed: AtomicBool,
}

impl<S: Scheduler> ScheduledDisposable<S> {
  pub fn new(scheduler: S, inner: Subscription) -> Self {
    Self { scheduler, inner: Mutex::new(Some(inner)), disposed: AtomicBool::new(false) }
  }
}

impl<S: Scheduler> Disposable for ScheduledDisposable<S> {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let inner = self.inner.rc_deref_mut().take();
    if let Some(inner) = inner {
      self.scheduler.schedule(move || {
        inner.dispose();
        Subscription::empty()
      });
    }
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use super::*;
  use crate::{scheduler::VirtualTimeScheduler, subscription::BooleanDisposable};

  #[test]
  fn disposes_when_scheduler_runs() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = Arc::new(BooleanDisposable::new());
    let scheduled = ScheduledDisposable::new(scheduler.clone(), Subscription::from(inner.clone()));
    scheduled.dispose();
    assert!(scheduled.is_disposed());
    assert!(!inner.is_disposed());
    scheduler.start();
    assert!(inner.is_disposed());
  }
}
