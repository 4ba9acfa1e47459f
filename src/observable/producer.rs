use std::sync::{
  atomic::{AtomicU8, Ordering},
  Arc, Mutex,
};

use super::Observable;
use crate::{
  observer::BoxedObserver,
  rc::RcDerefMut,
  scheduler::CurrentThreadScheduler,
  subscription::{Disposable, Subscription},
};

/// An operator instance: holds its upstream and parameters and builds one
/// sink per subscription.
///
/// `run` returns the pair `(sink, subscription)`: a handle that disposes the
/// sink itself and the handle of everything the sink subscribed to. Both are
/// released through the [`SinkDisposer`] handed in as `cancel`.
pub trait Producer: Observable {
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, Self::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription);
}

/// Subscribes `observer` to `producer`.
///
/// The whole subscription runs under the current-thread trampoline, so a
/// subscription made while another one is still being set up on this thread
/// is queued behind it instead of running on top of it.
pub fn subscribe_producer<P>(producer: &P, observer: BoxedObserver<P::Item, P::Err>) -> Subscription
where
  P: Producer + ?Sized,
{
  let disposer = SinkDisposer::new();
  CurrentThreadScheduler::trampoline(|| {
    let (sink, subscription) = producer.run(observer, disposer.clone());
    disposer.set_sink_and_subscription(sink, subscription);
  });
  Subscription::new(disposer)
}

const DISPOSED: u8 = 1;
const SINK_AND_SUBSCRIPTION_SET: u8 = 1 << 1;

/// Joins the outcome of `Producer::run` with a dispose request that may
/// arrive before `run` has returned.
///
/// Whichever of "dispose requested" and "sink and subscription set" happens
/// second performs the release, exactly once.
#[derive(Clone)]
pub struct SinkDisposer(Arc<SinkDisposerInner>);

struct SinkDisposerInner {
  state: AtomicU8,
  parts: Mutex<Option<(Subscription, Subscription)>>,
}

impl Default for SinkDisposer {
  fn default() -> Self {
    Self(Arc::new(SinkDisposerInner { state: AtomicU8::new(0), parts: Mutex::new(None) }))
  }
}

impl SinkDisposer {
  pub fn new() -> Self { Self::default() }

  pub fn set_sink_and_subscription(&self, sink: Subscription, subscription: Subscription) {
    *self.0.parts.rc_deref_mut() = Some((sink, subscription));
    let prev = self.0.state.fetch_or(SINK_AND_SUBSCRIPTION_SET, Ordering::AcqRel);
    if prev & SINK_AND_SUBSCRIPTION_SET != 0 {
      panic!("Sink and subscription were already set");
    }
    if prev & DISPOSED != 0 {
      self.release();
    }
  }

  fn release(&self) {
    let parts = self.0.parts.rc_deref_mut().take();
    if let Some((sink, subscription)) = parts {
      sink.dispose();
      subscription.dispose();
    }
  }
}

impl Disposable for SinkDisposer {
  fn dispose(&self) {
    let prev = self.0.state.fetch_or(DISPOSED, Ordering::AcqRel);
    if prev & DISPOSED != 0 {
      return;
    }
    if prev & SINK_AND_SUBSCRIPTION_SET != 0 {
      self.release();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.state.load(Ordering::Acquire) & DISPOSED != 0 }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[test]
  fn dispose_before_set_releases_on_set() {
    let disposer = SinkDisposer::new();
    disposer.dispose();
    let sink = Arc::new(BooleanDisposable::new());
    let sub = Arc::new(BooleanDisposable::new());
    disposer
      .set_sink_and_subscription(Subscription::from(sink.clone()), Subscription::from(sub.clone()));
    assert!(sink.is_disposed());
    assert!(sub.is_disposed());
  }

  #[test]
  fn dispose_after_set_releases_once() {
    let disposer = SinkDisposer::new();
    let sub = Arc::new(BooleanDisposable::new());
    disposer.set_sink_and_subscription(Subscription::empty(), Subscription::from(sub.clone()));
    assert!(!sub.is_disposed());
    disposer.dispose();
    disposer.dispose();
    assert!(sub.is_disposed());
  }

  #[test]
  #[should_panic(expected = "Sink and subscription were already set")]
  fn setting_twice_is_fatal() {
    let disposer = SinkDisposer::new();
    disposer.set_sink_and_subscription(Subscription::empty(), Subscription::empty());
    disposer.set_sink_and_subscription(Subscription::empty(), Subscription::empty());
  }
}
