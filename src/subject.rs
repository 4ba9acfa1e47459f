//! Subjects: sources that are also observers, fanning one stream out to
//! every current subscriber.
//!
//! All variants share [`Observers`]: the subscriber bag plus the remembered
//! stop event. Events are queued to each subscriber's [`SerializedObserver`]
//! while the subject's lock is held and delivered after it is released, so a
//! subscriber never sees a live event before the state replayed to it on
//! subscription, and no lock is held while user code runs.

use std::sync::{Arc, Mutex, Weak};

use smallvec::SmallVec;

use crate::{
  bag::{Bag, BagKey},
  observable::Observable,
  observer::{BoxedObserver, Event, Observer, SerializedObserver},
  rc::RcDerefMut,
  subscription::Subscription,
};

mod async_subject;
mod behavior;
mod publish;
mod replay;

pub use async_subject::AsyncSubject;
pub use behavior::BehaviorSubject;
pub use publish::PublishSubject;
pub use replay::ReplaySubject;

/// A source that is simultaneously an observer.
pub trait Subject<T, E>: Observable<Item = T, Err = E> + Observer<T, E> + Clone {
  /// `true` once an error or completion has been received.
  fn is_stopped(&self) -> bool;

  fn observer_count(&self) -> usize;

  fn has_observers(&self) -> bool { self.observer_count() > 0 }
}

type Subscriber<T, E> = Arc<SerializedObserver<T, E>>;

/// Observers queued with an event, to be drained once the lock is released.
pub(crate) struct Pending<T, E>(SmallVec<[Subscriber<T, E>; 2]>);

impl<T: Send, E: Send> Pending<T, E> {
  pub(crate) fn none() -> Self { Self(SmallVec::new()) }

  pub(crate) fn deliver(self) {
    for observer in self.0 {
      observer.drain();
    }
  }
}

/// Subscriber bag and terminal memory shared by every subject.
pub(crate) struct Observers<T, E> {
  bag: Bag<Subscriber<T, E>>,
  stopped: Option<Event<T, E>>,
}

impl<T, E> Default for Observers<T, E> {
  fn default() -> Self { Self { bag: Bag::new(), stopped: None } }
}

impl<T: Clone + Send, E: Clone + Send> Observers<T, E> {
  #[inline]
  pub(crate) fn is_stopped(&self) -> bool { self.stopped.is_some() }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.bag.len() }

  pub(crate) fn stop_event(&self) -> Option<&Event<T, E>> { self.stopped.as_ref() }

  /// Queues `value` to every subscriber; the last one gets the original.
  pub(crate) fn next(&self, value: T) -> Pending<T, E> {
    let pending: SmallVec<[Subscriber<T, E>; 2]> = self.bag.iter().cloned().collect();
    if let Some((last, rest)) = pending.split_last() {
      for observer in rest {
        observer.push(Event::Next(value.clone()));
      }
      last.push(Event::Next(value));
    }
    Pending(pending)
  }

  /// Records the stop event and queues it to every subscriber, which are
  /// released. Only the first stop event has any effect.
  pub(crate) fn stop(&mut self, event: Event<T, E>) -> Pending<T, E> {
    if self.stopped.is_some() {
      return Pending::none();
    }
    let pending: SmallVec<[Subscriber<T, E>; 2]> = self.bag.drain().collect();
    for observer in &pending {
      observer.push(event.clone());
    }
    self.stopped = Some(event);
    Pending(pending)
  }

  /// Adds a subscriber; `replay` is queued to it before any live event.
  /// A stopped subject gets the subscriber the replay plus its stop event
  /// and keeps nothing.
  pub(crate) fn add(
    &mut self,
    observer: BoxedObserver<T, E>,
    replay: impl IntoIterator<Item = Event<T, E>>,
  ) -> (Option<BagKey>, Pending<T, E>) {
    let observer = Arc::new(SerializedObserver::new(observer));
    for event in replay {
      observer.push(event);
    }
    let key = match &self.stopped {
      Some(stop) => {
        observer.push(stop.clone());
        None
      }
      None => Some(self.bag.insert(observer.clone())),
    };
    let mut pending = SmallVec::new();
    pending.push(observer);
    (key, Pending(pending))
  }

  pub(crate) fn remove(&mut self, key: BagKey) { self.bag.remove(key); }
}

/// Access to the [`Observers`] inside a subject's state, used by the
/// removal handle handed back from `subscribe`.
pub(crate) trait HasObservers<T, E>: Send + 'static {
  fn observers(&mut self) -> &mut Observers<T, E>;
}

/// Subscribes `observer` to the subject whose state is `state`, replaying
/// `replay` first.
pub(crate) fn subscribe_to<S, T, E>(
  state: &Arc<Mutex<S>>,
  observer: BoxedObserver<T, E>,
  replay: impl FnOnce(&S) -> SmallVec<[Event<T, E>; 2]>,
) -> Subscription
where
  S: HasObservers<T, E>,
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  let (key, pending) = {
    let mut guard = state.rc_deref_mut();
    let replay = replay(&guard);
    guard.observers().add(observer, replay)
  };
  pending.deliver();
  match key {
    Some(key) => {
      let weak: Weak<Mutex<S>> = Arc::downgrade(state);
      Subscription::from_fn(move || {
        if let Some(state) = weak.upgrade() {
          state.rc_deref_mut().observers().remove(key);
        }
      })
    }
    None => Subscription::disposed(),
  }
}
