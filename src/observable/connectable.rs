//! Connectable observables: one subscription to a source, multicast through a
//! subject to any number of subscribers.
//!
//! Subscribing to a [`ConnectableObservable`] only attaches to its subject;
//! the source is subscribed when [`Connectable::connect`] is called, and that
//! single subscription feeds every subscriber. Disposing the handle returned
//! by `connect` cuts the source off again.
//!
//! ```
//! use rxcore::{prelude::*, testing::TestObserver};
//!
//! let connectable = observable::of::<_, ()>([1, 2]).publish();
//! let (a, b) = (TestObserver::new(), TestObserver::new());
//! connectable.subscribe_with(a.clone());
//! connectable.subscribe_with(b.clone());
//! assert!(a.values().is_empty());
//!
//! connectable.connect();
//! assert_eq!(a.values(), vec![1, 2]);
//! assert_eq!(b.values(), vec![1, 2]);
//! ```

use std::sync::{Arc, Mutex, Weak};

use crate::{ops::ref_count::RefCountOp, prelude::*};

/// An observable whose source subscription is started explicitly.
pub trait Connectable: Observable {
  /// Subscribes the subject to the source. While a connection is live,
  /// calling `connect` again returns a handle to that same connection.
  fn connect(&self) -> Subscription;

  /// Connects on the first subscriber and disconnects once the last one
  /// is gone.
  fn ref_count(self) -> RefCountOp<Self>
  where
    Self: Sized,
  {
    RefCountOp::new(self)
  }
}

/// How long the state replayed by `share_replay` lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareReplayScope {
  /// A fresh buffer per connection: once every subscriber has left, the
  /// next one resubscribes the source and sees nothing of the old run.
  WhileConnected,
  /// One buffer for the lifetime of the operator; late subscribers get the
  /// replay even after the source has terminated.
  Forever,
}

enum SubjectSource<Sub> {
  Shared(Sub),
  Factory(Arc<dyn Fn() -> Sub + Send + Sync>),
}

struct ConnectionState<Sub> {
  subject_source: SubjectSource<Sub>,
  subject: Option<Sub>,
  connection: Option<(u64, Arc<SingleAssignmentDisposable>)>,
  next_id: u64,
}

impl<Sub: Clone> ConnectionState<Sub> {
  fn subject(&mut self) -> Sub {
    match &self.subject_source {
      SubjectSource::Shared(subject) => subject.clone(),
      SubjectSource::Factory(factory) => self.subject.get_or_insert_with(|| factory()).clone(),
    }
  }
}

/// Multicasts `source` through a subject. Created by
/// [`ObservableExt::multicast`] and friends.
pub struct ConnectableObservable<S, Sub> {
  source: Arc<S>,
  state: Arc<Mutex<ConnectionState<Sub>>>,
}

impl<S, Sub> Clone for ConnectableObservable<S, Sub> {
  fn clone(&self) -> Self { Self { source: self.source.clone(), state: self.state.clone() } }
}

impl<S, Sub> ConnectableObservable<S, Sub> {
  /// Every connection goes through `subject`.
  pub fn new(source: S, subject: Sub) -> Self {
    Self::from_subject_source(source, SubjectSource::Shared(subject))
  }

  /// Every connection goes through a subject made by `factory`; a fresh one
  /// replaces it once the connection ends.
  pub fn with_factory(source: S, factory: impl Fn() -> Sub + Send + Sync + 'static) -> Self {
    Self::from_subject_source(source, SubjectSource::Factory(Arc::new(factory)))
  }

  fn from_subject_source(source: S, subject_source: SubjectSource<Sub>) -> Self {
    let state = ConnectionState { subject_source, subject: None, connection: None, next_id: 0 };
    Self { source: Arc::new(source), state: Arc::new(Mutex::new(state)) }
  }
}

impl<S, Sub> Observable for ConnectableObservable<S, Sub>
where
  S: Observable,
  Sub: Subject<S::Item, S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    let subject = self.state.rc_deref_mut().subject();
    subject.actual_subscribe(observer)
  }
}

impl<S, Sub> Connectable for ConnectableObservable<S, Sub>
where
  S: Observable,
  Sub: Subject<S::Item, S::Err>,
{
  fn connect(&self) -> Subscription {
    let (id, slot, subject) = {
      let mut state = self.state.rc_deref_mut();
      if let Some((id, _)) = &state.connection {
        return disconnect_handle(&self.state, *id);
      }
      let subject = state.subject();
      if matches!(state.subject_source, SubjectSource::Shared(_)) && subject.is_stopped() {
        return Subscription::empty();
      }
      let id = state.next_id;
      state.next_id += 1;
      let slot = Arc::new(SingleAssignmentDisposable::new());
      state.connection = Some((id, slot.clone()));
      (id, slot, subject)
    };
    tracing::debug!(connection = id, "connecting to source");
    let observer = ConnectionObserver { subject, state: Arc::downgrade(&self.state), id };
    slot.set(self.source.actual_subscribe(Box::new(observer)));
    disconnect_handle(&self.state, id)
  }
}

fn disconnect_handle<Sub: Send + 'static>(
  state: &Arc<Mutex<ConnectionState<Sub>>>,
  id: u64,
) -> Subscription {
  let state = Arc::downgrade(state);
  Subscription::from_fn(move || {
    if let Some(state) = state.upgrade() {
      disconnect(&state, id);
    }
  })
}

/// Ends connection `id` if it is still the live one.
fn disconnect<Sub>(state: &Mutex<ConnectionState<Sub>>, id: u64) {
  let connection = {
    let mut state = state.rc_deref_mut();
    if !matches!(&state.connection, Some((current, _)) if *current == id) {
      return;
    }
    if matches!(state.subject_source, SubjectSource::Factory(_)) {
      state.subject = None;
    }
    state.connection.take()
  };
  if let Some((_, slot)) = connection {
    tracing::debug!(connection = id, "disconnecting from source");
    slot.dispose();
  }
}

struct ConnectionObserver<Sub> {
  subject: Sub,
  state: Weak<Mutex<ConnectionState<Sub>>>,
  id: u64,
}

impl<T, E, Sub> Observer<T, E> for ConnectionObserver<Sub>
where
  Sub: Subject<T, E>,
{
  fn on(&self, event: Event<T, E>) {
    let stop = event.is_stop_event();
    self.subject.on(event);
    if stop {
      if let Some(state) = self.state.upgrade() {
        disconnect(&state, self.id);
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::*};

  fn counted<T: Clone + Send + Sync + 'static>(
    values: Vec<T>,
    subscriptions: Arc<AtomicUsize>,
  ) -> impl Observable<Item = T, Err = ()> {
    observable::defer(move || {
      subscriptions.fetch_add(1, Ordering::SeqCst);
      observable::from_iter::<_, ()>(values.clone())
    })
  }

  #[test]
  fn connect_once_while_live() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_hot_observable::<i32, ()>(vec![next(150, 1), next(210, 2), next(250, 3)]);
    let connectable = source.clone().publish();
    let observer = scheduler.create_observer();
    connectable.subscribe_with(observer.clone());

    let c_connectable = connectable.clone();
    let first = Arc::new(std::sync::Mutex::new(None));
    let c_first = first.clone();
    scheduler.schedule_at(200, move || {
      let a = c_connectable.connect();
      let b = c_connectable.connect();
      *c_first.lock().unwrap() = Some((a, b));
    });
    let c_first = first.clone();
    scheduler.schedule_at(230, move || {
      if let Some((_, b)) = c_first.lock().unwrap().as_ref() {
        b.dispose();
      }
    });
    scheduler.run();

    assert_eq!(observer.events(), vec![next(210, 2)]);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 230)]);
  }

  #[test]
  fn shared_subject_does_not_reconnect_after_stop() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let connectable = counted(vec![1, 2], subscriptions.clone()).replay(1);
    connectable.connect();
    connectable.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);

    let late = TestObserver::new();
    connectable.subscribe_with(late.clone());
    assert_eq!(late.events(), vec![Event::Next(2), Event::Completed]);
  }

  #[test]
  fn factory_subject_is_fresh_per_connection() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let connectable =
      counted(vec![1, 2], subscriptions.clone()).multicast_with(|| ReplaySubject::create(1));
    connectable.connect();

    let observer = TestObserver::new();
    connectable.subscribe_with(observer.clone());
    assert!(observer.events().is_empty());

    connectable.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    assert_eq!(observer.events(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
  }
}
