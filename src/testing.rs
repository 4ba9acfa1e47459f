//! Deterministic test harness on virtual time.
//!
//! [`TestScheduler`] counts time in virtual milliseconds. Hot and cold test
//! observables replay scripted [`Recorded`] events on it and log when they
//! are subscribed and disposed; [`TestableObserver`] records what arrives and
//! when. [`TestScheduler::start`] runs the usual scenario: create the
//! observable under test at 100, subscribe at 200, dispose at 1000.
//!
//! ```
//! use std::time::Duration;
//!
//! use rxcore::{prelude::*, testing::*};
//!
//! let scheduler = TestScheduler::new();
//! let source =
//!   scheduler.create_hot_observable::<i32, ()>(vec![next(150, 1), next(210, 2), completed(300)]);
//! let res = scheduler.start(move || source.map(|v| v * 10));
//! assert_eq!(res.events(), vec![next(210, 20), completed(300)]);
//! ```

use std::{
  sync::{Arc, Mutex, Weak},
  time::{Duration, Instant},
};

use crate::{
  bag::Bag,
  observable::Observable,
  observer::{BoxedObserver, Event, Observer},
  rc::RcDerefMut,
  scheduler::{Scheduler, SchedulerExt, Task, VirtualTimeScheduler},
  subscription::{CompositeDisposable, Disposable, Subscription},
};

/// Default creation time used by [`TestScheduler::start`].
pub const CREATED: u64 = 100;
/// Default subscription time used by [`TestScheduler::start`].
pub const SUBSCRIBED: u64 = 200;
/// Default disposal time used by [`TestScheduler::start`].
pub const DISPOSED: u64 = 1000;

/// A value stamped with the virtual time it was seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: T,
}

pub fn next<T, E>(time: u64, value: T) -> Recorded<Event<T, E>> {
  Recorded { time, value: Event::Next(value) }
}

pub fn error<T, E>(time: u64, err: E) -> Recorded<Event<T, E>> {
  Recorded { time, value: Event::Error(err) }
}

pub fn completed<T, E>(time: u64) -> Recorded<Event<T, E>> {
  Recorded { time, value: Event::Completed }
}

/// When a test observable was subscribed and disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribe: u64,
  pub unsubscribe: u64,
}

impl SubscriptionLog {
  pub fn new(subscribe: u64, unsubscribe: u64) -> Self { Self { subscribe, unsubscribe } }

  /// A subscription that was never disposed.
  pub fn open(subscribe: u64) -> Self { Self::new(subscribe, u64::MAX) }
}

/// Virtual-time scheduler with test observable factories.
#[derive(Clone, Default)]
pub struct TestScheduler {
  inner: VirtualTimeScheduler,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time in milliseconds.
  pub fn clock(&self) -> u64 { self.inner.clock().as_millis() as u64 }

  pub fn advance_to(&self, time: u64) { self.inner.advance_to(Duration::from_millis(time)) }

  pub fn advance_by(&self, time: u64) { self.inner.advance_by(Duration::from_millis(time)) }

  /// Runs every scheduled task, moving the clock along.
  pub fn run(&self) { self.inner.start() }

  pub fn stop(&self) { self.inner.stop() }

  /// Runs `action` at virtual time `time`, or right away if that is
  /// already past.
  pub fn schedule_at(&self, time: u64, action: impl FnOnce() + Send + 'static) -> Subscription {
    let delay = time.saturating_sub(self.clock());
    self.schedule_relative(Duration::from_millis(delay), move || {
      action();
      Subscription::empty()
    })
  }

  /// An observable that emits `events` at their absolute times to whoever
  /// is subscribed at that moment.
  pub fn create_hot_observable<T, E>(
    &self,
    events: Vec<Recorded<Event<T, E>>>,
  ) -> HotObservable<T, E>
  where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
  {
    let shared = Arc::new(HotShared {
      observers: Mutex::new(Bag::new()),
      log: SubscriptionRecorder::default(),
    });
    for Recorded { time, value } in events {
      let weak: Weak<HotShared<T, E>> = Arc::downgrade(&shared);
      self.schedule_at(time, move || {
        if let Some(shared) = weak.upgrade() {
          let observers = shared.observers.rc_deref_mut().snapshot();
          for observer in observers {
            observer.on(value.clone());
          }
        }
      });
    }
    HotObservable { scheduler: self.clone(), shared }
  }

  /// An observable that, per subscription, emits `events` at their times
  /// relative to that subscription.
  pub fn create_cold_observable<T, E>(
    &self,
    events: Vec<Recorded<Event<T, E>>>,
  ) -> ColdObservable<T, E>
  where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
  {
    ColdObservable {
      scheduler: self.clone(),
      events: Arc::new(events),
      log: Arc::new(SubscriptionRecorder::default()),
    }
  }

  pub fn create_observer<T, E>(&self) -> TestableObserver<T, E> {
    TestableObserver { scheduler: self.clone(), events: Arc::new(Mutex::new(Vec::new())) }
  }

  /// Creates the observable at `created`, subscribes at `subscribed`,
  /// disposes at `disposed` and returns what was recorded, advancing the
  /// clock to `disposed`.
  pub fn start_with_timing<O, F>(
    &self,
    created: u64,
    subscribed: u64,
    disposed: u64,
    create: F,
  ) -> TestableObserver<O::Item, O::Err>
  where
    O: Observable,
    F: FnOnce() -> O + Send + 'static,
  {
    let observer = self.create_observer();
    let source: Arc<Mutex<Option<O>>> = Arc::new(Mutex::new(None));
    let subscription: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let c_source = source.clone();
    self.schedule_at(created, move || *c_source.rc_deref_mut() = Some(create()));

    let (c_source, c_subscription, c_observer) =
      (source.clone(), subscription.clone(), observer.clone());
    self.schedule_at(subscribed, move || {
      let taken = c_source.rc_deref_mut().take();
      if let Some(source) = taken {
        let handle = source.actual_subscribe(Box::new(c_observer));
        *c_subscription.rc_deref_mut() = Some(handle);
        *c_source.rc_deref_mut() = Some(source);
      }
    });

    self.schedule_at(disposed, move || {
      let handle = subscription.rc_deref_mut().take();
      if let Some(handle) = handle {
        handle.dispose();
      }
    });

    self.advance_to(disposed);
    observer
  }

  /// [`start_with_timing`](Self::start_with_timing) at 100, 200 and 1000.
  pub fn start<O, F>(&self, create: F) -> TestableObserver<O::Item, O::Err>
  where
    O: Observable,
    F: FnOnce() -> O + Send + 'static,
  {
    self.start_with_timing(CREATED, SUBSCRIBED, DISPOSED, create)
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Instant { self.inner.now() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    self.inner.schedule_task(task, delay)
  }
}

#[derive(Default)]
struct SubscriptionRecorder(Mutex<Vec<SubscriptionLog>>);

impl SubscriptionRecorder {
  fn subscribed(&self, at: u64) -> usize {
    let mut logs = self.0.rc_deref_mut();
    logs.push(SubscriptionLog::open(at));
    logs.len() - 1
  }

  fn unsubscribed(&self, index: usize, at: u64) {
    if let Some(log) = self.0.rc_deref_mut().get_mut(index) {
      log.unsubscribe = at;
    }
  }

  fn logs(&self) -> Vec<SubscriptionLog> { self.0.rc_deref_mut().clone() }
}

type SharedObserver<T, E> = Arc<BoxedObserver<T, E>>;

struct HotShared<T, E> {
  observers: Mutex<Bag<SharedObserver<T, E>>>,
  log: SubscriptionRecorder,
}

/// See [`TestScheduler::create_hot_observable`].
pub struct HotObservable<T, E> {
  scheduler: TestScheduler,
  shared: Arc<HotShared<T, E>>,
}

impl<T, E> Clone for HotObservable<T, E> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), shared: self.shared.clone() }
  }
}

impl<T, E> HotObservable<T, E> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.shared.log.logs() }
}

impl<T, E> Observable for HotObservable<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    let index = self.shared.log.subscribed(self.scheduler.clock());
    let key = self.shared.observers.rc_deref_mut().insert(Arc::new(observer));
    let (scheduler, shared) = (self.scheduler.clone(), self.shared.clone());
    Subscription::from_fn(move || {
      shared.observers.rc_deref_mut().remove(key);
      shared.log.unsubscribed(index, scheduler.clock());
    })
  }
}

/// See [`TestScheduler::create_cold_observable`].
pub struct ColdObservable<T, E> {
  scheduler: TestScheduler,
  events: Arc<Vec<Recorded<Event<T, E>>>>,
  log: Arc<SubscriptionRecorder>,
}

impl<T, E> Clone for ColdObservable<T, E> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), events: self.events.clone(), log: self.log.clone() }
  }
}

impl<T, E> ColdObservable<T, E> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.log.logs() }
}

impl<T, E> Observable for ColdObservable<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    let index = self.log.subscribed(self.scheduler.clock());
    let observer: SharedObserver<T, E> = Arc::new(observer);
    let scheduled = Arc::new(CompositeDisposable::new());
    for recorded in self.events.iter() {
      let (observer, event) = (observer.clone(), recorded.value.clone());
      let handle = self.scheduler.schedule_relative(Duration::from_millis(recorded.time), move || {
        observer.on(event);
        Subscription::empty()
      });
      scheduled.insert(handle);
    }
    let (scheduler, log) = (self.scheduler.clone(), self.log.clone());
    Subscription::from_fn(move || {
      scheduled.dispose();
      log.unsubscribed(index, scheduler.clock());
    })
  }
}

/// Records every event with the virtual time it arrived at.
pub struct TestableObserver<T, E> {
  scheduler: TestScheduler,
  events: Arc<Mutex<Vec<Recorded<Event<T, E>>>>>,
}

impl<T, E> Clone for TestableObserver<T, E> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), events: self.events.clone() }
  }
}

impl<T: Clone, E: Clone> TestableObserver<T, E> {
  pub fn events(&self) -> Vec<Recorded<Event<T, E>>> { self.events.rc_deref_mut().clone() }

  pub fn values(&self) -> Vec<T> {
    self.events.rc_deref_mut().iter().filter_map(|r| r.value.element().cloned()).collect()
  }

  pub fn is_completed(&self) -> bool {
    self.events.rc_deref_mut().iter().any(|r| r.value.is_completed())
  }
}

impl<T: Send, E: Send> Observer<T, E> for TestableObserver<T, E> {
  fn on(&self, event: Event<T, E>) {
    let time = self.scheduler.clock();
    self.events.rc_deref_mut().push(Recorded { time, value: event });
  }
}

/// Records every event, without timing.
pub struct TestObserver<T, E> {
  events: Arc<Mutex<Vec<Event<T, E>>>>,
}

impl<T, E> Clone for TestObserver<T, E> {
  fn clone(&self) -> Self { Self { events: self.events.clone() } }
}

impl<T, E> Default for TestObserver<T, E> {
  fn default() -> Self { Self { events: Arc::new(Mutex::new(Vec::new())) } }
}

impl<T, E> TestObserver<T, E> {
  pub fn new() -> Self { Self::default() }
}

impl<T: Clone, E: Clone> TestObserver<T, E> {
  pub fn events(&self) -> Vec<Event<T, E>> { self.events.rc_deref_mut().clone() }

  pub fn values(&self) -> Vec<T> {
    self.events.rc_deref_mut().iter().filter_map(|e| e.element().cloned()).collect()
  }

  pub fn is_completed(&self) -> bool { self.events.rc_deref_mut().iter().any(Event::is_completed) }

  pub fn error(&self) -> Option<E> {
    self.events.rc_deref_mut().iter().find_map(|e| e.error().cloned())
  }
}

impl<T: Send, E: Send> Observer<T, E> for TestObserver<T, E> {
  fn on(&self, event: Event<T, E>) { self.events.rc_deref_mut().push(event) }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn hot_observable_logs_subscriptions() {
    let scheduler = TestScheduler::new();
    let source =
      scheduler.create_hot_observable::<i32, ()>(vec![next(150, 1), next(250, 2), next(350, 3)]);
    let c_source = source.clone();
    let res = scheduler.start_with_timing(100, 200, 300, move || c_source);
    assert_eq!(res.events(), vec![next(250, 2)]);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 300)]);
  }

  #[test]
  fn cold_observable_restarts_per_subscription() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_cold_observable::<i32, ()>(vec![next(10, 1), completed(20)]);
    let first = scheduler.create_observer();
    let second = scheduler.create_observer();
    let (c_source, c_first) = (source.clone(), first.clone());
    scheduler.schedule_at(100, move || {
      c_source.actual_subscribe(Box::new(c_first));
    });
    let (c_source, c_second) = (source.clone(), second.clone());
    scheduler.schedule_at(500, move || {
      c_source.actual_subscribe(Box::new(c_second));
    });
    scheduler.run();
    assert_eq!(first.events(), vec![next(110, 1), completed(120)]);
    assert_eq!(second.events(), vec![next(510, 1), completed(520)]);
    assert_eq!(
      source.subscriptions(),
      vec![SubscriptionLog::open(100), SubscriptionLog::open(500)]
    );
  }

  #[test]
  fn scheduled_actions_run_at_their_time() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    for at in [30, 10, 20] {
      let (c_seen, c_scheduler) = (seen.clone(), scheduler.clone());
      scheduler.schedule_at(at, move || c_seen.lock().unwrap().push(c_scheduler.clock()));
    }
    scheduler.advance_by(25);
    assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
    assert_eq!(scheduler.clock(), 25);
    scheduler.run();
    assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
  }
}
