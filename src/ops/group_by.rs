//! Group-by operator implementation
//!
//! Splits the source into one grouped observable per key. A group is emitted
//! the first time its key is seen and then receives every value with that
//! key. Groups share the upstream subscription: it stays alive while any
//! group is subscribed, even after the outer sequence has been disposed.

use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Arc, Mutex},
};

use crate::prelude::*;

pub struct GroupByOp<S, F> {
  pub(crate) source: S,
  pub(crate) key_selector: Arc<F>,
}

impl<S, F, K> Observable for GroupByOp<S, F>
where
  S: Observable,
  S::Item: Clone + Sync,
  S::Err: Clone + Sync,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
{
  type Item = GroupedObservable<K, S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, K> Producer for GroupByOp<S, F>
where
  S: Observable,
  S::Item: Clone + Sync,
  S::Err: Clone + Sync,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let upstream = Arc::new(SingleAssignmentDisposable::new());
    let ref_count = RefCountDisposable::new(Subscription::from(upstream.clone()));
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let group_by = GroupBySink {
      sink,
      key_selector: self.key_selector.clone(),
      groups: Mutex::new(HashMap::new()),
      ref_count: ref_count.clone(),
      upstream: upstream.clone(),
    };
    upstream.set(self.source.actual_subscribe(Box::new(group_by)));
    (handle, Subscription::new(ref_count))
  }
}

/// The values of one key, as emitted by [`ObservableExt::group_by`].
pub struct GroupedObservable<K, T, E> {
  key: K,
  subject: PublishSubject<T, E>,
  ref_count: RefCountDisposable,
}

impl<K: Clone, T, E> Clone for GroupedObservable<K, T, E> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      subject: self.subject.clone(),
      ref_count: self.ref_count.clone(),
    }
  }
}

impl<K, T, E> GroupedObservable<K, T, E> {
  pub fn key(&self) -> &K { &self.key }
}

impl<K, T, E> Observable for GroupedObservable<K, T, E>
where
  K: Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Item = T;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<T, E>) -> Subscription {
    let retained = self.ref_count.retain();
    Subscription::pair(retained, self.subject.actual_subscribe(observer))
  }
}

struct GroupBySink<K, T, E, F> {
  sink: Sink<GroupedObservable<K, T, E>, E>,
  key_selector: Arc<F>,
  groups: Mutex<HashMap<K, PublishSubject<T, E>>>,
  ref_count: RefCountDisposable,
  upstream: Arc<SingleAssignmentDisposable>,
}

impl<K, T, E, F> GroupBySink<K, T, E, F>
where
  K: Hash + Eq + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  fn stop(&self, event: Event<GroupedObservable<K, T, E>, E>) {
    let groups: Vec<_> = self.groups.rc_deref_mut().drain().map(|(_, subject)| subject).collect();
    for subject in groups {
      match &event {
        Event::Error(e) => subject.error(e.clone()),
        _ => subject.complete(),
      }
    }
    self.sink.forward_on(event);
    self.upstream.dispose();
  }
}

impl<K, T, E, F> Observer<T, E> for GroupBySink<K, T, E, F>
where
  K: Hash + Eq + Clone + Send + Sync + 'static,
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(value) => {
        let key = (self.key_selector)(&value);
        let (subject, opened) = {
          let mut groups = self.groups.rc_deref_mut();
          match groups.get(&key) {
            Some(subject) => (subject.clone(), false),
            None => {
              let subject = PublishSubject::new();
              groups.insert(key.clone(), subject.clone());
              (subject, true)
            }
          }
        };
        if opened {
          let group =
            GroupedObservable { key, subject: subject.clone(), ref_count: self.ref_count.clone() };
          self.sink.next(group);
        }
        subject.next(value);
      }
      Event::Error(e) => self.stop(Event::Error(e)),
      Event::Completed => self.stop(Event::Completed),
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, testing::*};

  #[test]
  fn values_land_in_their_group() {
    let groups = Arc::new(Mutex::new(Vec::<(bool, TestObserver<i32, ()>)>::new()));
    let c_groups = groups.clone();
    let outer = TestObserver::new();
    observable::from_iter::<_, ()>(0..7)
      .group_by(|v| v % 2 == 0)
      .map(move |group| {
        let observer = TestObserver::new();
        group.subscribe_with(observer.clone());
        c_groups.lock().unwrap().push((*group.key(), observer));
      })
      .subscribe_with(outer.clone());

    assert_eq!(outer.values().len(), 2);
    assert!(outer.is_completed());
    let groups = groups.lock().unwrap();
    assert!(groups[0].0);
    assert_eq!(groups[0].1.values(), vec![0, 2, 4, 6]);
    assert!(!groups[1].0);
    assert_eq!(groups[1].1.values(), vec![1, 3, 5]);
    assert!(groups.iter().all(|(_, observer)| observer.is_completed()));
  }

  #[test]
  fn error_reaches_every_group() {
    let subject = PublishSubject::<&str, &str>::new();
    let groups = Arc::new(Mutex::new(Vec::<TestObserver<&str, &str>>::new()));
    let c_groups = groups.clone();
    let outer = TestObserver::new();
    subject
      .clone()
      .group_by(|word| word.len())
      .map(move |group| {
        let observer = TestObserver::new();
        group.subscribe_with(observer.clone());
        c_groups.lock().unwrap().push(observer);
      })
      .subscribe_with(outer.clone());
    subject.next("a");
    subject.next("bb");
    subject.next("c");
    subject.error("boom");

    assert_eq!(outer.error(), Some("boom"));
    let groups = groups.lock().unwrap();
    assert_eq!(groups[0].values(), vec!["a", "c"]);
    assert_eq!(groups[1].values(), vec!["bb"]);
    assert!(groups.iter().all(|observer| observer.error() == Some("boom")));
  }

  #[test]
  fn subscribed_group_keeps_upstream_alive() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![
      next(210, 1),
      next(220, 2),
      next(320, 3),
      completed(400),
    ]);
    let odd = scheduler.create_observer();
    let c_odd = odd.clone();
    let c_source = source.clone();
    scheduler.start_with_timing(100, 200, 300, move || {
      c_source.group_by(|v| v % 2).filter(|group| *group.key() == 1).map(move |group| {
        group.subscribe_with(c_odd.clone());
      })
    });
    scheduler.run();

    assert_eq!(odd.events(), vec![next(210, 1), next(320, 3), completed(400)]);
    assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 400)]);
  }
}
