//! End-to-end scenarios on virtual time.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc, Barrier, Mutex,
  },
  time::Duration,
};

use rxcore::{prelude::*, testing::*};

#[test]
fn debounce_keeps_the_last_value_of_each_burst() {
  let scheduler = TestScheduler::new();
  let source = scheduler.create_cold_observable::<&str, ()>(vec![
    next(0, "a"),
    next(50, "b"),
    next(100, "c"),
    next(400, "d"),
  ]);
  let c_scheduler = scheduler.clone();
  let res = scheduler.start(move || source.debounce(Duration::from_millis(200), c_scheduler));
  assert_eq!(res.events(), vec![next(500, "c"), next(800, "d")]);
}

#[test]
fn retry_gives_up_after_three_attempts() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let c_attempts = attempts.clone();
  let observer = TestObserver::<i32, &str>::new();
  observable::defer(move || {
    c_attempts.fetch_add(1, Ordering::SeqCst);
    observable::throw_err::<i32, _>("down")
  })
  .retry(3)
  .subscribe_with(observer.clone());
  assert_eq!(attempts.load(Ordering::SeqCst), 3);
  assert_eq!(observer.events(), vec![Event::Error("down")]);
}

#[test]
fn retry_stops_after_a_success() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let c_attempts = attempts.clone();
  let observer = TestObserver::<i32, &str>::new();
  observable::defer(move || {
    if c_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
      observable::throw_err::<i32, &str>("flaky").boxed()
    } else {
      observable::just::<i32, &str>(42).boxed()
    }
  })
  .retry(3)
  .subscribe_with(observer.clone());
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
  assert_eq!(observer.events(), vec![Event::Next(42), Event::Completed]);
}

#[test]
fn share_replay_while_connected_counts_side_effects() {
  let side_effects = Arc::new(AtomicUsize::new(0));
  let c_side_effects = side_effects.clone();
  let shared = observable::defer(move || {
    c_side_effects.fetch_add(1, Ordering::SeqCst);
    observable::never::<i32, ()>().start_with(vec![1])
  })
  .share_replay(1, ShareReplayScope::WhileConnected);

  let first = shared.subscribe(|_| {});
  let second = shared.subscribe(|_| {});
  assert_eq!(side_effects.load(Ordering::SeqCst), 1);

  first.dispose();
  second.dispose();
  let third = TestObserver::new();
  shared.subscribe_with(third.clone());
  assert_eq!(side_effects.load(Ordering::SeqCst), 2);
  assert_eq!(third.values(), vec![1]);
}

#[test]
fn replay_subject_replays_its_buffer_first() {
  let subject = ReplaySubject::<i32, ()>::create(2);
  for v in [1, 2, 3] {
    subject.next(v);
  }
  let observer = TestObserver::new();
  subject.subscribe_with(observer.clone());
  subject.next(4);
  assert_eq!(observer.values(), vec![2, 3, 4]);
}

#[test]
fn behavior_subject_starts_with_its_value() {
  let subject = BehaviorSubject::<i32, ()>::new(0);
  let observer = TestObserver::new();
  subject.subscribe_with(observer.clone());
  subject.next(1);
  assert_eq!(observer.values(), vec![0, 1]);
  assert_eq!(subject.value(), Ok(1));
}

#[test]
fn merge_completes_when_both_complete() {
  let scheduler = TestScheduler::new();
  let a = scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), completed(300)]);
  let b = scheduler.create_hot_observable::<i32, ()>(vec![next(220, 2), completed(400)]);
  let (c_a, c_b) = (a.clone(), b.clone());
  let res = scheduler.start(move || c_a.merge_with(c_b));
  assert_eq!(res.events(), vec![next(210, 1), next(220, 2), completed(400)]);
}

#[test]
fn merge_error_disposes_the_other_source() {
  let scheduler = TestScheduler::new();
  let a = scheduler.create_hot_observable::<i32, &str>(vec![next(210, 1), error(250, "boom")]);
  let b =
    scheduler.create_hot_observable::<i32, &str>(vec![next(220, 2), next(260, 3), completed(400)]);
  let (c_a, c_b) = (a.clone(), b.clone());
  let res = scheduler.start(move || observable::merge_all([c_a, c_b]));
  assert_eq!(res.events(), vec![next(210, 1), next(220, 2), error(250, "boom")]);
  assert_eq!(b.subscriptions(), vec![SubscriptionLog::new(200, 250)]);
}

#[test]
fn combine_latest_of_single_values_emits_once() {
  let scheduler = TestScheduler::new();
  let a = scheduler.create_cold_observable::<i32, ()>(vec![next(10, 1), completed(20)]);
  let b = scheduler.create_cold_observable::<i32, ()>(vec![next(30, 2), completed(40)]);
  let res = scheduler.start(move || a.combine_latest_with(b, |a, b| a + b));
  assert_eq!(res.events(), vec![next(230, 3), completed(240)]);
}

#[test]
fn subject_fans_out_across_threads() {
  let subject = PublishSubject::<usize, ()>::new();
  let total = Arc::new(Mutex::new(0));
  let c_total = total.clone();
  subject.clone().subscribe(move |v| *c_total.lock().unwrap() += v);
  let handles: Vec<_> = (0..4)
    .map(|_| {
      let subject = subject.clone();
      std::thread::spawn(move || (1..=100).for_each(|v| subject.next(v)))
    })
    .collect();
  handles.into_iter().for_each(|h| h.join().unwrap());
  assert_eq!(*total.lock().unwrap(), 4 * 5050);
}

#[test]
fn share_replay_connects_once_under_concurrent_subscribers() {
  const SUBSCRIBERS: usize = 8;
  let connections = Arc::new(AtomicUsize::new(0));
  let subject = PublishSubject::<i32, ()>::new();
  let (c_connections, c_subject) = (connections.clone(), subject.clone());
  let shared = observable::defer(move || {
    c_connections.fetch_add(1, Ordering::SeqCst);
    c_subject.clone().start_with(vec![0])
  })
  .share_replay(1, ShareReplayScope::WhileConnected);

  let barrier = Arc::new(Barrier::new(SUBSCRIBERS));
  let handles: Vec<_> = (0..SUBSCRIBERS)
    .map(|_| {
      let (shared, barrier) = (shared.clone(), barrier.clone());
      std::thread::spawn(move || {
        let observer = TestObserver::<i32, ()>::new();
        barrier.wait();
        let subscription = shared.subscribe_with(observer.clone());
        (observer, subscription)
      })
    })
    .collect();
  let subscribers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  assert_eq!(connections.load(Ordering::SeqCst), 1);

  for v in 1..=3 {
    subject.next(v);
  }
  subject.complete();
  for (observer, _) in &subscribers {
    assert_eq!(observer.values(), vec![0, 1, 2, 3]);
    assert!(observer.is_completed());
  }
}

#[test]
fn share_replay_delivers_in_order_while_subscribers_join() {
  const SUBSCRIBERS: usize = 6;
  const LAST: i32 = 500;
  let subject = PublishSubject::<i32, ()>::new();
  let shared = subject.clone().share_replay(1, ShareReplayScope::WhileConnected);
  let anchor = TestObserver::<i32, ()>::new();
  shared.subscribe_with(anchor.clone());

  let barrier = Arc::new(Barrier::new(SUBSCRIBERS + 1));
  let emitter = SerialScheduler::new("share-replay-emitter");
  let (done_tx, done_rx) = mpsc::channel();
  let (c_subject, c_barrier) = (subject.clone(), barrier.clone());
  emitter.schedule(move || {
    c_barrier.wait();
    (0..=LAST).for_each(|v| c_subject.next(v));
    c_subject.complete();
    let _ = done_tx.send(());
    Subscription::empty()
  });

  let handles: Vec<_> = (0..SUBSCRIBERS)
    .map(|_| {
      let (shared, barrier) = (shared.clone(), barrier.clone());
      std::thread::spawn(move || {
        let observer = TestObserver::<i32, ()>::new();
        barrier.wait();
        shared.subscribe_with(observer.clone());
        observer
      })
    })
    .collect();
  let observers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  done_rx.recv_timeout(Duration::from_secs(10)).unwrap();

  assert_eq!(anchor.values(), (0..=LAST).collect::<Vec<_>>());
  for observer in observers {
    let values = observer.values();
    assert!(values.windows(2).all(|w| w[1] == w[0] + 1), "gap or reorder in {values:?}");
    if let Some(last) = values.last() {
      assert_eq!(*last, LAST);
    }
    assert!(observer.is_completed());
  }
}
