//! Merge operator implementation
//!
//! Flattens an observable of observables by subscribing to inner sources as
//! they arrive. With a concurrency limit, inner sources beyond the limit wait
//! in a FIFO queue and are subscribed when a running one completes; a limit
//! of one gives `concat`.
//!
//! The merged sequence completes once the outer source and every inner source
//! have completed. The first error from any of them terminates it.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::{bag::BagKey, prelude::*};

pub struct MergeOp<S> {
  pub(crate) source: S,
  pub(crate) max_concurrent: usize,
}

impl<S> Observable for MergeOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
{
  type Item = <S::Item as Observable>::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for MergeOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    assert!(self.max_concurrent > 0, "merge needs a concurrency limit of at least one");
    let merge = Arc::new(MergeSink {
      sink: SerialSink::new(observer, cancel),
      max_concurrent: self.max_concurrent,
      state: Mutex::new(MergeState { active: 0, outer_done: false, queue: VecDeque::new() }),
      group: CompositeDisposable::new(),
    });
    let handle = merge.sink.handle();
    let outer = self.source.actual_subscribe(Box::new(MergeOuter(merge.clone())));
    (handle, Subscription::pair(outer, Subscription::from(merge)))
  }
}

struct MergeState<O> {
  active: usize,
  outer_done: bool,
  queue: VecDeque<O>,
}

struct MergeSink<O: Observable> {
  sink: SerialSink<O::Item, O::Err>,
  max_concurrent: usize,
  state: Mutex<MergeState<O>>,
  group: CompositeDisposable,
}

impl<O: Observable> MergeSink<O> {
  fn subscribe_inner(self: &Arc<Self>, inner: O) {
    let slot = Arc::new(SingleAssignmentDisposable::new());
    let Some(key) = self.group.insert(Subscription::from(slot.clone())) else {
      return;
    };
    let subscription = inner.actual_subscribe(Box::new(MergeInner { merge: self.clone(), key }));
    slot.set(subscription);
  }

  fn inner_completed(self: &Arc<Self>, key: BagKey) {
    self.group.remove(key);
    let next = {
      let mut state = self.state.rc_deref_mut();
      let next = state.queue.pop_front();
      if next.is_none() {
        state.active -= 1;
        if state.active == 0 && state.outer_done {
          self.sink.push(Event::Completed);
        }
      }
      next
    };
    self.sink.drain();
    if let Some(next) = next {
      self.subscribe_inner(next);
    }
  }
}

impl<O: Observable> Disposable for MergeSink<O> {
  fn dispose(&self) { self.group.dispose() }
  fn is_disposed(&self) -> bool { self.group.is_disposed() }
}

struct MergeOuter<O: Observable>(Arc<MergeSink<O>>);

impl<O: Observable> Observer<O, O::Err> for MergeOuter<O> {
  fn on(&self, event: Event<O, O::Err>) {
    match event {
      Event::Next(inner) => {
        let run_now = {
          let mut state = self.0.state.rc_deref_mut();
          if state.active < self.0.max_concurrent {
            state.active += 1;
            Some(inner)
          } else {
            state.queue.push_back(inner);
            None
          }
        };
        if let Some(inner) = run_now {
          self.0.subscribe_inner(inner);
        }
      }
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => {
        {
          let mut state = self.0.state.rc_deref_mut();
          state.outer_done = true;
          if state.active == 0 {
            self.0.sink.push(Event::Completed);
          }
        }
        self.0.sink.drain();
      }
    }
  }
}

struct MergeInner<O: Observable> {
  merge: Arc<MergeSink<O>>,
  key: BagKey,
}

impl<O: Observable> Observer<O::Item, O::Err> for MergeInner<O> {
  fn on(&self, event: Event<O::Item, O::Err>) {
    match event {
      Event::Completed => self.merge.inner_completed(self.key),
      other => self.merge.sink.forward_on(other),
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

  #[test]
  fn merge_pair_completes_after_both() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), completed(250)]);
    let b = scheduler.create_hot_observable(vec![next(220, 2), next(260, 3), completed(300)]);
    let res = scheduler.start(move || a.merge_with(b));
    assert_eq!(res.events(), vec![next(210, 1), next(220, 2), next(260, 3), completed(300)]);
  }

  #[test]
  fn merge_error_disposes_siblings() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable::<i32, &str>(vec![next(210, 1), error(230, "boom")]);
    let b = scheduler.create_hot_observable(vec![next(220, 2), next(260, 3), completed(300)]);
    let c_b = b.clone();
    let res = scheduler.start(move || a.merge_with(c_b));
    assert_eq!(res.events(), vec![next(210, 1), next(220, 2), error(230, "boom")]);
    assert_eq!(b.subscriptions(), vec![SubscriptionLog::new(200, 230)]);
  }

  #[test]
  fn empty_collection_completes() {
    let observer = TestObserver::<i32, ()>::new();
    observable::merge_all(Vec::<BoxedObservable<i32, ()>>::new()).subscribe_with(observer.clone());
    assert!(observer.is_completed());
  }

  #[test]
  fn flat_map_synchronous() {
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 2, 3])
      .flat_map(|v| observable::of([v * 10, v * 10 + 1]))
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![10, 11, 20, 21, 30, 31]);
    assert!(observer.is_completed());
  }

  #[test]
  fn limited_queues_and_maps_once() {
    let scheduler = TestScheduler::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let c_calls = calls.clone();
    let outer =
      scheduler.create_hot_observable::<u64, ()>(vec![next(210, 1), next(220, 2), completed(230)]);
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      let sched = c_scheduler.clone();
      let calls = c_calls.clone();
      outer.flat_map_limited(
        move |v| {
          calls.fetch_add(1, Ordering::SeqCst);
          observable::timer(std::time::Duration::from_millis(50), sched.clone()).map(move |_| v)
        },
        1,
      )
    });
    assert_eq!(res.events(), vec![next(260, 1), next(310, 2), completed(310)]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn concat_map_keeps_order() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable::<i32, ()>(vec![next(30, 1), completed(40)]);
    let b = scheduler.create_cold_observable(vec![next(5, 2), completed(10)]);
    let res = scheduler.start(move || observable::concat_all(vec![a.clone(), b.clone()]));
    assert_eq!(res.events(), vec![next(230, 1), next(245, 2), completed(250)]);
  }
}
