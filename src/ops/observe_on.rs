//! ObserveOn operator implementation
//!
//! Re-delivers every event on the given scheduler. Events are queued as they
//! arrive; one drain chain at a time runs on the scheduler, delivering one
//! event per recursive step, so order is kept and deliveries never overlap.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::prelude::*;

pub struct ObserveOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

impl<S, SD> Observable for ObserveOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, SD> Producer for ObserveOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let observe_on = Arc::new(ObserveOnSink {
      sink: Sink::new(observer, cancel),
      scheduler: self.scheduler.clone(),
      state: Mutex::new(ObserveOnState { queue: VecDeque::new(), running: false }),
      drain_task: SerialDisposable::new(),
    });
    let handle = observe_on.sink.handle();
    let source = self.source.actual_subscribe(Box::new(ObserveOnObserver(observe_on.clone())));
    (handle, Subscription::pair(source, Subscription::from(observe_on)))
  }
}

struct ObserveOnState<T, E> {
  queue: VecDeque<Event<T, E>>,
  running: bool,
}

struct ObserveOnSink<T, E, SD> {
  sink: Sink<T, E>,
  scheduler: SD,
  state: Mutex<ObserveOnState<T, E>>,
  drain_task: SerialDisposable,
}

impl<T: Send, E: Send, SD: Scheduler> Disposable for ObserveOnSink<T, E, SD> {
  fn dispose(&self) {
    self.drain_task.dispose();
    self.state.rc_deref_mut().queue.clear();
  }

  fn is_disposed(&self) -> bool { self.drain_task.is_disposed() }
}

struct ObserveOnObserver<T, E, SD>(Arc<ObserveOnSink<T, E, SD>>);

impl<T, E, SD> Observer<T, E> for ObserveOnObserver<T, E, SD>
where
  T: Send + 'static,
  E: Send + 'static,
  SD: Scheduler + 'static,
{
  fn on(&self, event: Event<T, E>) {
    let observe_on = &self.0;
    if observe_on.is_disposed() {
      return;
    }
    let chain = {
      let mut state = observe_on.state.rc_deref_mut();
      state.queue.push_back(event);
      if std::mem::replace(&mut state.running, true) {
        return;
      }
      // Installed while locked so a later chain always replaces this one.
      let chain = Arc::new(SingleAssignmentDisposable::new());
      observe_on.drain_task.set(Subscription::from(chain.clone()));
      chain
    };
    let c_observe_on = observe_on.clone();
    chain.set(observe_on.scheduler.schedule_recursive((), move |_, recursion| {
      let next = {
        let mut state = c_observe_on.state.rc_deref_mut();
        let next = state.queue.pop_front();
        if next.is_none() {
          state.running = false;
        }
        next
      };
      if let Some(event) = next {
        c_observe_on.sink.forward_on(event);
        recursion.again(());
      }
    }));
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
  };

  use crate::{prelude::*, testing::*};

  #[test]
  fn delivers_on_scheduler_in_order() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, ()>::new();
    observable::of([1, 2, 3]).observe_on(scheduler.clone()).subscribe_with(observer.clone());
    assert!(observer.events().is_empty());
    scheduler.start();
    assert_eq!(observer.values(), vec![1, 2, 3]);
    assert!(observer.is_completed());
  }

  #[test]
  fn dispose_drops_queued_events() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, ()>::new();
    let subscription =
      observable::of([1, 2, 3]).observe_on(scheduler.clone()).subscribe_with(observer.clone());
    subscription.dispose();
    scheduler.start();
    assert!(observer.events().is_empty());
  }

  #[test]
  fn moves_delivery_to_worker_thread() {
    let scheduler = SerialScheduler::new("observe-on-test");
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    observable::of::<_, ()>([1, 2]).observe_on(scheduler).subscribe(move |v| {
      c_seen.lock().unwrap().push((v, thread::current().id() != caller));
    });
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().len() < 2 && std::time::Instant::now() < deadline {
      thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(*seen.lock().unwrap(), vec![(1, true), (2, true)]);
  }
}
