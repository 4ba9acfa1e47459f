use std::{marker::PhantomData, sync::Arc, time::Duration};

use crate::prelude::*;

/// Emits `0` after `due`, then completes.
pub fn timer<E, SD>(due: Duration, scheduler: SD) -> TimerObservable<E, SD>
where
  SD: Scheduler + Clone + 'static,
{
  TimerObservable { due, period: None, scheduler, _p: PhantomData }
}

/// Emits `0` after `due`, then the next counter value every `period`.
pub fn timer_periodic<E, SD>(
  due: Duration,
  period: Duration,
  scheduler: SD,
) -> TimerObservable<E, SD>
where
  SD: Scheduler + Clone + 'static,
{
  TimerObservable { due, period: Some(period), scheduler, _p: PhantomData }
}

/// Emits an increasing counter every `period`, starting one period after
/// subscription.
pub fn interval<E, SD>(period: Duration, scheduler: SD) -> TimerObservable<E, SD>
where
  SD: Scheduler + Clone + 'static,
{
  timer_periodic(period, period, scheduler)
}

#[derive(Clone)]
pub struct TimerObservable<E, SD> {
  due: Duration,
  period: Option<Duration>,
  scheduler: SD,
  _p: PhantomData<fn() -> E>,
}

impl<E, SD> Observable for TimerObservable<E, SD>
where
  E: Send + 'static,
  SD: Scheduler + Clone + 'static,
{
  type Item = u64;
  type Err = E;

  fn actual_subscribe(&self, observer: BoxedObserver<u64, E>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<E, SD> Producer for TimerObservable<E, SD>
where
  E: Send + 'static,
  SD: Scheduler + Clone + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<u64, E>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Arc::new(Sink::new(observer, cancel));
    let handle = sink.handle();
    let subscription = match self.period {
      None => self.scheduler.schedule_relative(self.due, move || {
        sink.next(0);
        sink.complete();
        Subscription::empty()
      }),
      Some(period) => {
        self.scheduler.schedule_recursive_after(0u64, Some(self.due), move |tick, recursion| {
          sink.next(tick);
          recursion.again_after(tick.wrapping_add(1), period);
        })
      }
    };
    (handle, subscription)
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use crate::{prelude::*, testing::*};

  #[test]
  fn one_shot() {
    let scheduler = TestScheduler::new();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      observable::timer::<(), _>(Duration::from_millis(50), c_scheduler.clone())
    });
    assert_eq!(res.events(), vec![next(250, 0), completed(250)]);
  }

  #[test]
  fn interval_until_disposed() {
    let scheduler = TestScheduler::new();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start_with_timing(0, 0, 350, move || {
      observable::interval::<(), _>(Duration::from_millis(100), c_scheduler.clone())
    });
    assert_eq!(res.events(), vec![next(100, 0), next(200, 1), next(300, 2)]);
  }

  #[test]
  fn periodic_with_initial_due() {
    let scheduler = TestScheduler::new();
    let c_scheduler = scheduler.clone();
    let res = scheduler.start(move || {
      observable::timer_periodic::<(), _>(
        Duration::from_millis(10),
        Duration::from_millis(300),
        c_scheduler.clone(),
      )
    });
    assert_eq!(res.events(), vec![next(210, 0), next(510, 1), next(810, 2)]);
  }
}
