use std::{
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskState};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};

/// Runs work synchronously on the calling thread before `schedule_task`
/// returns, blocking through any delay.
///
/// Because the handle is only returned after the work is done, a recursive
/// or periodic chain on this scheduler ends only when the action stops
/// requesting more work (sources check their own disposal for that).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_task(&self, mut task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    if let Some(delay) = delay {
      thread::sleep(delay);
    }
    while !handle.is_disposed() {
      match task() {
        TaskState::Finished => break,
        TaskState::Yield => {}
        TaskState::Sleeping(d) => thread::sleep(d),
      }
    }
    handle.dispose();
    Subscription::from(handle)
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::scheduler::SchedulerExt;

  #[test]
  fn runs_before_returning() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    ImmediateScheduler.schedule_recursive(0, move |i, r| {
      c_seen.lock().unwrap().push(i);
      if i < 2 {
        r.again(i + 1);
      }
    });
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }
}
