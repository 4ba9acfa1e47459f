//! Schedulers: where and when units of work run.
//!
//! A scheduler only has to implement [`Scheduler::schedule_task`], which runs
//! a [`Task`] after an optional delay and keeps re-running it as long as the
//! task asks for it through [`TaskState`]. Every other scheduling form
//! (one-shot, relative, recursive, periodic) is provided by [`SchedulerExt`]
//! on top of it.
//!
//! Implementations check the returned handle before every run, so disposing
//! it prevents pending work from starting and stops recursive or periodic
//! chains.

use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

use crate::subscription::{SingleAssignmentDisposable, Subscription};

mod current_thread;
mod immediate;
mod serial;
#[cfg(feature = "futures-scheduler")]
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod virtual_time;
mod worker;

pub use current_thread::CurrentThreadScheduler;
pub use immediate::ImmediateScheduler;
pub use serial::SerialScheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualTimeScheduler;

/// What a [`Task`] wants after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  /// The task is done and is dropped.
  Finished,
  /// Run the task again as soon as possible.
  Yield,
  /// Run the task again after the given duration.
  Sleeping(Duration),
}

/// A unit of work that may ask to be run again.
pub type Task = Box<dyn FnMut() -> TaskState + Send>;

/// A Scheduler orders tasks and schedules their execution.
pub trait Scheduler: Send + Sync {
  /// The scheduler's notion of the current time.
  fn now(&self) -> Instant;

  /// Runs `task` after `delay` (or as soon as possible for `None`) and keeps
  /// re-running it according to the returned [`TaskState`]. Disposing the
  /// returned subscription stops all further runs.
  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  #[inline]
  fn now(&self) -> Instant { (**self).now() }
  #[inline]
  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    (**self).schedule_task(task, delay)
  }
}

/// Continuation handle given to recursive actions.
///
/// Each call to [`again`](Self::again) or [`again_after`](Self::again_after)
/// queues one more invocation of the action. Queued invocations run in the
/// order they were requested; a delay is measured from the end of the
/// preceding invocation.
pub struct Recursion<S> {
  pending: VecDeque<(S, Option<Duration>)>,
}

impl<S> Recursion<S> {
  pub fn again(&mut self, state: S) { self.pending.push_back((state, None)) }

  pub fn again_after(&mut self, state: S, delay: Duration) {
    self.pending.push_back((state, Some(delay)))
  }
}

/// Scheduling forms derived from [`Scheduler::schedule_task`].
pub trait SchedulerExt: Scheduler {
  /// Runs `action` once, as soon as possible. The subscription returned by
  /// the action is disposed together with the returned handle.
  fn schedule<F>(&self, action: F) -> Subscription
  where
    F: FnOnce() -> Subscription + Send + 'static,
  {
    schedule_once(self, action, None)
  }

  /// Runs `action` once after `due`.
  fn schedule_relative<F>(&self, due: Duration, action: F) -> Subscription
  where
    F: FnOnce() -> Subscription + Send + 'static,
  {
    schedule_once(self, action, Some(due))
  }

  /// Runs `action(state, recursion)` as soon as possible. The action
  /// continues the loop by calling `recursion.again(next_state)`; the chain
  /// ends when an invocation requests nothing more or the returned handle is
  /// disposed. The loop never grows the stack.
  fn schedule_recursive<St, F>(&self, state: St, action: F) -> Subscription
  where
    St: Send + 'static,
    F: FnMut(St, &mut Recursion<St>) + Send + 'static,
  {
    self.schedule_recursive_after(state, None, action)
  }

  /// Like [`schedule_recursive`](Self::schedule_recursive) with the first
  /// invocation delayed by `delay`.
  fn schedule_recursive_after<St, F>(
    &self,
    state: St,
    delay: Option<Duration>,
    mut action: F,
  ) -> Subscription
  where
    St: Send + 'static,
    F: FnMut(St, &mut Recursion<St>) + Send + 'static,
  {
    let mut recursion = Recursion { pending: VecDeque::from([(state, None)]) };
    self.schedule_task(
      Box::new(move || {
        let Some((state, _)) = recursion.pending.pop_front() else {
          return TaskState::Finished;
        };
        action(state, &mut recursion);
        match recursion.pending.front() {
          None => TaskState::Finished,
          Some((_, None)) => TaskState::Yield,
          Some((_, Some(delay))) => TaskState::Sleeping(*delay),
        }
      }),
      delay,
    )
  }

  /// Runs `action` every `period`, threading `state` through the calls. The
  /// first run happens one period after scheduling.
  fn schedule_periodic<St, F>(&self, state: St, period: Duration, mut action: F) -> Subscription
  where
    St: Send + 'static,
    F: FnMut(St) -> St + Send + 'static,
  {
    let mut state = Some(state);
    self.schedule_task(
      Box::new(move || {
        if let Some(current) = state.take() {
          state = Some(action(current));
        }
        TaskState::Sleeping(period)
      }),
      Some(period),
    )
  }
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}

fn schedule_once<S, F>(scheduler: &S, action: F, delay: Option<Duration>) -> Subscription
where
  S: Scheduler + ?Sized,
  F: FnOnce() -> Subscription + Send + 'static,
{
  let slot = Arc::new(SingleAssignmentDisposable::new());
  let c_slot = slot.clone();
  let mut action = Some(action);
  let handle = scheduler.schedule_task(
    Box::new(move || {
      if let Some(action) = action.take() {
        c_slot.set(action());
      }
      TaskState::Finished
    }),
    delay,
  );
  Subscription::pair(handle, Subscription::from(slot))
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::subscription::Disposable;

  #[test]
  fn recursion_runs_in_request_order() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    scheduler.schedule_recursive(0, move |i, recursion| {
      c_seen.lock().unwrap().push(i);
      if i < 3 {
        recursion.again(i + 1);
      }
    });
    scheduler.start();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn periodic_threads_state() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let handle = scheduler.schedule_periodic(0, Duration::from_millis(10), move |i| {
      c_seen.lock().unwrap().push(i);
      i + 1
    });
    scheduler.advance_by(Duration::from_millis(35));
    handle.dispose();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }

  #[test]
  fn disposing_before_due_cancels() {
    let scheduler = VirtualTimeScheduler::new();
    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();
    let handle = scheduler.schedule_relative(Duration::from_millis(5), move || {
      *c_ran.lock().unwrap() = true;
      Subscription::empty()
    });
    handle.dispose();
    scheduler.start();
    assert!(!*ran.lock().unwrap());
  }

  #[test]
  fn action_result_is_disposed_with_handle() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = Arc::new(crate::subscription::BooleanDisposable::new());
    let c_inner = inner.clone();
    let handle = scheduler.schedule(move || Subscription::from(c_inner));
    scheduler.start();
    assert!(!inner.is_disposed());
    handle.dispose();
    assert!(inner.is_disposed());
  }
}
