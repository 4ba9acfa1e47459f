//! Virtual time scheduler for deterministic testing of time-based operators.
//!
//! Time only moves when the owner advances it. Due tasks run synchronously
//! on the thread that advances the clock, in due order and FIFO among tasks
//! due at the same instant.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskState};
use crate::{
  rc::RcDerefMut,
  subscription::{BooleanDisposable, Disposable, Subscription},
};

struct ScheduledTask {
  due: Duration,
  id: u64,
  task: Task,
  handle: Arc<BooleanDisposable>,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.id == other.id }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by id
    other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
  }
}

#[derive(Default)]
struct VirtualState {
  clock: Duration,
  queue: BinaryHeap<ScheduledTask>,
  next_id: u64,
  running: bool,
}

struct VirtualInner {
  epoch: Instant,
  state: Mutex<VirtualState>,
}

/// A scheduler with a virtual clock.
///
/// Clones share the clock and the task queue.
#[derive(Clone)]
pub struct VirtualTimeScheduler {
  inner: Arc<VirtualInner>,
}

impl Default for VirtualTimeScheduler {
  fn default() -> Self {
    Self {
      inner: Arc::new(VirtualInner {
        epoch: Instant::now(),
        state: Mutex::new(VirtualState::default()),
      }),
    }
  }
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// Virtual time elapsed since the scheduler was created.
  pub fn clock(&self) -> Duration { self.inner.state.rc_deref_mut().clock }

  /// Number of queued tasks, including cancelled ones not yet discarded.
  pub fn pending_count(&self) -> usize { self.inner.state.rc_deref_mut().queue.len() }

  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  /// Advances the clock by `duration`, running every task that becomes due.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.clock() + duration;
    self.advance_to(target);
  }

  /// Advances the clock to `target`, running every task due up to and
  /// including it. Moving backwards is not allowed.
  pub fn advance_to(&self, target: Duration) {
    assert!(target >= self.clock(), "virtual time cannot move backwards");
    self.inner.state.rc_deref_mut().running = true;
    self.run_until(Some(target));
    let mut state = self.inner.state.rc_deref_mut();
    state.running = false;
    if state.clock < target {
      state.clock = target;
    }
  }

  /// Runs tasks until the queue is empty or [`stop`](Self::stop) is called.
  pub fn start(&self) {
    self.inner.state.rc_deref_mut().running = true;
    self.run_until(None);
    self.inner.state.rc_deref_mut().running = false;
  }

  /// Stops a running `start` / `advance_*` loop after the current task.
  pub fn stop(&self) { self.inner.state.rc_deref_mut().running = false; }

  fn run_until(&self, target: Option<Duration>) {
    loop {
      let next = {
        let mut state = self.inner.state.rc_deref_mut();
        if !state.running {
          return;
        }
        let due = match state.queue.peek() {
          None => return,
          Some(peek) => peek.due,
        };
        if target.is_some_and(|limit| due > limit) {
          return;
        }
        let next = state.queue.pop();
        if due > state.clock {
          state.clock = due;
        }
        next
      };
      let Some(mut scheduled) = next else { return };
      if scheduled.handle.is_disposed() {
        continue;
      }
      let delay = match (scheduled.task)() {
        TaskState::Finished => continue,
        TaskState::Yield => Duration::ZERO,
        TaskState::Sleeping(d) => d,
      };
      if !scheduled.handle.is_disposed() {
        let mut state = self.inner.state.rc_deref_mut();
        let due = state.clock + delay;
        Self::push(&mut state, due, scheduled.task, scheduled.handle);
      }
    }
  }

  fn push(state: &mut VirtualState, due: Duration, task: Task, handle: Arc<BooleanDisposable>) {
    let id = state.next_id;
    state.next_id += 1;
    state.queue.push(ScheduledTask { due, id, task, handle });
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Instant { self.inner.epoch + self.clock() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    let mut state = self.inner.state.rc_deref_mut();
    let due = state.clock + delay.unwrap_or_default();
    Self::push(&mut state, due, task, handle.clone());
    Subscription::from(handle)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::scheduler::SchedulerExt;

  fn record(
    log: &Arc<Mutex<Vec<(u64, &'static str)>>>,
    s: &VirtualTimeScheduler,
    tag: &'static str,
  ) -> impl FnOnce() -> Subscription + Send + 'static {
    let log = log.clone();
    let s = s.clone();
    move || {
      log.lock().unwrap().push((s.clock().as_millis() as u64, tag));
      Subscription::empty()
    }
  }

  #[test]
  fn runs_due_tasks_in_order() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    scheduler.schedule_relative(Duration::from_millis(20), record(&log, &scheduler, "b"));
    scheduler.schedule_relative(Duration::from_millis(10), record(&log, &scheduler, "a"));
    scheduler.schedule_relative(Duration::from_millis(20), record(&log, &scheduler, "c"));
    scheduler.advance_by(Duration::from_millis(15));
    assert_eq!(*log.lock().unwrap(), vec![(10, "a")]);
    assert_eq!(scheduler.clock(), Duration::from_millis(15));
    scheduler.start();
    assert_eq!(*log.lock().unwrap(), vec![(10, "a"), (20, "b"), (20, "c")]);
    assert!(scheduler.is_empty());
  }

  #[test]
  fn now_follows_clock() {
    let scheduler = VirtualTimeScheduler::new();
    let start = scheduler.now();
    scheduler.advance_by(Duration::from_secs(3));
    assert_eq!(scheduler.now() - start, Duration::from_secs(3));
  }

  #[test]
  fn stop_interrupts_start() {
    let scheduler = VirtualTimeScheduler::new();
    let c_scheduler = scheduler.clone();
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    scheduler.schedule_periodic((), Duration::from_millis(1), move |_| {
      *c_count.lock().unwrap() += 1;
      if *c_count.lock().unwrap() == 5 {
        c_scheduler.stop();
      }
    });
    scheduler.start();
    assert_eq!(*count.lock().unwrap(), 5);
  }
}
