use std::{
  cell::RefCell,
  cmp::Ordering,
  collections::BinaryHeap,
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskState};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};

/// Trampoline scheduler bound to the calling thread.
///
/// The first piece of work scheduled on a thread runs immediately; while it
/// runs, any work scheduled from the same thread is queued and executed, in
/// due order and FIFO among equal due times, after the running work returns.
/// Nested subscriptions and recursive sources therefore never grow the
/// stack, and the outermost `schedule_task` returns only after the queue is
/// empty. Delayed work blocks the thread until it is due.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

struct QueueItem {
  due: Instant,
  id: u64,
  task: Task,
  handle: Arc<BooleanDisposable>,
}

impl PartialEq for QueueItem {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.id == other.id }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for QueueItem {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier due first, then FIFO by id
    other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
  }
}

#[derive(Default)]
struct Trampoline {
  queue: BinaryHeap<QueueItem>,
  next_id: u64,
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<Trampoline>> = const { RefCell::new(None) };
}

struct TrampolineGuard;

impl Drop for TrampolineGuard {
  fn drop(&mut self) {
    // Take the queue out first so dropping pending tasks cannot re-enter the
    // borrow.
    let leftover = TRAMPOLINE.with(|t| t.borrow_mut().take());
    drop(leftover);
  }
}

impl CurrentThreadScheduler {
  /// `true` when no trampoline is running on this thread, i.e. work
  /// scheduled now would run immediately instead of being queued.
  pub fn is_schedule_required() -> bool { TRAMPOLINE.with(|t| t.borrow().is_none()) }

  /// Runs `f` with a trampoline installed on this thread. If this call
  /// installs it, every piece of work queued by `f` runs before it returns.
  pub fn trampoline<R>(f: impl FnOnce() -> R) -> R {
    if !Self::is_schedule_required() {
      return f();
    }
    TRAMPOLINE.with(|t| *t.borrow_mut() = Some(Trampoline::default()));
    let _guard = TrampolineGuard;
    let result = f();
    Self::drain();
    result
  }

  fn enqueue(task: Task, due: Instant, handle: Arc<BooleanDisposable>) {
    TRAMPOLINE.with(|t| {
      if let Some(trampoline) = t.borrow_mut().as_mut() {
        let id = trampoline.next_id;
        trampoline.next_id = trampoline.next_id.wrapping_add(1);
        trampoline.queue.push(QueueItem { due, id, task, handle });
      }
    })
  }

  fn drain() {
    loop {
      let next = TRAMPOLINE.with(|t| t.borrow_mut().as_mut().and_then(|t| t.queue.pop()));
      let Some(mut item) = next else { break };
      if item.handle.is_disposed() {
        continue;
      }
      let now = Instant::now();
      if item.due > now {
        thread::sleep(item.due - now);
        if item.handle.is_disposed() {
          continue;
        }
      }
      match (item.task)() {
        TaskState::Finished => {}
        TaskState::Yield => Self::enqueue(item.task, Instant::now(), item.handle),
        TaskState::Sleeping(d) => Self::enqueue(item.task, Instant::now() + d, item.handle),
      }
    }
  }
}

impl Scheduler for CurrentThreadScheduler {
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    let due = Instant::now() + delay.unwrap_or_default();
    if Self::is_schedule_required() {
      Self::trampoline(|| Self::enqueue(task, due, handle.clone()));
    } else {
      Self::enqueue(task, due, handle.clone());
    }
    Subscription::from(handle)
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::scheduler::SchedulerExt;

  #[test]
  fn nested_work_is_queued_fifo() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    CurrentThreadScheduler.schedule(move || {
      c_log.lock().unwrap().push("outer start");
      let l1 = c_log.clone();
      CurrentThreadScheduler.schedule(move || {
        l1.lock().unwrap().push("first nested");
        Subscription::empty()
      });
      let l2 = c_log.clone();
      CurrentThreadScheduler.schedule(move || {
        l2.lock().unwrap().push("second nested");
        Subscription::empty()
      });
      c_log.lock().unwrap().push("outer end");
      Subscription::empty()
    });
    assert_eq!(
      *log.lock().unwrap(),
      vec!["outer start", "outer end", "first nested", "second nested"]
    );
    assert!(CurrentThreadScheduler::is_schedule_required());
  }

  #[test]
  fn deep_recursion_does_not_grow_stack() {
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    CurrentThreadScheduler.schedule_recursive(0u32, move |i, r| {
      *c_count.lock().unwrap() += 1;
      if i < 100_000 {
        r.again(i + 1);
      }
    });
    assert_eq!(*count.lock().unwrap(), 100_001);
  }

  #[test]
  fn disposed_queued_work_is_skipped() {
    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();
    CurrentThreadScheduler::trampoline(|| {
      let handle = CurrentThreadScheduler.schedule(move || {
        *c_ran.lock().unwrap() = true;
        Subscription::empty()
      });
      handle.dispose();
    });
    assert!(!*ran.lock().unwrap());
  }
}
