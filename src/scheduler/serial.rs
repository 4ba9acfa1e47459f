use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use super::{
  worker::{Job, Worker, WorkerQueue},
  Scheduler, Task, TaskState,
};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};

/// Runs every task on one dedicated worker thread, in due order, one at a
/// time. Tasks due at the same instant run in the order they were scheduled.
///
/// Clones share the worker; the thread stops when the last clone is dropped
/// and pending tasks are discarded.
#[derive(Clone)]
pub struct SerialScheduler {
  worker: Arc<Worker>,
}

impl SerialScheduler {
  pub fn new(name: &str) -> Self { Self { worker: Arc::new(Worker::spawn(name)) } }
}

impl Default for SerialScheduler {
  fn default() -> Self { Self::new("rxcore-serial") }
}

impl Scheduler for SerialScheduler {
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    let queue = self.worker.queue().clone();
    let due = Instant::now() + delay.unwrap_or_default();
    queue.clone().push(due, step(queue, task, handle.clone()));
    Subscription::from(handle)
  }
}

fn step(queue: WorkerQueue, mut task: Task, handle: Arc<BooleanDisposable>) -> Job {
  Box::new(move || {
    if handle.is_disposed() {
      return;
    }
    let due = match task() {
      TaskState::Finished => return,
      TaskState::Yield => Instant::now(),
      TaskState::Sleeping(d) => Instant::now() + d,
    };
    if !handle.is_disposed() {
      queue.clone().push(due, step(queue, task, handle));
    }
  })
}

#[cfg(test)]
mod test {
  use std::{
    sync::{mpsc::channel, Mutex},
    thread,
  };

  use super::*;
  use crate::scheduler::SchedulerExt;

  #[test]
  fn tasks_do_not_overlap_and_keep_order() {
    let scheduler = SerialScheduler::new("serial-test");
    let log = Arc::new(Mutex::new(vec![]));
    let (tx, rx) = channel();
    for i in 0..5 {
      let log = log.clone();
      let tx = tx.clone();
      scheduler.schedule(move || {
        log.lock().unwrap().push(i);
        tx.send(thread::current().id()).unwrap();
        Subscription::empty()
      });
    }
    let ids: Vec<_> = (0..5).map(|_| rx.recv().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn recursive_stops_when_disposed() {
    let scheduler = SerialScheduler::default();
    let (tx, rx) = channel();
    let handle = scheduler.schedule_recursive(0, move |i, recursion| {
      if tx.send(i).is_ok() {
        recursion.again_after(i + 1, Duration::from_millis(1));
      }
    });
    assert_eq!(rx.recv().unwrap(), 0);
    assert_eq!(rx.recv().unwrap(), 1);
    handle.dispose();
    thread::sleep(Duration::from_millis(20));
    let drained: Vec<_> = rx.try_iter().collect();
    assert!(drained.len() <= 1);
  }
}
