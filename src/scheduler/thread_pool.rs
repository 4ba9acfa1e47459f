use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use futures::{executor::ThreadPool, future};
use once_cell::sync::Lazy;

use super::{
  worker::{Worker, WorkerQueue},
  Scheduler, Task, TaskState,
};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};

// Keeps due times for every thread pool scheduler; jobs are only handed to
// the pool once they are due.
static TIMER: Lazy<Worker> = Lazy::new(|| Worker::spawn("rxcore-timer"));

static DEFAULT_POOL: Lazy<ThreadPoolScheduler> = Lazy::new(|| {
  ThreadPoolScheduler::new().expect("failed to create the default thread pool")
});

/// Runs work on a `futures` thread pool. Consecutive runs of the same task
/// never overlap, but different tasks run in parallel.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  pub fn new() -> std::io::Result<Self> { Ok(Self { pool: ThreadPool::new()? }) }

  pub fn from_pool(pool: ThreadPool) -> Self { Self { pool } }

  /// A process-wide scheduler backed by a default-sized pool.
  pub fn shared() -> Self { DEFAULT_POOL.clone() }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    let run = PoolRun {
      pool: self.pool.clone(),
      timer: TIMER.queue().clone(),
      task,
      handle: handle.clone(),
    };
    match delay {
      Some(delay) if delay > Duration::ZERO => run.after(delay),
      _ => run.spawn(),
    }
    Subscription::from(handle)
  }
}

struct PoolRun {
  pool: ThreadPool,
  timer: WorkerQueue,
  task: Task,
  handle: Arc<BooleanDisposable>,
}

impl PoolRun {
  fn spawn(self) {
    let pool = self.pool.clone();
    pool.spawn_ok(future::lazy(move |_| self.run()));
  }

  fn after(self, delay: Duration) {
    let timer = self.timer.clone();
    timer.push(Instant::now() + delay, Box::new(move || self.spawn()));
  }

  fn run(mut self) {
    if self.handle.is_disposed() {
      return;
    }
    match (self.task)() {
      TaskState::Finished => {}
      _ if self.handle.is_disposed() => {}
      TaskState::Yield => self.spawn(),
      TaskState::Sleeping(d) => self.after(d),
    }
  }
}
