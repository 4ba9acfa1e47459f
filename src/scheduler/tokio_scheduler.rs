use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use tokio::runtime::Handle;

use super::{Scheduler, Task, TaskState};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};

/// Runs work as tasks on a tokio runtime. Time follows `tokio::time`, so a
/// paused test runtime drives it deterministically.
#[derive(Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// Uses the runtime of the calling context.
  ///
  /// # Panics
  ///
  /// Panics if called outside of a tokio runtime.
  pub fn current() -> Self { Self { handle: Handle::current() } }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Instant { tokio::time::Instant::now().into_std() }

  fn schedule_task(&self, mut task: Task, delay: Option<Duration>) -> Subscription {
    let handle = Arc::new(BooleanDisposable::new());
    let c_handle = handle.clone();
    let join = self.handle.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      while !c_handle.is_disposed() {
        match task() {
          TaskState::Finished => break,
          TaskState::Yield => tokio::task::yield_now().await,
          TaskState::Sleeping(d) => tokio::time::sleep(d).await,
        }
      }
    });
    Subscription::pair(Subscription::from(handle), Subscription::from_fn(move || join.abort()))
  }
}
