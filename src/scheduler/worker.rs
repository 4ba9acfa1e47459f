//! A dedicated thread that runs jobs at their due instant.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{Arc, Condvar, Mutex, PoisonError},
  thread,
  time::Instant,
};

use crate::rc::RcDerefMut;

pub(crate) type Job = Box<dyn FnOnce() + Send>;

struct Entry {
  due: Instant,
  id: u64,
  job: Job,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.id == other.id }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier due first, then FIFO by id
    other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
  }
}

#[derive(Default)]
struct QueueState {
  heap: BinaryHeap<Entry>,
  next_id: u64,
  shutdown: bool,
}

#[derive(Default)]
struct Shared {
  state: Mutex<QueueState>,
  ready: Condvar,
}

/// Non-owning handle used to enqueue jobs. Jobs keep one of these to
/// re-enqueue themselves without keeping the worker thread alive.
#[derive(Clone)]
pub(crate) struct WorkerQueue(Arc<Shared>);

impl WorkerQueue {
  pub(crate) fn push(&self, due: Instant, job: Job) {
    let mut state = self.0.state.rc_deref_mut();
    if state.shutdown {
      return;
    }
    let id = state.next_id;
    state.next_id = state.next_id.wrapping_add(1);
    state.heap.push(Entry { due, id, job });
    self.0.ready.notify_one();
  }
}

/// Owns the worker thread; the thread stops once this is dropped.
pub(crate) struct Worker {
  queue: WorkerQueue,
}

impl Worker {
  pub(crate) fn spawn(name: &str) -> Self {
    let shared = Arc::new(Shared::default());
    let c_shared = shared.clone();
    let name = name.to_string();
    thread::Builder::new()
      .name(name.clone())
      .spawn(move || run(&name, &c_shared))
      .expect("failed to spawn scheduler worker thread");
    Worker { queue: WorkerQueue(shared) }
  }

  pub(crate) fn queue(&self) -> &WorkerQueue { &self.queue }
}

impl Drop for Worker {
  fn drop(&mut self) {
    let dropped = {
      let mut state = self.queue.0.state.rc_deref_mut();
      state.shutdown = true;
      std::mem::take(&mut state.heap)
    };
    self.queue.0.ready.notify_all();
    drop(dropped);
  }
}

fn run(name: &str, shared: &Shared) {
  tracing::debug!(worker = name, "scheduler worker started");
  let mut state = shared.state.rc_deref_mut();
  loop {
    if state.shutdown {
      break;
    }
    let now = Instant::now();
    let next_due = state.heap.peek().map(|e| e.due);
    match next_due {
      None => {
        state = shared.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
      }
      Some(due) if due > now => {
        state = shared
          .ready
          .wait_timeout(state, due - now)
          .map(|(guard, _)| guard)
          .unwrap_or_else(|e| e.into_inner().0);
      }
      Some(_) => {
        if let Some(entry) = state.heap.pop() {
          drop(state);
          (entry.job)();
          state = shared.state.rc_deref_mut();
        }
      }
    }
  }
  tracing::debug!(worker = name, "scheduler worker stopped");
}

#[cfg(test)]
mod test {
  use std::{sync::mpsc::channel, time::Duration};

  use super::*;

  #[test]
  fn runs_in_due_order() {
    let worker = Worker::spawn("test-worker");
    let (tx, rx) = channel();
    let now = Instant::now();
    for (i, delay) in [(1, 30), (2, 10), (3, 20)] {
      let tx = tx.clone();
      worker
        .queue()
        .push(now + Duration::from_millis(delay), Box::new(move || tx.send(i).unwrap()));
    }
    let got: Vec<i32> = (0..3).map(|_| rx.recv().unwrap()).collect();
    assert_eq!(got, vec![2, 3, 1]);
  }
}
