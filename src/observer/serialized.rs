use std::{collections::VecDeque, sync::Mutex};

use super::{BoxedObserver, Event, Observer};
use crate::rc::RcDerefMut;

/// Emit-or-queue gate that serializes deliveries without holding a lock
/// while delivering.
///
/// Producers `push` items (usually while holding their own state lock, so the
/// queue order matches their state transitions) and then call `drain` after
/// releasing that lock. Exactly one caller drains at a time; items pushed
/// while a drain is in progress, including re-entrant pushes from inside the
/// delivery callback, are delivered by that drain in order.
pub struct Serializer<T> {
  state: Mutex<SerializerState<T>>,
}

struct SerializerState<T> {
  emitting: bool,
  pending: VecDeque<T>,
}

impl<T> Default for Serializer<T> {
  fn default() -> Self {
    Self { state: Mutex::new(SerializerState { emitting: false, pending: VecDeque::new() }) }
  }
}

impl<T> Serializer<T> {
  pub fn new() -> Self { Self::default() }

  pub fn push(&self, item: T) { self.state.rc_deref_mut().pending.push_back(item); }

  /// Delivers queued items until the queue is empty. Returns immediately if
  /// another drain is already running.
  pub fn drain(&self, mut deliver: impl FnMut(T)) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.emitting || state.pending.is_empty() {
        return;
      }
      state.emitting = true;
    }
    let guard = EmittingGuard { serializer: self, finished: false };
    loop {
      let item = {
        let mut state = self.state.rc_deref_mut();
        match state.pending.pop_front() {
          Some(item) => item,
          None => {
            state.emitting = false;
            break;
          }
        }
      };
      deliver(item);
    }
    guard.finish();
  }

  /// `push` followed by `drain`.
  pub fn emit(&self, item: T, deliver: impl FnMut(T)) {
    self.push(item);
    self.drain(deliver);
  }
}

// Releases the emitting flag if a delivery unwinds, so the queue is not
// wedged forever.
struct EmittingGuard<'a, T> {
  serializer: &'a Serializer<T>,
  finished: bool,
}

impl<T> EmittingGuard<'_, T> {
  fn finish(mut self) { self.finished = true; }
}

impl<T> Drop for EmittingGuard<'_, T> {
  fn drop(&mut self) {
    if !self.finished {
      self.serializer.state.rc_deref_mut().emitting = false;
    }
  }
}

/// An observer whose deliveries go through a [`Serializer`].
///
/// Subjects keep one of these per subscriber so that replayed state queued
/// during subscription is delivered before any live event, without holding
/// the subject lock during delivery.
pub struct SerializedObserver<Item, Err> {
  inner: BoxedObserver<Item, Err>,
  queue: Serializer<Event<Item, Err>>,
}

impl<Item, Err> SerializedObserver<Item, Err> {
  pub fn new(inner: BoxedObserver<Item, Err>) -> Self { Self { inner, queue: Serializer::new() } }

  pub fn push(&self, event: Event<Item, Err>) { self.queue.push(event) }

  pub fn drain(&self) { self.queue.drain(|e| self.inner.on(e)) }
}

impl<Item: Send, Err: Send> Observer<Item, Err> for SerializedObserver<Item, Err> {
  fn on(&self, event: Event<Item, Err>) { self.queue.emit(event, |e| self.inner.on(e)) }
}
