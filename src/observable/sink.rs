use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use super::SinkDisposer;
use crate::{
  observer::{BoxedObserver, Event, Serializer},
  subscription::{Disposable, Subscription},
};

/// Per-subscription base of every operator.
///
/// Forwards events to the downstream observer until the first stop event,
/// then disposes the whole subscription. Events arriving after that, or
/// after the subscription was disposed from downstream, are dropped.
pub struct Sink<Item, Err> {
  observer: BoxedObserver<Item, Err>,
  state: Arc<SinkState>,
}

struct SinkState {
  cancel: SinkDisposer,
  disposed: AtomicBool,
}

impl Disposable for SinkState {
  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
    self.cancel.dispose();
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire) || self.cancel.is_disposed()
  }
}

impl<Item, Err> Sink<Item, Err> {
  pub fn new(observer: BoxedObserver<Item, Err>, cancel: SinkDisposer) -> Self {
    Self { observer, state: Arc::new(SinkState { cancel, disposed: AtomicBool::new(false) }) }
  }

  pub fn forward_on(&self, event: Event<Item, Err>) {
    if event.is_stop_event() {
      if self.state.disposed.swap(true, Ordering::AcqRel) || self.state.cancel.is_disposed() {
        return;
      }
      self.observer.on(event);
      self.state.cancel.dispose();
    } else if !self.is_disposed() {
      self.observer.on(event);
    }
  }

  #[inline]
  pub fn next(&self, value: Item) { self.forward_on(Event::Next(value)) }

  #[inline]
  pub fn error(&self, err: Err) { self.forward_on(Event::Error(err)) }

  #[inline]
  pub fn complete(&self) { self.forward_on(Event::Completed) }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.state.is_disposed() }

  /// Stops forwarding and disposes the whole subscription.
  pub fn dispose(&self) { self.state.dispose() }

  /// The handle returned as the `sink` half of `Producer::run`.
  pub fn handle(&self) -> Subscription { Subscription::from(self.state.clone()) }
}

/// A [`Sink`] fed by several producers at once.
///
/// State changes are made under the operator's own lock, the resulting
/// events are `push`ed while that lock is still held, and `drain` is called
/// after releasing it. Deliveries are thus serialized and ordered like the
/// state changes, and no lock is held while the downstream observer runs.
pub struct SerialSink<Item, Err> {
  sink: Sink<Item, Err>,
  queue: Serializer<Event<Item, Err>>,
}

impl<Item, Err> SerialSink<Item, Err> {
  pub fn new(observer: BoxedObserver<Item, Err>, cancel: SinkDisposer) -> Self {
    Self { sink: Sink::new(observer, cancel), queue: Serializer::new() }
  }

  #[inline]
  pub fn push(&self, event: Event<Item, Err>) { self.queue.push(event) }

  pub fn drain(&self) { self.queue.drain(|e| self.sink.forward_on(e)) }

  /// `push` followed by `drain`.
  pub fn forward_on(&self, event: Event<Item, Err>) {
    self.push(event);
    self.drain();
  }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.sink.is_disposed() }

  pub fn dispose(&self) { self.sink.dispose() }

  pub fn handle(&self) -> Subscription { self.sink.handle() }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::observer::AnonymousObserver;

  fn recording() -> (Arc<Mutex<Vec<Event<i32, &'static str>>>>, BoxedObserver<i32, &'static str>) {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    (log, Box::new(AnonymousObserver::new(move |e| c_log.lock().unwrap().push(e))))
  }

  #[test]
  fn at_most_one_terminal() {
    let (log, observer) = recording();
    let cancel = SinkDisposer::new();
    let sink = Sink::new(observer, cancel.clone());
    sink.next(1);
    sink.error("first");
    sink.next(2);
    sink.complete();
    sink.error("second");
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Error("first")]);
    assert!(cancel.is_disposed());
  }

  #[test]
  fn downstream_dispose_stops_forwarding() {
    let (log, observer) = recording();
    let cancel = SinkDisposer::new();
    let sink = Sink::new(observer, cancel.clone());
    cancel.dispose();
    sink.next(1);
    sink.complete();
    assert!(log.lock().unwrap().is_empty());
    assert!(sink.is_disposed());
  }
}
