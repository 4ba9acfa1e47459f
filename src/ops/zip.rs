//! Zip operator implementation
//!
//! Buffers every source's values in its own queue and emits as soon as each
//! queue holds at least one value, consuming the heads. The zipped sequence
//! completes when a completed source has nothing left buffered, since no
//! further tuple can be formed.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::prelude::*;

pub struct ZipOp<A, B> {
  pub(crate) a: A,
  pub(crate) b: B,
}

impl<A, B> Observable for ZipOp<A, B>
where
  A: Observable,
  B: Observable<Err = A::Err>,
{
  type Item = (A::Item, B::Item);
  type Err = A::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, A::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<A, B> Producer for ZipOp<A, B>
where
  A: Observable,
  B: Observable<Err = A::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<Self::Item, A::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let zip = Arc::new(ZipSink {
      sink: SerialSink::new(observer, cancel),
      state: Mutex::new(ZipState {
        a: VecDeque::new(),
        b: VecDeque::new(),
        a_done: false,
        b_done: false,
      }),
    });
    let handle = zip.sink.handle();
    let a = self.a.actual_subscribe(Box::new(ZipA(zip.clone())));
    let b = self.b.actual_subscribe(Box::new(ZipB(zip)));
    (handle, Subscription::pair(a, b))
  }
}

struct ZipState<A, B> {
  a: VecDeque<A>,
  b: VecDeque<B>,
  a_done: bool,
  b_done: bool,
}

impl<A, B> ZipState<A, B> {
  fn exhausted(&self) -> bool {
    (self.a_done && self.a.is_empty()) || (self.b_done && self.b.is_empty())
  }
}

struct ZipSink<A, B, E> {
  sink: SerialSink<(A, B), E>,
  state: Mutex<ZipState<A, B>>,
}

impl<A, B, E> ZipSink<A, B, E> {
  fn update(&self, f: impl FnOnce(&mut ZipState<A, B>)) {
    {
      let mut state = self.state.rc_deref_mut();
      f(&mut *state);
      if !state.a.is_empty() && !state.b.is_empty() {
        if let (Some(a), Some(b)) = (state.a.pop_front(), state.b.pop_front()) {
          self.sink.push(Event::Next((a, b)));
        }
      }
      if state.exhausted() {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

struct ZipA<A, B, E>(Arc<ZipSink<A, B, E>>);

impl<A: Send, B: Send, E: Send> Observer<A, E> for ZipA<A, B, E> {
  fn on(&self, event: Event<A, E>) {
    match event {
      Event::Next(v) => self.0.update(|state| state.a.push_back(v)),
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => self.0.update(|state| state.a_done = true),
    }
  }
}

struct ZipB<A, B, E>(Arc<ZipSink<A, B, E>>);

impl<A: Send, B: Send, E: Send> Observer<B, E> for ZipB<A, B, E> {
  fn on(&self, event: Event<B, E>) {
    match event {
      Event::Next(v) => self.0.update(|state| state.b.push_back(v)),
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => self.0.update(|state| state.b_done = true),
    }
  }
}

/// Zips any number of sources of the same type into `Vec`s. An empty
/// collection completes immediately. Created by
/// [`observable::zip_all`](crate::observable::zip_all).
pub struct ZipAllOp<S> {
  pub(crate) sources: Vec<S>,
}

impl<S: Observable> Observable for ZipAllOp<S> {
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Vec<S::Item>, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S: Observable> Producer for ZipAllOp<S> {
  fn run(
    &self,
    observer: BoxedObserver<Vec<S::Item>, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let arity = self.sources.len();
    let zip = Arc::new(ZipAllSink {
      sink: SerialSink::new(observer, cancel),
      state: Mutex::new(ZipAllState {
        queues: (0..arity).map(|_| VecDeque::new()).collect(),
        done: vec![false; arity],
      }),
    });
    let handle = zip.sink.handle();
    if arity == 0 {
      zip.sink.forward_on(Event::Completed);
      return (handle, Subscription::empty());
    }
    let subscriptions = CompositeDisposable::new();
    for (index, source) in self.sources.iter().enumerate() {
      if zip.sink.is_disposed() {
        break;
      }
      let item = ZipAllItem { zip: zip.clone(), index };
      subscriptions.insert(source.actual_subscribe(Box::new(item)));
    }
    (handle, Subscription::new(subscriptions))
  }
}

struct ZipAllState<T> {
  queues: Vec<VecDeque<T>>,
  done: Vec<bool>,
}

struct ZipAllSink<T, E> {
  sink: SerialSink<Vec<T>, E>,
  state: Mutex<ZipAllState<T>>,
}

struct ZipAllItem<T, E> {
  zip: Arc<ZipAllSink<T, E>>,
  index: usize,
}

impl<T: Send, E: Send> Observer<T, E> for ZipAllItem<T, E> {
  fn on(&self, event: Event<T, E>) {
    let sink = &self.zip.sink;
    {
      let mut state = self.zip.state.rc_deref_mut();
      match event {
        Event::Next(v) => {
          state.queues[self.index].push_back(v);
          if state.queues.iter().all(|q| !q.is_empty()) {
            let zipped = state.queues.iter_mut().filter_map(VecDeque::pop_front).collect();
            sink.push(Event::Next(zipped));
          }
        }
        Event::Error(e) => sink.push(Event::Error(e)),
        Event::Completed => state.done[self.index] = true,
      }
      let exhausted = state.done.iter().zip(&state.queues).any(|(done, q)| *done && q.is_empty());
      if exhausted {
        sink.push(Event::Completed);
      }
    }
    sink.drain();
  }
}
