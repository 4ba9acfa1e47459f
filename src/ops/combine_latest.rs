use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Combines the latest values of two sources with `binary_op` whenever
/// either emits, once both have emitted. Created by
/// [`ObservableExt::combine_latest_with`].
pub struct CombineLatestOp<A, B, F> {
  pub(crate) a: A,
  pub(crate) b: B,
  pub(crate) binary_op: Arc<F>,
}

impl<A, B, F, R> Observable for CombineLatestOp<A, B, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> R + Send + Sync + 'static,
  R: Send + 'static,
{
  type Item = R;
  type Err = A::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<R, A::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<A, B, F, R> Producer for CombineLatestOp<A, B, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> R + Send + Sync + 'static,
  R: Send + 'static,
{
  fn run(
    &self,
    observer: BoxedObserver<R, A::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let combine = Arc::new(CombineLatestSink {
      sink: SerialSink::new(observer, cancel),
      binary_op: self.binary_op.clone(),
      state: Mutex::new(PairState { a: None, b: None, a_done: false, b_done: false }),
    });
    let handle = combine.sink.handle();
    let a = self.a.actual_subscribe(Box::new(CombineA(combine.clone())));
    let b = self.b.actual_subscribe(Box::new(CombineB(combine)));
    (handle, Subscription::pair(a, b))
  }
}

enum CombineItem<A, B> {
  ItemA(A),
  ItemB(B),
}

struct PairState<A, B> {
  a: Option<A>,
  b: Option<B>,
  a_done: bool,
  b_done: bool,
}

struct CombineLatestSink<A, B, R, E, F> {
  sink: SerialSink<R, E>,
  binary_op: Arc<F>,
  state: Mutex<PairState<A, B>>,
}

impl<A, B, R, E, F> CombineLatestSink<A, B, R, E, F>
where
  A: Clone,
  B: Clone,
  F: Fn(A, B) -> R,
{
  fn on(&self, event: Event<CombineItem<A, B>, E>) {
    {
      let mut state = self.state.rc_deref_mut();
      match event {
        Event::Next(item) => {
          let other_done = match item {
            CombineItem::ItemA(v) => {
              state.a = Some(v);
              state.b_done
            }
            CombineItem::ItemB(v) => {
              state.b = Some(v);
              state.a_done
            }
          };
          match (&state.a, &state.b) {
            (Some(a), Some(b)) => {
              self.sink.push(Event::Next((self.binary_op)(a.clone(), b.clone())))
            }
            _ if other_done => self.sink.push(Event::Completed),
            _ => {}
          }
        }
        Event::Error(e) => self.sink.push(Event::Error(e)),
        Event::Completed => {
          if state.a_done && state.b_done {
            self.sink.push(Event::Completed);
          }
        }
      }
    }
    self.sink.drain();
  }

  fn done(&self, is_a: bool) {
    {
      let mut state = self.state.rc_deref_mut();
      if is_a {
        state.a_done = true;
      } else {
        state.b_done = true;
      }
    }
    self.on(Event::Completed);
  }
}

struct CombineA<A, B, R, E, F>(Arc<CombineLatestSink<A, B, R, E, F>>);

impl<A, B, R, E, F> Observer<A, E> for CombineA<A, B, R, E, F>
where
  A: Clone + Send,
  B: Clone + Send,
  R: Send,
  E: Send,
  F: Fn(A, B) -> R + Send + Sync,
{
  fn on(&self, event: Event<A, E>) {
    match event {
      Event::Completed => self.0.done(true),
      other => self.0.on(other.map(CombineItem::ItemA)),
    }
  }
}

struct CombineB<A, B, R, E, F>(Arc<CombineLatestSink<A, B, R, E, F>>);

impl<A, B, R, E, F> Observer<B, E> for CombineB<A, B, R, E, F>
where
  A: Clone + Send,
  B: Clone + Send,
  R: Send,
  E: Send,
  F: Fn(A, B) -> R + Send + Sync,
{
  fn on(&self, event: Event<B, E>) {
    match event {
      Event::Completed => self.0.done(false),
      other => self.0.on(other.map(CombineItem::ItemB)),
    }
  }
}

/// Combines the latest values of every source into a `Vec`, in source
/// order. An empty collection emits one empty `Vec` and completes. Created
/// by [`observable::combine_latest_all`](crate::observable::combine_latest_all).
pub struct CombineLatestAllOp<S> {
  pub(crate) sources: Vec<S>,
}

impl<S> Observable for CombineLatestAllOp<S>
where
  S: Observable,
  S::Item: Clone,
{
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<Vec<S::Item>, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for CombineLatestAllOp<S>
where
  S: Observable,
  S::Item: Clone,
{
  fn run(
    &self,
    observer: BoxedObserver<Vec<S::Item>, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let arity = self.sources.len();
    let combine = Arc::new(CombineLatestAllSink {
      sink: SerialSink::new(observer, cancel),
      state: Mutex::new(AllState {
        values: (0..arity).map(|_| None).collect(),
        has_value: 0,
        done: vec![false; arity],
        done_count: 0,
      }),
    });
    let handle = combine.sink.handle();
    if arity == 0 {
      combine.sink.forward_on(Event::Next(vec![]));
      combine.sink.forward_on(Event::Completed);
      return (handle, Subscription::empty());
    }
    let subscriptions = CompositeDisposable::new();
    for (index, source) in self.sources.iter().enumerate() {
      if combine.sink.is_disposed() {
        break;
      }
      let item = CombineLatestAllItem { combine: combine.clone(), index };
      subscriptions.insert(source.actual_subscribe(Box::new(item)));
    }
    (handle, Subscription::new(subscriptions))
  }
}

struct AllState<T> {
  values: Vec<Option<T>>,
  has_value: usize,
  done: Vec<bool>,
  done_count: usize,
}

struct CombineLatestAllSink<T, E> {
  sink: SerialSink<Vec<T>, E>,
  state: Mutex<AllState<T>>,
}

struct CombineLatestAllItem<T, E> {
  combine: Arc<CombineLatestAllSink<T, E>>,
  index: usize,
}

impl<T: Clone + Send, E: Send> Observer<T, E> for CombineLatestAllItem<T, E> {
  fn on(&self, event: Event<T, E>) {
    let sink = &self.combine.sink;
    {
      let mut state = self.combine.state.rc_deref_mut();
      let arity = state.values.len();
      match event {
        Event::Next(v) => {
          if state.values[self.index].replace(v).is_none() {
            state.has_value += 1;
          }
          if state.has_value == arity {
            let combined = state.values.iter().flatten().cloned().collect();
            sink.push(Event::Next(combined));
          } else {
            let others_done =
              state.done.iter().enumerate().all(|(i, done)| i == self.index || *done);
            if others_done {
              sink.push(Event::Completed);
            }
          }
        }
        Event::Error(e) => sink.push(Event::Error(e)),
        Event::Completed => {
          if !state.done[self.index] {
            state.done[self.index] = true;
            state.done_count += 1;
            if state.done_count == arity {
              sink.push(Event::Completed);
            }
          }
        }
      }
    }
    sink.drain();
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::*};

  #[test]
  fn combines_after_both_emitted() {
    let scheduler = TestScheduler::new();
    let a =
      scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), next(230, 3), completed(260)]);
    let b = scheduler.create_hot_observable(vec![next(220, 10), next(240, 20), completed(250)]);
    let res = scheduler.start(move || a.combine_latest_with(b, |a, b| a + b));
    assert_eq!(
      res.events(),
      vec![next(220, 11), next(230, 13), next(240, 23), completed(260)]
    );
  }

  #[test]
  fn single_values_emit_once() {
    let observer = TestObserver::<(i32, char), ()>::new();
    observable::just(1)
      .combine_latest_with(observable::just('x'), |a, b| (a, b))
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![(1, 'x')]);
    assert!(observer.is_completed());
  }

  #[test]
  fn error_terminates() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable::<i32, &str>(vec![next(210, 1), error(220, "boom")]);
    let b = scheduler.create_hot_observable(vec![next(215, 2), next(230, 3)]);
    let res = scheduler.start(move || a.combine_latest_with(b, |a, b| a * b));
    assert_eq!(res.events(), vec![next(215, 2), error(220, "boom")]);
  }

  #[test]
  fn collection_form() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable::<i32, ()>(vec![next(210, 1), completed(300)]);
    let b = scheduler.create_hot_observable(vec![next(220, 2), completed(300)]);
    let c = scheduler.create_hot_observable(vec![next(230, 3), next(240, 4), completed(310)]);
    let res = scheduler.start(move || {
      observable::combine_latest_all(vec![a.clone(), b.clone(), c.clone()])
    });
    assert_eq!(
      res.events(),
      vec![next(230, vec![1, 2, 3]), next(240, vec![1, 2, 4]), completed(310)]
    );
  }

  #[test]
  fn empty_collection_emits_once() {
    let observer = TestObserver::<Vec<i32>, ()>::new();
    observable::combine_latest_all(Vec::<BoxedObservable<i32, ()>>::new())
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![Vec::<i32>::new()]);
    assert!(observer.is_completed());
  }

  #[test]
  fn completes_when_value_is_impossible() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable::<i32, ()>(vec![completed(210)]);
    let b = scheduler.create_hot_observable(vec![next(220, 2), next(230, 3)]);
    let res = scheduler.start(move || observable::combine_latest_all(vec![a.clone(), b.clone()]));
    assert_eq!(res.events(), vec![completed(220)]);
  }
}
