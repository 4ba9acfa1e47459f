use std::sync::{Arc, Mutex};

use crate::prelude::*;

/// Emits the most recent source value each time `sampler` ticks, if a new
/// one arrived since the previous tick. Completes on the first tick after the
/// source has completed. Created by [`ObservableExt::sample`].
pub struct SampleOp<S, N> {
  pub(crate) source: S,
  pub(crate) sampler: N,
}

impl<S, N> Observable for SampleOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, N> Producer for SampleOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sample = Arc::new(SampleSink {
      sink: SerialSink::new(observer, cancel),
      state: Mutex::new(SampleState { value: None, at_end: false }),
      source: SingleAssignmentDisposable::new(),
    });
    let handle = sample.sink.handle();
    let source = self.source.actual_subscribe(Box::new(SampleSource(sample.clone())));
    sample.source.set(source);
    let sampler = self.sampler.actual_subscribe(Box::new(Sampler(sample.clone())));
    (handle, Subscription::pair(Subscription::from(sample), sampler))
  }
}

struct SampleState<T> {
  value: Option<T>,
  at_end: bool,
}

struct SampleSink<T, E> {
  sink: SerialSink<T, E>,
  state: Mutex<SampleState<T>>,
  source: SingleAssignmentDisposable,
}

impl<T: Send, E: Send> Disposable for SampleSink<T, E> {
  fn dispose(&self) { self.source.dispose() }
  fn is_disposed(&self) -> bool { self.source.is_disposed() }
}

struct SampleSource<T, E>(Arc<SampleSink<T, E>>);

impl<T: Send, E: Send> Observer<T, E> for SampleSource<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Next(v) => self.0.state.rc_deref_mut().value = Some(v),
      Event::Error(e) => self.0.sink.forward_on(Event::Error(e)),
      Event::Completed => {
        self.0.state.rc_deref_mut().at_end = true;
        self.0.source.dispose();
      }
    }
  }
}

struct Sampler<T, E>(Arc<SampleSink<T, E>>);

impl<T: Send, U, E: Send> Observer<U, E> for Sampler<T, E> {
  fn on(&self, event: Event<U, E>) {
    let sample = &self.0;
    match event {
      Event::Error(e) => sample.sink.forward_on(Event::Error(e)),
      _ => {
        {
          let mut state = sample.state.rc_deref_mut();
          if let Some(v) = state.value.take() {
            sample.sink.push(Event::Next(v));
          }
          if state.at_end {
            sample.sink.push(Event::Completed);
          }
        }
        sample.sink.drain();
      }
    }
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, testing::*};

  #[test]
  fn samples_latest_value() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, ()>(vec![
      next(210, 1),
      next(220, 2),
      next(260, 3),
      completed(320),
    ]);
    let sampler = scheduler.create_hot_observable(vec![
      next(230, ()),
      next(250, ()),
      next(270, ()),
      next(330, ()),
    ]);
    let res = scheduler.start(move || source.sample(sampler));
    assert_eq!(res.events(), vec![next(230, 2), next(270, 3), completed(330)]);
  }
}
