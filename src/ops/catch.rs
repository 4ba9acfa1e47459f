use std::sync::Arc;

use crate::prelude::*;

/// On error, continues with the observable returned by `handler`. Created by
/// [`ObservableExt::catch`].
pub struct CatchOp<S, F> {
  pub(crate) source: S,
  pub(crate) handler: Arc<F>,
}

impl<S, F, O> Observable for CatchOp<S, F>
where
  S: Observable,
  F: Fn(S::Err) -> O + Send + Sync + 'static,
  O: Observable<Item = S::Item, Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S, F, O> Producer for CatchOp<S, F>
where
  S: Observable,
  F: Fn(S::Err) -> O + Send + Sync + 'static,
  O: Observable<Item = S::Item, Err = S::Err>,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let catch = Arc::new(CatchSink {
      sink: Sink::new(observer, cancel),
      handler: self.handler.clone(),
      subscription: SerialDisposable::new(),
    });
    let handle = catch.sink.handle();
    let source = Arc::new(SingleAssignmentDisposable::new());
    catch.subscription.set(Subscription::from(source.clone()));
    source.set(self.source.actual_subscribe(Box::new(CatchObserver(catch.clone()))));
    (handle, Subscription::from(catch))
  }
}

struct CatchSink<T, E, F> {
  sink: Sink<T, E>,
  handler: Arc<F>,
  subscription: SerialDisposable,
}

impl<T: Send, E: Send, F: Send + Sync> Disposable for CatchSink<T, E, F> {
  fn dispose(&self) { self.subscription.dispose() }
  fn is_disposed(&self) -> bool { self.subscription.is_disposed() }
}

struct CatchObserver<T, E, F>(Arc<CatchSink<T, E, F>>);

impl<T, E, F, O> Observer<T, E> for CatchObserver<T, E, F>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(E) -> O + Send + Sync + 'static,
  O: Observable<Item = T, Err = E>,
{
  fn on(&self, event: Event<T, E>) {
    let catch = &self.0;
    match event {
      Event::Error(e) => {
        if catch.sink.is_disposed() {
          return;
        }
        let fallback = (catch.handler)(e);
        let subscription = fallback.actual_subscribe(Box::new(HandlerObserver(catch.clone())));
        catch.subscription.set(subscription);
      }
      event => catch.sink.forward_on(event),
    }
  }
}

struct HandlerObserver<T, E, F>(Arc<CatchSink<T, E, F>>);

impl<T: Send, E: Send, F: Send + Sync> Observer<T, E> for HandlerObserver<T, E, F> {
  fn on(&self, event: Event<T, E>) { self.0.sink.forward_on(event) }
}

/// On error, emits `value` and completes. Created by
/// [`ObservableExt::catch_and_return`].
pub struct CatchAndReturnOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) value: S::Item,
}

impl<S> Observable for CatchAndReturnOp<S>
where
  S: Observable,
  S::Item: Clone + Sync,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    subscribe_producer(self, observer)
  }
}

impl<S> Producer for CatchAndReturnOp<S>
where
  S: Observable,
  S::Item: Clone + Sync,
{
  fn run(
    &self,
    observer: BoxedObserver<S::Item, S::Err>,
    cancel: SinkDisposer,
  ) -> (Subscription, Subscription) {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let catch = CatchAndReturnSink { sink, value: self.value.clone() };
    let subscription = self.source.actual_subscribe(Box::new(catch));
    (handle, subscription)
  }
}

struct CatchAndReturnSink<T, E> {
  sink: Sink<T, E>,
  value: T,
}

impl<T: Clone + Send + Sync, E: Send> Observer<T, E> for CatchAndReturnSink<T, E> {
  fn on(&self, event: Event<T, E>) {
    match event {
      Event::Error(_) => {
        self.sink.next(self.value.clone());
        self.sink.complete();
      }
      event => self.sink.forward_on(event),
    }
  }
}
