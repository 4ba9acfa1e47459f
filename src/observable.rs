//! The source side of a stream: the [`Observable`] trait, the operator
//! methods of [`ObservableExt`] and the source constructors.
//!
//! An observable is cold unless stated otherwise: each subscription runs
//! its producing side effect anew. Subscribing hands a boxed observer in and
//! gets a [`Subscription`] back; disposing it stops delivery and releases
//! everything the subscription holds upstream.

use std::{marker::PhantomData, sync::Arc, time::Duration};

use crate::{
  error::RxError,
  observer::{AnonymousObserver, BoxedObserver, CallbackObserver, Event, Observer},
  ops::{
    amb::AmbOp,
    buffer::BufferOp,
    catch::{CatchAndReturnOp, CatchOp},
    combine_latest::{CombineLatestAllOp, CombineLatestOp},
    debounce::DebounceOp,
    default_if_empty::{DefaultIfEmptyOp, SwitchIfEmptyOp},
    delay::{DelayOp, DelaySubscriptionOp},
    distinct_until_changed::DistinctUntilChangedOp,
    element_at::{ElementAtOp, SingleOp},
    enumerate::EnumerateOp,
    group_by::GroupByOp,
    filter::{FilterOp, TryFilterOp},
    filter_map::{FilterMapOp, TryFilterMapOp},
    map::{MapOp, TryMapOp},
    materialize::{DematerializeOp, MaterializeOp},
    merge::MergeOp,
    observe_on::ObserveOnOp,
    reduce::{push_item, ReduceOp, ToVecOp},
    ref_count::RefCountOp,
    retry::{RetryConfig, RetryOp, RetryPolicy},
    retry_when::RetryWhenOp,
    sample::SampleOp,
    scan::{ScanOp, TryScanOp},
    skip::{SkipOp, SkipWhileOp},
    start_with::StartWithOp,
    subscribe_on::SubscribeOnOp,
    switch_latest::SwitchLatestOp,
    take::{TakeOp, TakeWhileOp},
    take_last::TakeLastOp,
    take_until::{SkipUntilOp, TakeUntilOp},
    tap::TapOp,
    throttle::ThrottleOp,
    timeout::{TimeoutError, TimeoutOp},
    window::WindowOp,
    with_latest_from::WithLatestFromOp,
    zip::{ZipAllOp, ZipOp},
  },
  scheduler::{CurrentThreadScheduler, Scheduler},
  subject::{PublishSubject, ReplaySubject, Subject},
  subscription::Subscription,
};

mod connectable;
mod create;
mod defer;
mod from_iter;
mod generate;
mod primitive;
mod producer;
mod sink;
mod timer;
mod trivial;
mod using;

pub use connectable::{Connectable, ConnectableObservable, ShareReplayScope};
pub use create::{create, try_create, CreateObservable, Emitter, TryCreateObservable};
pub use defer::{defer, DeferObservable};
pub use from_iter::{from_iter, from_iter_on, of, range, repeat_element, ObservableIter};
pub use generate::{generate, GenerateObservable};
pub use primitive::{Maybe, MaybeEmitter, Single, SingleEmitter};
pub use producer::{subscribe_producer, Producer, SinkDisposer};
pub use sink::{SerialSink, Sink};
pub use timer::{interval, timer, timer_periodic, TimerObservable};
pub use trivial::{
  empty, just, never, throw_err, EmptyObservable, JustObservable, NeverObservable, ThrowObservable,
};
pub use using::{using, UsingObservable};

/// A push-based source of `Item`s that may terminate with an `Err`.
pub trait Observable: Send + Sync + 'static {
  type Item: Send + 'static;
  type Err: Send + 'static;

  /// Subscribes `observer`; every operator and source implements this.
  fn actual_subscribe(&self, observer: BoxedObserver<Self::Item, Self::Err>) -> Subscription;
}

impl<S: Observable + ?Sized> Observable for Arc<S> {
  type Item = S::Item;
  type Err = S::Err;

  #[inline]
  fn actual_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> Subscription {
    (**self).actual_subscribe(observer)
  }
}

/// Type-erased, shareable observable.
pub type BoxedObservable<Item, Err> = Arc<dyn Observable<Item = Item, Err = Err>>;

/// Flattening of a fixed collection of sources, see [`merge_all`].
pub type MergeAllOp<S> =
  MergeOp<ObservableIter<Vec<Arc<S>>, <S as Observable>::Err, CurrentThreadScheduler>>;

/// Flattening of two boxed sources, see [`ObservableExt::merge_with`].
pub type MergePairOp<I, E> =
  MergeOp<ObservableIter<Vec<BoxedObservable<I, E>>, E, CurrentThreadScheduler>>;

/// Merges every source of the collection; completes once all have
/// completed. An empty collection completes immediately.
pub fn merge_all<S: Observable>(sources: impl IntoIterator<Item = S>) -> MergeAllOp<S> {
  MergeOp {
    source: from_iter(sources.into_iter().map(Arc::new).collect::<Vec<_>>()),
    max_concurrent: usize::MAX,
  }
}

/// Subscribes to the sources one after the other.
pub fn concat_all<S: Observable>(sources: impl IntoIterator<Item = S>) -> MergeAllOp<S> {
  MergeOp {
    source: from_iter(sources.into_iter().map(Arc::new).collect::<Vec<_>>()),
    max_concurrent: 1,
  }
}

/// Emits a `Vec` of the latest values of all sources each time any of them
/// emits, once all have emitted at least once.
pub fn combine_latest_all<S>(sources: impl IntoIterator<Item = S>) -> CombineLatestAllOp<S>
where
  S: Observable,
  S::Item: Clone,
{
  CombineLatestAllOp { sources: sources.into_iter().collect() }
}

/// Pairs up the n-th values of all sources into a `Vec`.
pub fn zip_all<S: Observable>(sources: impl IntoIterator<Item = S>) -> ZipAllOp<S> {
  ZipAllOp { sources: sources.into_iter().collect() }
}

/// Mirrors whichever source produces an event first.
pub fn amb_all<S: Observable>(sources: impl IntoIterator<Item = S>) -> AmbOp<S> {
  AmbOp { sources: sources.into_iter().collect() }
}

/// Operator and subscribe methods available on every [`Observable`].
pub trait ObservableExt: Observable + Sized {
  // ------------------------------------------------------------------------
  // subscribing
  // ------------------------------------------------------------------------

  /// Subscribes with a value callback. An error reaching this subscriber is
  /// logged at `warn` level and otherwise dropped.
  fn subscribe<N>(&self, next: N) -> Subscription
  where
    N: Fn(Self::Item) + Send + Sync + 'static,
  {
    self.subscribe_all(
      next,
      |_| tracing::warn!(error_type = std::any::type_name::<Self::Err>(), "unhandled error event"),
      || {},
    )
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    N: Fn(Self::Item) + Send + Sync + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.actual_subscribe(Box::new(CallbackObserver::new(next, error, complete)))
  }

  /// Subscribes with a single handler receiving every event.
  fn subscribe_on_event<F>(&self, handler: F) -> Subscription
  where
    F: Fn(Event<Self::Item, Self::Err>) + Send + Sync + 'static,
  {
    self.actual_subscribe(Box::new(AnonymousObserver::new(handler)))
  }

  fn subscribe_with<O>(&self, observer: O) -> Subscription
  where
    O: Observer<Self::Item, Self::Err> + 'static,
  {
    self.actual_subscribe(Box::new(observer))
  }

  fn boxed(self) -> BoxedObservable<Self::Item, Self::Err> { Arc::new(self) }

  // ------------------------------------------------------------------------
  // per-element transforms
  // ------------------------------------------------------------------------

  fn map<U, F>(self, f: F) -> MapOp<Self, F, U>
  where
    F: Fn(Self::Item) -> U + Send + Sync + 'static,
    U: Send + 'static,
  {
    MapOp { source: self, func: Arc::new(f), _p: PhantomData }
  }

  /// `map` with a fallible function; an `Err` terminates the sequence.
  fn try_map<U, F>(self, f: F) -> TryMapOp<Self, F, U>
  where
    F: Fn(Self::Item) -> Result<U, Self::Err> + Send + Sync + 'static,
    U: Send + 'static,
  {
    TryMapOp { source: self, func: Arc::new(f), _p: PhantomData }
  }

  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    FilterOp { source: self, predicate: Arc::new(predicate) }
  }

  fn try_filter<F>(self, predicate: F) -> TryFilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> Result<bool, Self::Err> + Send + Sync + 'static,
  {
    TryFilterOp { source: self, predicate: Arc::new(predicate) }
  }

  fn filter_map<U, F>(self, f: F) -> FilterMapOp<Self, F, U>
  where
    F: Fn(Self::Item) -> Option<U> + Send + Sync + 'static,
    U: Send + 'static,
  {
    FilterMapOp { source: self, func: Arc::new(f), _p: PhantomData }
  }

  fn try_filter_map<U, F>(self, f: F) -> TryFilterMapOp<Self, F, U>
  where
    F: Fn(Self::Item) -> Result<Option<U>, Self::Err> + Send + Sync + 'static,
    U: Send + 'static,
  {
    TryFilterMapOp { source: self, func: Arc::new(f), _p: PhantomData }
  }

  /// Emits every intermediate accumulator value.
  fn scan<Acc, F>(self, seed: Acc, f: F) -> ScanOp<Self, F, Acc>
  where
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
    Acc: Clone + Send + Sync + 'static,
  {
    ScanOp { source: self, seed, func: Arc::new(f) }
  }

  fn try_scan<Acc, F>(self, seed: Acc, f: F) -> TryScanOp<Self, F, Acc>
  where
    F: Fn(Acc, Self::Item) -> Result<Acc, Self::Err> + Send + Sync + 'static,
    Acc: Clone + Send + Sync + 'static,
  {
    TryScanOp { source: self, seed, func: Arc::new(f) }
  }

  /// Emits only the final accumulator value, on completion.
  fn reduce<Acc, F>(self, seed: Acc, f: F) -> ReduceOp<Self, F, Acc>
  where
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
    Acc: Clone + Send + Sync + 'static,
  {
    ReduceOp { source: self, seed, func: Arc::new(f) }
  }

  /// Collects every value into one `Vec` emitted on completion.
  fn to_vec(self) -> ToVecOp<Self, Self::Item>
  where
    Self::Item: Clone + Sync,
  {
    ReduceOp {
      source: self,
      seed: Vec::new(),
      func: Arc::new(push_item as fn(Vec<Self::Item>, Self::Item) -> Vec<Self::Item>),
    }
  }

  fn enumerate(self) -> EnumerateOp<Self> { EnumerateOp { source: self } }

  /// Runs `f` for every event before forwarding it.
  fn tap<F>(self, f: F) -> TapOp<Self, F>
  where
    F: Fn(&Event<Self::Item, Self::Err>) + Send + Sync + 'static,
  {
    TapOp { source: self, func: Arc::new(f) }
  }

  fn materialize(self) -> MaterializeOp<Self> { MaterializeOp { source: self } }

  fn dematerialize<T, E>(self) -> DematerializeOp<Self, T>
  where
    Self: Observable<Item = Event<T, E>, Err = E>,
    T: Send + 'static,
    E: Send + 'static,
  {
    DematerializeOp { source: self, _p: PhantomData }
  }

  fn distinct_until_changed(
    self,
  ) -> DistinctUntilChangedOp<Self, fn(&Self::Item, &Self::Item) -> bool>
  where
    Self::Item: PartialEq + Clone,
  {
    DistinctUntilChangedOp {
      source: self,
      comparer: Arc::new(PartialEq::eq as fn(&Self::Item, &Self::Item) -> bool),
    }
  }

  /// `comparer` returns `true` when two consecutive values count as equal.
  fn distinct_until_changed_by<F>(self, comparer: F) -> DistinctUntilChangedOp<Self, F>
  where
    Self::Item: Clone,
    F: Fn(&Self::Item, &Self::Item) -> bool + Send + Sync + 'static,
  {
    DistinctUntilChangedOp { source: self, comparer: Arc::new(comparer) }
  }

  fn start_with(self, values: Vec<Self::Item>) -> StartWithOp<Self>
  where
    Self::Item: Clone + Sync,
  {
    StartWithOp { source: self, values }
  }

  // ------------------------------------------------------------------------
  // taking and skipping
  // ------------------------------------------------------------------------

  fn take(self, count: usize) -> TakeOp<Self> { TakeOp { source: self, count } }

  fn take_while<F>(self, predicate: F) -> TakeWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    TakeWhileOp { source: self, predicate: Arc::new(predicate), inclusive: false }
  }

  /// Like `take_while`, also emitting the value that failed the predicate.
  fn take_while_inclusive<F>(self, predicate: F) -> TakeWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    TakeWhileOp { source: self, predicate: Arc::new(predicate), inclusive: true }
  }

  fn take_last(self, count: usize) -> TakeLastOp<Self> { TakeLastOp { source: self, count } }

  fn take_until<N>(self, notifier: N) -> TakeUntilOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    TakeUntilOp { source: self, notifier }
  }

  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp { source: self, count } }

  fn skip_while<F>(self, predicate: F) -> SkipWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    SkipWhileOp { source: self, predicate: Arc::new(predicate) }
  }

  fn skip_until<N>(self, notifier: N) -> SkipUntilOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    SkipUntilOp { source: self, notifier }
  }

  // ------------------------------------------------------------------------
  // element selection
  // ------------------------------------------------------------------------

  /// Emits the value at `index`; fails with [`RxError::ArgumentOutOfRange`]
  /// if the source completes before reaching it.
  fn element_at(self, index: usize) -> ElementAtOp<Self>
  where
    Self::Err: From<RxError>,
  {
    ElementAtOp { source: self, index }
  }

  fn first(self) -> ElementAtOp<Self>
  where
    Self::Err: From<RxError>,
  {
    self.element_at(0)
  }

  /// Emits the only value of the source, failing with
  /// [`RxError::NoElements`] or [`RxError::MoreThanOneElement`] otherwise.
  fn single(self) -> SingleOp<Self>
  where
    Self::Err: From<RxError>,
  {
    SingleOp { source: self, allow_empty: false }
  }

  /// [`single`](Self::single) as a [`Single`].
  fn as_single(self) -> Single<SingleOp<Self>>
  where
    Self::Err: From<RxError>,
  {
    Single(self.single())
  }

  /// Like [`as_single`](Self::as_single), but an empty source completes
  /// without a value.
  fn as_maybe(self) -> Maybe<SingleOp<Self>>
  where
    Self::Err: From<RxError>,
  {
    Maybe(SingleOp { source: self, allow_empty: true })
  }

  fn default_if_empty(self, default: Self::Item) -> DefaultIfEmptyOp<Self>
  where
    Self::Item: Clone + Sync,
  {
    DefaultIfEmptyOp { source: self, default }
  }

  fn switch_if_empty<F>(self, fallback: F) -> SwitchIfEmptyOp<Self, F>
  where
    F: Observable<Item = Self::Item, Err = Self::Err>,
  {
    SwitchIfEmptyOp { source: self, fallback: Arc::new(fallback) }
  }

  // ------------------------------------------------------------------------
  // flattening
  // ------------------------------------------------------------------------

  fn merge(self) -> MergeOp<Self>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    MergeOp { source: self, max_concurrent: usize::MAX }
  }

  /// Keeps at most `max_concurrent` inner sources subscribed.
  ///
  /// # Panics
  /// On subscription if `max_concurrent` is zero.
  fn merge_limited(self, max_concurrent: usize) -> MergeOp<Self>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    MergeOp { source: self, max_concurrent }
  }

  fn concat(self) -> MergeOp<Self>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    MergeOp { source: self, max_concurrent: 1 }
  }

  fn flat_map<O, F>(self, f: F) -> MergeOp<MapOp<Self, F, O>>
  where
    F: Fn(Self::Item) -> O + Send + Sync + 'static,
    O: Observable<Err = Self::Err>,
  {
    self.map(f).merge()
  }

  fn flat_map_limited<O, F>(self, f: F, max_concurrent: usize) -> MergeOp<MapOp<Self, F, O>>
  where
    F: Fn(Self::Item) -> O + Send + Sync + 'static,
    O: Observable<Err = Self::Err>,
  {
    self.map(f).merge_limited(max_concurrent)
  }

  fn concat_map<O, F>(self, f: F) -> MergeOp<MapOp<Self, F, O>>
  where
    F: Fn(Self::Item) -> O + Send + Sync + 'static,
    O: Observable<Err = Self::Err>,
  {
    self.map(f).concat()
  }

  fn merge_with<O>(self, other: O) -> MergePairOp<Self::Item, Self::Err>
  where
    O: Observable<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp { source: from_iter(vec![self.boxed(), other.boxed()]), max_concurrent: usize::MAX }
  }

  fn concat_with<O>(self, other: O) -> MergePairOp<Self::Item, Self::Err>
  where
    O: Observable<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp { source: from_iter(vec![self.boxed(), other.boxed()]), max_concurrent: 1 }
  }

  /// Mirrors the most recent inner source, dropping the previous one.
  fn switch_latest(self) -> SwitchLatestOp<Self>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    SwitchLatestOp { source: self }
  }

  fn flat_map_latest<O, F>(self, f: F) -> SwitchLatestOp<MapOp<Self, F, O>>
  where
    F: Fn(Self::Item) -> O + Send + Sync + 'static,
    O: Observable<Err = Self::Err>,
  {
    self.map(f).switch_latest()
  }

  // ------------------------------------------------------------------------
  // combining
  // ------------------------------------------------------------------------

  fn combine_latest_with<B, F, R>(self, other: B, f: F) -> CombineLatestOp<Self, B, F>
  where
    B: Observable<Err = Self::Err>,
    Self::Item: Clone,
    B::Item: Clone,
    F: Fn(Self::Item, B::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
  {
    CombineLatestOp { a: self, b: other, binary_op: Arc::new(f) }
  }

  fn zip_with<B>(self, other: B) -> ZipOp<Self, B>
  where
    B: Observable<Err = Self::Err>,
  {
    ZipOp { a: self, b: other }
  }

  /// Pairs every value with the latest value of `other`; values arriving
  /// before `other` has emitted are dropped.
  fn with_latest_from<FS>(self, other: FS) -> WithLatestFromOp<Self, FS>
  where
    FS: Observable<Err = Self::Err>,
    FS::Item: Clone,
  {
    WithLatestFromOp { source: self, from: other }
  }

  fn amb_with<O>(self, other: O) -> AmbOp<BoxedObservable<Self::Item, Self::Err>>
  where
    O: Observable<Item = Self::Item, Err = Self::Err>,
  {
    AmbOp { sources: vec![self.boxed(), other.boxed()] }
  }

  // ------------------------------------------------------------------------
  // time
  // ------------------------------------------------------------------------

  /// Emits a value only after `duration` has passed without another one.
  fn debounce<SD>(self, duration: Duration, scheduler: SD) -> DebounceOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    DebounceOp { source: self, scheduler, duration }
  }

  /// Emits at most one value per `duration`. With `latest`, the last value
  /// dropped during a window is emitted when the window closes.
  fn throttle<SD>(self, duration: Duration, latest: bool, scheduler: SD) -> ThrottleOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    ThrottleOp { source: self, scheduler, duration, latest }
  }

  /// Emits the latest value whenever `sampler` emits.
  fn sample<N>(self, sampler: N) -> SampleOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    SampleOp { source: self, sampler }
  }

  fn delay<SD>(self, delay: Duration, scheduler: SD) -> DelayOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    DelayOp { source: self, delay, scheduler }
  }

  fn delay_subscription<SD>(self, delay: Duration, scheduler: SD) -> DelaySubscriptionOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    DelaySubscriptionOp { source: Arc::new(self), delay, scheduler }
  }

  /// Fails with [`RxError::Timeout`] if no event arrives within `due` of
  /// the subscription or of the previous value.
  fn timeout<SD>(
    self,
    due: Duration,
    scheduler: SD,
  ) -> TimeoutOp<Self, TimeoutError<Self::Item, Self::Err>, SD>
  where
    Self::Err: From<RxError>,
    SD: Scheduler + Clone + 'static,
  {
    TimeoutOp { source: self, due, other: Arc::new(TimeoutError::default()), scheduler }
  }

  /// Switches to `other` on timeout.
  fn timeout_with<O, SD>(self, due: Duration, other: O, scheduler: SD) -> TimeoutOp<Self, O, SD>
  where
    O: Observable<Item = Self::Item, Err = Self::Err>,
    SD: Scheduler + Clone + 'static,
  {
    TimeoutOp { source: self, due, other: Arc::new(other), scheduler }
  }

  /// Collects values into `Vec`s flushed every `time_span` or whenever
  /// `count` values have been gathered.
  fn buffer<SD>(self, time_span: Duration, count: usize, scheduler: SD) -> BufferOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    BufferOp { source: self, time_span, count, scheduler }
  }

  /// Like `buffer`, emitting each group as an observable as soon as it opens.
  fn window<SD>(self, time_span: Duration, count: usize, scheduler: SD) -> WindowOp<Self, SD>
  where
    Self::Item: Clone + Sync,
    Self::Err: Clone + Sync,
    SD: Scheduler + Clone + 'static,
  {
    WindowOp { source: self, time_span, count, scheduler }
  }

  /// Splits the source into one [`GroupedObservable`] per key returned by
  /// `key_selector`, emitted when the key is first seen.
  ///
  /// [`GroupedObservable`]: crate::ops::group_by::GroupedObservable
  fn group_by<K, F>(self, key_selector: F) -> GroupByOp<Self, F>
  where
    Self::Item: Clone + Sync,
    Self::Err: Clone + Sync,
    F: Fn(&Self::Item) -> K + Send + Sync + 'static,
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
  {
    GroupByOp { source: self, key_selector: Arc::new(key_selector) }
  }

  // ------------------------------------------------------------------------
  // error recovery
  // ------------------------------------------------------------------------

  /// Continues with the observable returned by `handler` on error.
  fn catch<O, F>(self, handler: F) -> CatchOp<Self, F>
  where
    F: Fn(Self::Err) -> O + Send + Sync + 'static,
    O: Observable<Item = Self::Item, Err = Self::Err>,
  {
    CatchOp { source: self, handler: Arc::new(handler) }
  }

  /// Emits `value` and completes on error.
  fn catch_and_return(self, value: Self::Item) -> CatchAndReturnOp<Self>
  where
    Self::Item: Clone + Sync,
  {
    CatchAndReturnOp { source: self, value }
  }

  /// Subscribes at most `max_attempts` times in total, forwarding the last
  /// error once they are used up.
  fn retry(self, max_attempts: usize) -> RetryOp<Self, usize, CurrentThreadScheduler> {
    RetryOp {
      source: Arc::new(self),
      policy: Arc::new(max_attempts),
      scheduler: CurrentThreadScheduler,
    }
  }

  fn retry_forever(self) -> RetryOp<Self, RetryConfig, CurrentThreadScheduler> {
    RetryOp {
      source: Arc::new(self),
      policy: Arc::new(RetryConfig::new()),
      scheduler: CurrentThreadScheduler,
    }
  }

  /// Retries according to `policy`; delayed attempts run on `scheduler`.
  fn retry_with<P, SD>(self, policy: P, scheduler: SD) -> RetryOp<Self, P, SD>
  where
    P: RetryPolicy<Self::Err>,
    SD: Scheduler + Clone + 'static,
  {
    RetryOp { source: Arc::new(self), policy: Arc::new(policy), scheduler }
  }

  /// Hands the stream of errors to `notifier_factory`; every value of the
  /// notifier it returns triggers a resubscription.
  fn retry_when<N, F>(self, notifier_factory: F) -> RetryWhenOp<Self, F>
  where
    Self::Err: Clone + Sync,
    F: Fn(PublishSubject<Self::Err, Self::Err>) -> N + Send + Sync + 'static,
    N: Observable<Err = Self::Err>,
  {
    RetryWhenOp { source: Arc::new(self), notifier_factory: Arc::new(notifier_factory) }
  }

  // ------------------------------------------------------------------------
  // scheduling
  // ------------------------------------------------------------------------

  fn observe_on<SD>(self, scheduler: SD) -> ObserveOnOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    ObserveOnOp { source: self, scheduler }
  }

  fn subscribe_on<SD>(self, scheduler: SD) -> SubscribeOnOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    SubscribeOnOp { source: Arc::new(self), scheduler }
  }

  // ------------------------------------------------------------------------
  // multicasting
  // ------------------------------------------------------------------------

  /// Shares one subscription through `subject` for every connection.
  fn multicast<Sub>(self, subject: Sub) -> ConnectableObservable<Self, Sub>
  where
    Sub: Subject<Self::Item, Self::Err>,
  {
    ConnectableObservable::new(self, subject)
  }

  /// Like `multicast`, with a fresh subject for each connection.
  fn multicast_with<Sub, F>(self, factory: F) -> ConnectableObservable<Self, Sub>
  where
    Sub: Subject<Self::Item, Self::Err>,
    F: Fn() -> Sub + Send + Sync + 'static,
  {
    ConnectableObservable::with_factory(self, factory)
  }

  fn publish(self) -> ConnectableObservable<Self, PublishSubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(PublishSubject::new())
  }

  fn replay(
    self,
    buffer_size: usize,
  ) -> ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(ReplaySubject::create(buffer_size))
  }

  fn replay_all(self) -> ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(ReplaySubject::create_unbounded())
  }

  /// Shares one subscription among all current subscribers, connecting on
  /// the first and disconnecting when the last one leaves.
  fn share(self) -> RefCountOp<ConnectableObservable<Self, PublishSubject<Self::Item, Self::Err>>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast_with(PublishSubject::new).ref_count()
  }

  /// `share` replaying the latest `buffer_size` values to late subscribers.
  fn share_replay(
    self,
    buffer_size: usize,
    scope: ShareReplayScope,
  ) -> RefCountOp<ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    match scope {
      ShareReplayScope::WhileConnected => {
        self.multicast_with(move || ReplaySubject::create(buffer_size)).ref_count()
      }
      ShareReplayScope::Forever => self.multicast(ReplaySubject::create(buffer_size)).ref_count(),
    }
  }
}

impl<S: Observable> ObservableExt for S {}
