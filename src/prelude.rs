//! Prelude module for convenient imports.

pub use std::time::Duration;

pub use crate::{
  error::RxError,
  observable::{
    self, subscribe_producer, BoxedObservable, Connectable, ConnectableObservable, Emitter, Maybe,
    Observable, ObservableExt, Producer, SerialSink, ShareReplayScope, Single, Sink, SinkDisposer,
  },
  observer::{
    AnonymousObserver, BoxedObserver, CallbackObserver, Event, Observer, SerializedObserver,
    Serializer,
  },
  ops::{
    group_by::GroupedObservable,
    retry::{RetryConfig, RetryPolicy},
    timeout::TimeoutError,
  },
  rc::RcDerefMut,
  scheduler::*,
  subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject, Subject},
  subscription::*,
};
