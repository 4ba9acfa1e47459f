//! # rxcore
//!
//! A reactive streams core: push-based [`Observable`] sequences, an operator
//! library over them, [`Subject`]s for multicasting, [`Scheduler`]s that
//! decide where and when work runs, and the [`Disposable`] family that
//! tears subscriptions down.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::prelude::*;
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! observable::range::<()>(0, 10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| c_seen.lock().unwrap().push(v));
//! assert_eq!(*seen.lock().unwrap(), vec![0, 4, 8, 12, 16]);
//! ```
//!
//! Every sequence honours the same contract: any number of `Next` events,
//! then at most one `Error` or `Completed`, after which nothing more is
//! delivered. Events reach an observer one at a time.
//!
//! ## Feature flags
//!
//! - **`futures-scheduler`** (default): [`ThreadPoolScheduler`] on the
//!   `futures` thread pool.
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio runtime.
//!
//! [`Observable`]: observable::Observable
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler
//! [`Disposable`]: subscription::Disposable
//! [`ThreadPoolScheduler`]: scheduler::ThreadPoolScheduler

pub mod bag;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscription;
pub mod testing;

#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}
