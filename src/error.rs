//! Protocol errors produced by the runtime itself.
//!
//! Streams are generic over their error type. Operators that have to invent
//! an error on their own (an empty sequence where one element was expected,
//! a timeout, an index past the end) require `Err: From<RxError>` so the
//! failure can travel through the normal `error` channel.

use thiserror::Error;

/// The closed set of errors the runtime can raise on a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RxError {
  /// Unknown error occurred.
  #[error("unknown error occurred")]
  Unknown,
  /// Performing an action on a disposed object.
  #[error("object `{object}` was already disposed")]
  Disposed { object: &'static str },
  /// Arithmetic overflow while counting.
  #[error("arithmetic overflow")]
  Overflow,
  /// Argument out of range, e.g. `element_at` past the end of a sequence.
  #[error("argument out of range")]
  ArgumentOutOfRange,
  /// Sequence doesn't contain any elements.
  #[error("sequence doesn't contain any elements")]
  NoElements,
  /// Sequence contains more than one element.
  #[error("sequence contains more than one element")]
  MoreThanOneElement,
  /// Timeout error.
  #[error("sequence timeout")]
  Timeout,
}
