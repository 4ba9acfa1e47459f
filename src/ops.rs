//! Operator implementations. Each operator is reached through a method of
//! [`ObservableExt`](crate::observable::ObservableExt); the types here are
//! what those methods return.

pub mod amb;
pub mod buffer;
pub mod catch;
pub mod combine_latest;
pub mod debounce;
pub mod default_if_empty;
pub mod delay;
pub mod distinct_until_changed;
pub mod element_at;
pub mod enumerate;
pub mod filter;
pub mod filter_map;
pub mod group_by;
pub mod map;
pub mod materialize;
pub mod merge;
pub mod observe_on;
pub mod reduce;
pub mod ref_count;
pub mod retry;
pub mod retry_when;
pub mod sample;
pub mod scan;
pub mod skip;
pub mod start_with;
pub mod subscribe_on;
pub mod switch_latest;
pub mod take;
pub mod take_last;
pub mod take_until;
pub mod tap;
pub mod throttle;
pub mod timeout;
pub mod window;
pub mod with_latest_from;
pub mod zip;
