//! Operator implementations.
//!
//! Every operator is a [`Producer`](crate::observable::Producer) holding its
//! source(s) and parameters, plus a sink built fresh per subscription. Single
//! source operators keep their downstream in a [`Sink`](crate::sink::Sink);
//! operators fed from several sources or threads keep their state behind one
//! lock and deliver through a [`SerialSink`](crate::sink::SerialSink). The
//! user-facing methods live on [`Observable`](crate::observable::Observable).

/// Subscribes `sink` to `source` and pairs the result with the sink handle.
macro_rules! run_single {
  ($source:expr, $sink:expr, $handle:expr) => {{
    let handle = $handle;
    let subscription = $source.subscribe_sink($sink);
    $crate::sink::SinkAndSubscription::new(handle, subscription)
  }};
}

pub mod catch;
pub mod combine_latest;
pub mod concat;
pub mod default_if_empty;
pub mod delay;
pub mod distinct_until_changed;
pub mod filter;
pub mod finalize;
pub mod ignore_elements;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod reduce;
pub mod ref_count;
pub mod retry;
pub mod sample;
pub mod scan;
pub mod skip;
pub mod start_with;
pub mod subscribe_on;
pub mod switch;
pub mod take;
pub mod take_until;
pub mod tap;
pub mod throttle;
pub mod throttle_latest;
pub mod zip;
