//! # rxcore: a reactive-stream runtime
//!
//! Composable observable pipelines that deliver `next`, `error` and
//! `complete` events to observers, with a pluggable scheduler abstraction and
//! a disposal discipline that tears every subscription down deterministically.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let sub = observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! assert!(sub.is_disposed());
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Producer`] | Subscription-time logic of an observable |
//! | [`Observable`] | Facade trait with `subscribe` and every operator |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Scheduler`] | Where and when work runs |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): `ConcurrentScheduler` on a futures
//!   thread pool
//! - **`timer`** (default): delayed tasks on the thread pool sleep with
//!   `futures-time` instead of blocking a worker
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio runtime handle
//! - **`trace-resources`**: emit `tracing` events on target
//!   `rxcore::resources` whenever a sink or subscription is created or
//!   released
//!
//! [`Producer`]: observable::Producer
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler

extern crate self as rxcore;

pub mod bag;
pub mod driver;
pub mod error;
pub mod event;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod sink;
pub mod subject;
pub mod subscription;
pub mod testing;

mod resources;

pub use prelude::*;
