//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.
//! [`Observer`](crate::observer::Observer) is not re-exported: subjects have
//! inherent `next`/`error`/`complete` methods of the same names.

// Core traits and sources
pub use crate::observable::{
  self, BoxedObservable, ConnectableObservable, Emitter, Observable, Producer,
};
// Driver
pub use crate::driver::{AsDriver, Binder, Driver};
pub use crate::error::ContractViolation;
pub use crate::event::Event;
// Operator configuration
pub use crate::ops::{concat::ConcatConfig, retry::RetryConfig};
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ConcurrentScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  CurrentThreadScheduler, Duration, ImmediateScheduler, Scheduler, SchedulerExt, SerialScheduler,
  Task, TaskHandle, TaskState, VirtualTimeScheduler,
};
// Subjects
pub use crate::subject::{
  BehaviorSubject, PublishSubject, ReplayPolicy, ReplaySubject, Subject, ValueError, Variable,
};
// Subscriptions
pub use crate::subscription::*;
