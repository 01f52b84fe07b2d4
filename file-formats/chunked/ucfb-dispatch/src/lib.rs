//! Parallel `(tag, platform, version) -> handler` dispatch over a ucfb chunk
//! tree, with per-chunk failure isolation (spec.md §4.C, §5, §7).
//!
//! A [`Dispatcher`] is built once with every known `(tag, platform, version)`
//! registration, then driven recursively: a container handler calls
//! [`Dispatcher::dispatch_children`] on its own payload to descend further,
//! passing along the [`DispatchEnv`] it was given.

mod dispatcher;
mod error;
mod version;

pub use dispatcher::{DispatchEnv, Dispatcher, DispatcherBuilder, HandlerFn};
pub use error::{DispatchFailure, HandlerError, Result};
pub use version::{GameVersion, Platform};
