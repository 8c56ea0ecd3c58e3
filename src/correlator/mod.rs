//! Event correlation for request/response style waits over the event stream.
//!
//! A command handler that asks the platform for something (for example a form) gets
//! its answer back as an ordinary event on the shared stream, mixed with every other
//! interaction the bot receives. This module lets the handler register interest in
//! that one future event without blocking the stream:
//!
//! - [`EventCorrelator`]: registry of active correlations, fed with every incoming event
//! - `PendingCorrelation`: one registered wait (predicate, deadline, delivery channel)
//! - [`CorrelationHandle`]: owner-side handle used to cancel a wait
//!
//! # Resolution
//!
//! A correlation is Active while its entry sits in the registry. Whoever removes the
//! entry first (a matching dispatch, the expiry timer or a cancellation) resolves it,
//! and the removal happens under the registry lock, so exactly one of `on_match` or
//! `on_timeout` runs, exactly once, or neither on cancellation.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use clockey::correlator::EventCorrelator;
//!
//! # async fn example() {
//! let correlator: EventCorrelator<u32> = EventCorrelator::new();
//!
//! let handle = correlator.wait(
//!     |value| *value == 42,
//!     Duration::from_secs(120),
//!     |value| async move { println!("matched {value}") },
//!     || async { println!("timed out") },
//! );
//!
//! correlator.dispatch(&7); // ignored
//! correlator.dispatch(&42); // resolves the wait
//! assert!(!handle.is_active());
//! # }
//! ```

mod correlation;
mod event_correlator;

pub use crate::correlator::{correlation::CorrelationHandle, event_correlator::EventCorrelator};
