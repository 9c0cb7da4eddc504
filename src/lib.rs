//! Cached, thread-safe access to process environment facts.
//!
//! This crate provides two layers:
//!
//! - [`RaceOnce<T>`]: a non-blocking once cell that any number of threads may
//!   race to populate. One publish wins, the rest are discarded, and reads
//!   settle to a single atomic load once a value is in place.
//! - [`EnvFacts`]: a context object memoizing two process-global facts in
//!   `RaceOnce` cells (whether the process runs under a CI/CD pipeline, and
//!   the host machine name), plus a strict, never-cached variable lookup.
//!
//! Unlike `std::sync::OnceLock`, [`RaceOnce`] never blocks: competing
//! first-time computations are allowed to run redundantly and settle the race
//! with a single compare-and-swap. This fits facts that are cheap and
//! deterministic to compute, where "everyone computes, one result sticks" is
//! indistinguishable from mutual exclusion and avoids its cost.
//!
//! # Features
//!
//! - **Lock-free throughout**: no futex, no parking, no spinning.
//! - **Monotonic cells**: a published value never changes and never reverts.
//! - **Error-free facts**: faulting lookups are logged and replaced by fixed
//!   fallbacks, so callers of the memoized facts never handle errors.
//! - **Optional delay** (`delay` feature, on by default): a cancellable,
//!   pipeline-conditional sleep built on `tokio::time`.
//!
//! # Examples
//!
//! ## Racing cell
//!
//! ```rust
//! use env_facts::RaceOnce;
//!
//! static ANSWER: RaceOnce<u32> = RaceOnce::new();
//!
//! assert_eq!(ANSWER.get(), None);
//! assert!(ANSWER.try_publish(42)); // First publish wins...
//! assert!(!ANSWER.try_publish(7)); // ...later ones are discarded.
//! assert_eq!(ANSWER.get(), Some(&42));
//! ```
//!
//! ## Environment facts
//!
//! ```rust
//! use env_facts::{require_var, EnvFacts};
//!
//! static FACTS: EnvFacts = EnvFacts::new();
//!
//! // Memoized, never fails: resolved once, cached for the process lifetime.
//! let machine = FACTS.machine_name();
//! assert!(!machine.is_empty());
//!
//! // Strict, never cached: fails on every call until the variable is set.
//! assert!(require_var("SOME_REQUIRED_SETTING").is_err());
//! ```

/// Process environment facts built on the racing cell.
mod env;

/// Race-publish once cell implementation.
mod race;

/// Internal synchronization state management.
mod state;

pub use env::{require_var, EnvError, EnvFacts, PIPELINE_ENV_VAR, UNKNOWN_MACHINE_NAME};
pub use race::RaceOnce;
