//! Process environment facts built on the race-publish cell.
//!
//! This module answers a small set of questions about the process
//! environment: is this a pipeline (CI) run, what is the machine called, and
//! what is the value of a variable the caller refuses to run without. The
//! first two are genuinely process-global and queried from many call sites,
//! so they are memoized in [`RaceOnce`] cells; the strict lookup is
//! deliberately never cached so every call re-checks the live environment.
//!
//! Memoized facts never surface errors: a faulting machine-name lookup is
//! logged once and replaced by [`UNKNOWN_MACHINE_NAME`], and an absent or
//! garbled pipeline variable simply resolves to `false`.

use std::env::{self, VarError};

#[cfg(feature = "delay")]
use tracing::debug;
use tracing::warn;

use crate::RaceOnce;

/// Environment variable controlling pipeline detection.
///
/// The literal value `true`, in any letter case, marks the process as running
/// under a CI/CD pipeline. Anything else, including absence, does not.
pub const PIPELINE_ENV_VAR: &str = "PipelineEnvironment";

/// Machine name substituted when the real lookup faults.
pub const UNKNOWN_MACHINE_NAME: &str = "Unknown";

/// Error returned by [`require_var`] when a strictly required environment
/// variable cannot be produced.
///
/// Only the strict lookup path signals errors; the memoized facts on
/// [`EnvFacts`] recover locally and never return one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
   /// The variable is not present in the process environment.
   #[error("required environment variable `{name}` is not set")]
   NotSet {
      /// Name of the missing variable.
      name: String,
   },
   /// The variable is present but its value is the empty string.
   #[error("required environment variable `{name}` is set but empty")]
   Empty {
      /// Name of the empty variable.
      name: String,
   },
   /// The variable is present but its value is not valid Unicode.
   #[error("required environment variable `{name}` is not valid unicode")]
   NotUnicode {
      /// Name of the offending variable.
      name: String,
   },
}

/// Strictly reads the environment variable `name`.
///
/// Returns the exact string value when the variable is set and non-empty,
/// and an [`EnvError`] otherwise. Unlike the facts on [`EnvFacts`], this
/// lookup is **never cached**: every call re-reads the process environment
/// and a failing variable fails on every call.
pub fn require_var(name: &str) -> Result<String, EnvError> {
   match env::var(name) {
      Ok(value) if !value.is_empty() => Ok(value),
      Ok(_) => Err(EnvError::Empty {
         name: name.to_owned(),
      }),
      Err(VarError::NotPresent) => Err(EnvError::NotSet {
         name: name.to_owned(),
      }),
      Err(VarError::NotUnicode(_)) => Err(EnvError::NotUnicode {
         name: name.to_owned(),
      }),
   }
}

/// Memoized facts about the process environment.
///
/// An `EnvFacts` value owns two [`RaceOnce`] cells (the pipeline flag and
/// the machine name), each populated lazily on first access and fixed for
/// the lifetime of the value. Construction is `const`, so callers that want
/// the facts to be process-wide can hold one in a `static`; callers that
/// prefer explicit wiring can construct one at application start and pass it
/// to whatever needs it. Either way the memoization contract is the same.
///
/// ```
/// use env_facts::EnvFacts;
///
/// static FACTS: EnvFacts = EnvFacts::new();
///
/// // First call resolves and caches; later calls are a single atomic load.
/// let in_pipeline = FACTS.is_pipeline();
/// assert_eq!(FACTS.is_pipeline(), in_pipeline);
/// ```
#[derive(Debug)]
pub struct EnvFacts {
   pipeline: RaceOnce<bool>,
   machine_name: RaceOnce<String>,
}

impl EnvFacts {
   /// Creates a new, unpopulated set of facts.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         pipeline: RaceOnce::new(),
         machine_name: RaceOnce::new(),
      }
   }

   /// Whether the process runs under a CI/CD pipeline.
   ///
   /// Resolved from [`PIPELINE_ENV_VAR`] on first access and cached. An
   /// unset, empty, or unrecognized value resolves to `false`; this is not
   /// an error. Concurrent first-time callers may read the variable
   /// redundantly, but exactly one result is retained and every call returns
   /// an equivalent value.
   pub fn is_pipeline(&self) -> bool {
      self
         .pipeline
         .get_or_publish(|| pipeline_flag_from(env::var(PIPELINE_ENV_VAR).ok().as_deref()))
   }

   /// The host machine name.
   ///
   /// Resolved on first access and cached. If the lookup faults, a warning
   /// is logged and [`UNKNOWN_MACHINE_NAME`] is cached in its place, so the
   /// failing lookup is attempted at most once per process (amortized over
   /// concurrent cold-start racers). Callers never observe an error.
   pub fn machine_name(&self) -> String {
      resolve_machine_name(&self.machine_name, lookup_machine_name)
   }

   /// Sleeps for `millis` milliseconds, but only in a pipeline environment.
   ///
   /// Outside a pipeline, or when `millis` is zero or negative, this returns
   /// immediately without touching the timer or the log. The sleep itself is
   /// a plain [`tokio::time::sleep`], cancellable by dropping the future.
   #[cfg(feature = "delay")]
   pub async fn pipeline_delay(&self, millis: i64) {
      if millis <= 0 || !self.is_pipeline() {
         return;
      }
      debug!(millis, "delaying for pipeline environment");
      tokio::time::sleep(std::time::Duration::from_millis(millis as u64)).await;
   }
}

impl Default for EnvFacts {
   /// Equivalent to [`EnvFacts::new`].
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

/// Parses the raw pipeline variable value into the flag.
///
/// Only the literal `true`, in any letter case, counts; absence and anything
/// else resolve to `false`.
fn pipeline_flag_from(raw: Option<&str>) -> bool {
   raw.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Memoizes `lookup` into `slot`, falling back to [`UNKNOWN_MACHINE_NAME`]
/// on fault.
///
/// Split out from [`EnvFacts::machine_name`] so the fault path can be
/// exercised with an injected lookup.
fn resolve_machine_name<F>(slot: &RaceOnce<String>, lookup: F) -> String
where
   F: FnOnce() -> Result<String, MachineNameError>,
{
   slot.get_or_publish(|| match lookup() {
      Ok(name) if !name.is_empty() => name,
      Ok(_) => {
         warn!(
            fallback = UNKNOWN_MACHINE_NAME,
            "machine name lookup returned an empty name"
         );
         UNKNOWN_MACHINE_NAME.to_owned()
      }
      Err(err) => {
         warn!(
            error = %err,
            fallback = UNKNOWN_MACHINE_NAME,
            "machine name lookup failed"
         );
         UNKNOWN_MACHINE_NAME.to_owned()
      }
   })
}

/// Reasons the machine name lookup can fault.
///
/// Recovered locally in [`resolve_machine_name`]; never surfaced to callers.
#[derive(Debug, thiserror::Error)]
enum MachineNameError {
   #[cfg(unix)]
   #[error("gethostname failed: {0}")]
   Syscall(#[from] nix::errno::Errno),
   #[cfg(unix)]
   #[error("hostname is not valid unicode")]
   NotUnicode,
   #[cfg(windows)]
   #[error("COMPUTERNAME is not available: {0}")]
   ComputerName(#[from] VarError),
}

#[cfg(unix)]
fn lookup_machine_name() -> Result<String, MachineNameError> {
   let name = nix::unistd::gethostname()?;
   name.into_string().map_err(|_| MachineNameError::NotUnicode)
}

#[cfg(windows)]
fn lookup_machine_name() -> Result<String, MachineNameError> {
   Ok(env::var("COMPUTERNAME")?)
}
