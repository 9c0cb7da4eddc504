//! Race-publish once cell.
//!
//! This module provides the [`RaceOnce<T>`] type, a thread-safe cell that can
//! be written to at most once, designed for values that several threads may
//! race to compute on first access. Unlike a classic once cell, it never
//! blocks: competing publishers each attempt a single compare-and-swap, one
//! wins, and the rest discard their value and move on.
//!
//! The intended pattern is memoizing a cheap, deterministic computation:
//! every racer derives the same value from the same source, so "first publish
//! wins, others are discarded" is indistinguishable from mutual exclusion,
//! without the cost of it.

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;
use core::{fmt, mem};

use super::state::PublishState;

/// A thread-safe cell holding at most one immutable value, publishable from
/// any of several concurrently racing writers.
///
/// Reading an already-published value is a single atomic load; publishing is
/// a single compare-and-swap. No operation blocks, spins, or suspends, so the
/// cell is safe to use from signal-sensitive or latency-sensitive paths.
///
/// The cell is monotonic: once a value is published it never changes and the
/// cell never reverts to empty.
pub struct RaceOnce<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   state: PublishState,
}

impl<T> RaceOnce<T> {
   /// Creates a new, empty `RaceOnce` cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: PublishState::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a new `RaceOnce` cell already holding `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         state: PublishState::ready(),
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Checks if a value has been published.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_set(&self) -> bool {
      self.state.is_ready(Ordering::Acquire)
   }

   /// Returns a reference to the published value, or `None` if nothing has
   /// been published yet (including while a racing publish is in flight).
   ///
   /// This method never blocks and never computes anything.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_set() {
         // SAFETY: is_set() observed READY with Acquire ordering, so the
         // winning publisher's value write is visible, and the value will
         // never be overwritten or removed.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Attempts to publish `value`, moving the cell from empty to set.
   ///
   /// Returns `true` if *this* call's value is the one retained. If the cell
   /// is already set, or a racing publisher currently holds the slot, the
   /// call drops `value` and returns `false`: it never overwrites an
   /// existing value and never waits for the race to resolve.
   ///
   /// Exactly one of any set of concurrent `try_publish` calls on an empty
   /// cell returns `true`.
   #[inline]
   pub fn try_publish(&self, value: T) -> bool {
      let Some(guard) = self.state.try_begin_publish() else {
         return false;
      };
      // SAFETY: The guard grants exclusive write access to the slot, and no
      // reader dereferences it until commit() publishes READY.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      true
   }

   /// Returns the cached value, computing and race-publishing it if the cell
   /// is still empty.
   ///
   /// The fast path is a clone of the published value. On the cold path the
   /// closure runs *outside* any critical section, its result is offered via
   /// [`try_publish`], and the locally computed value is returned whether or
   /// not it won the race. Concurrent cold-start callers may therefore run
   /// the closure redundantly; callers must only memoize computations that
   /// are deterministic, so every racer's result is equivalent.
   ///
   /// [`try_publish`]: Self::try_publish
   #[inline]
   pub fn get_or_publish<F>(&self, f: F) -> T
   where
      T: Clone,
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value.clone();
      }
      let computed = f();
      self.try_publish(computed.clone());
      computed
   }

   /// Returns a mutable reference to the published value, or `None`.
   ///
   /// Requires exclusive access (`&mut self`) and never blocks.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      if self.is_set() {
         // SAFETY: The cell is set and we have exclusive access.
         Some(unsafe { (*self.value.get()).assume_init_mut() })
      } else {
         None
      }
   }

   /// Consumes the cell, returning the published value if any.
   #[inline]
   pub fn into_inner(mut self) -> Option<T> {
      if self.is_set() {
         // SAFETY: The cell is set and we own it. Forgetting self afterwards
         // prevents Drop from double-dropping the value we just moved out.
         let value = unsafe { self.value.get_mut().assume_init_read() };
         mem::forget(self);
         Some(value)
      } else {
         None
      }
   }

   /// Returns a reference to the value without checking if it's published.
   ///
   /// # Safety
   ///
   /// Calling this method on an empty `RaceOnce` cell is *undefined
   /// behavior*. The caller must ensure the cell is set, e.g. via `is_set()`.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_set(), "get_unchecked called on empty RaceOnce");
      // SAFETY: The caller guarantees that the cell is set.
      (*self.value.get()).assume_init_ref()
   }
}

// --- Trait Implementations ---

impl<T> From<T> for RaceOnce<T> {
   /// Creates a new, already-set `RaceOnce` cell from the given value.
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T> From<Option<T>> for RaceOnce<T> {
   /// Creates a set `RaceOnce` from `Some(value)` or an empty one from `None`.
   fn from(value: Option<T>) -> Self {
      match value {
         Some(value) => Self::with_value(value),
         None => Self::new(),
      }
   }
}

// SAFETY:
// `&RaceOnce<T>` is `Sync` if `&T` is `Sync` (requiring `T: Sync`) and the
// publish mechanism is thread-safe (it is). `T: Send` is also required
// because a value published by one thread may be read or dropped by another.
unsafe impl<T: Sync + Send> Sync for RaceOnce<T> {}
// SAFETY:
// `RaceOnce<T>` is `Send` if `T` is `Send`, as ownership of `T` can move
// across threads via publish or `into_inner()`.
unsafe impl<T: Send> Send for RaceOnce<T> {}

impl<T> Default for RaceOnce<T> {
   /// Creates a new, empty `RaceOnce` cell.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Display> fmt::Display for RaceOnce<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.get() {
         Some(v) => fmt::Display::fmt(v, f),
         None => f.write_str("<empty>"),
      }
   }
}

impl<T: fmt::Debug> fmt::Debug for RaceOnce<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("RaceOnce");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<empty>")),
      };
      d.finish()
   }
}

impl<T: Clone> Clone for RaceOnce<T> {
   /// Clones the `RaceOnce` cell.
   ///
   /// A set cell clones into a set cell holding a cloned value; an empty
   /// cell clones into an independent empty cell.
   #[inline]
   fn clone(&self) -> Self {
      match self.get() {
         Some(value) => Self::with_value(value.clone()),
         None => Self::new(),
      }
   }
}

impl<T: PartialEq> PartialEq for RaceOnce<T> {
   /// Two cells are equal if both are empty, or both are set to equal values.
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      self.get() == other.get()
   }
}

impl<T: Eq> Eq for RaceOnce<T> {}

impl<T> Drop for RaceOnce<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_set() {
         // SAFETY: We have exclusive access, the cell is set, and the value
         // won't be accessed again.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
