//! Internal synchronization primitive for the race-publish cell.
//!
//! This module provides the low-level state management used by [`RaceOnce`].
//! The state is a single `AtomicU8` moving through a three-state lattice:
//!
//! - `EMPTY`: nothing published, nobody writing.
//! - `WRITING`: one publisher holds the slot exclusively while moving the
//!   value in.
//! - `READY`: value published; terminal.
//!
//! Observers only ever see the lattice advance towards `READY` and never see
//! it leave `READY`. No operation blocks or spins: a publisher that loses the
//! single compare-and-swap simply bows out, which is what makes the cell safe
//! to use from any number of threads without external locking.
//!
//! [`RaceOnce`]: crate::RaceOnce

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

/// Atomic publish state for the [`RaceOnce`] cell.
///
/// [`RaceOnce`]: crate::RaceOnce
#[repr(transparent)]
pub(crate) struct PublishState(AtomicU8);

impl PublishState {
   /// Nothing published yet, no publisher in flight.
   const EMPTY: u8 = 0;
   /// A publisher holds the slot exclusively and is moving the value in.
   const WRITING: u8 = 1;
   /// Value published. Terminal: the state never leaves `READY`.
   const READY: u8 = 2;

   /// Creates a new state representing an empty cell.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(Self::EMPTY))
   }

   /// Creates a new state representing an already-published cell.
   #[inline]
   pub(crate) const fn ready() -> Self {
      Self(AtomicU8::new(Self::READY))
   }

   /// Checks whether a value has been published.
   ///
   /// `Acquire` ordering pairs with the `Release` store in
   /// [`PublishGuard::commit`], so a `true` result guarantees the value write
   /// is visible to the caller.
   #[inline]
   pub(crate) fn is_ready(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) == Self::READY
   }

   /// Attempts to claim the slot for publishing.
   ///
   /// Returns:
   ///   - `Some(guard)`: the caller now owns the slot exclusively and must
   ///     either `commit()` the guard or drop it (which resets to `EMPTY`).
   ///   - `None`: the slot is already `READY`, or a racing publisher holds
   ///     `WRITING`. Either way this caller's value is not the one retained.
   ///
   /// A single compare-and-swap, no retry loop: losing the race is a final
   /// answer, not a reason to wait.
   #[inline]
   pub(crate) fn try_begin_publish(&self) -> Option<PublishGuard<'_>> {
      match self.0.compare_exchange(
         Self::EMPTY,
         Self::WRITING,
         Ordering::Acquire,
         Ordering::Relaxed,
      ) {
         Ok(_) => Some(PublishGuard::new(self)),
         Err(_) => None,
      }
   }
}

/// RAII guard returned by [`PublishState::try_begin_publish`].
///
/// While alive, the holder is the sole writer of the cell's value slot. It
/// must be `commit()`ed to mark the value as published; dropping it instead
/// resets the state to `EMPTY` (this only happens if moving the value into
/// the slot panicked).
pub(crate) struct PublishGuard<'a> {
   state: &'a PublishState,
}

impl<'a> PublishGuard<'a> {
   /// Creates a new guard. Assumes the state is currently `WRITING`.
   #[inline(always)]
   const fn new(state: &'a PublishState) -> Self {
      Self { state }
   }

   /// Marks the value as published and consumes the guard.
   ///
   /// `Release` ordering ensures the value write happens-before any thread
   /// that observes `READY` via an `Acquire` load.
   #[inline(always)]
   pub(crate) fn commit(self) {
      self.state.0.store(PublishState::READY, Ordering::Release);
      mem::forget(self); // Prevent Drop from resetting the state.
   }
}

impl Drop for PublishGuard<'_> {
   /// Called if the publish was abandoned. Resets the state to `EMPTY` so a
   /// later publisher can claim the slot.
   #[inline(always)]
   fn drop(&mut self) {
      self.state.0.store(PublishState::EMPTY, Ordering::Release);
   }
}
