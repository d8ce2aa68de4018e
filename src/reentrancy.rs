//! Debug-only reentrancy guard.
//!
//! Both maps call into user code while their structure is borrowed: key
//! serialization during hashing and `K: Eq` while walking a chain or probing
//! a slot. Re-entering the same map from there is a bug. In debug builds the
//! guard turns it into a panic; in release builds it compiles away.
//!
//! The guard makes every map `Send` but `!Sync` in all build profiles.
//! Shared use needs an outer lock, e.g. `Mutex<ChainingHashMap<K, V>>`.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map busy flag. Public entry points start with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Keep !Sync even when `active` is compiled out.
    _not_sync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _not_sync: PhantomData,
        }
    }

    /// Mark the map as busy until the returned guard drops.
    ///
    /// # Panics
    /// In debug builds, if the map is already busy.
    #[inline]
    pub(crate) fn enter(&self) -> Busy<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "reentrancy detected: map accessed from inside its own key callbacks"
            );
            Busy { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Busy { _z: PhantomData }
        }
    }
}

/// RAII token returned by `DebugReentrancy::enter`.
pub(crate) struct Busy<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}
