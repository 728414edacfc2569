//! Debug-only reentrancy check for the map's entry points.
//!
//! The map calls user `Hash` and `Eq` code while a bucket chain is being
//! walked or relinked. If that code reaches back into the same map the
//! chain may be observed half-spliced, so debug builds panic on nested
//! entry. Release builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map entry tracker. Guard a method with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Single-threaded: keep the owner !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Mark the owner busy until the returned guard drops. Panics in debug
    /// builds if it is already busy.
    #[inline]
    pub fn enter(&self) -> Entered<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: map entered from its own Hash/Eq callback"
            );
        }
        Entered { owner: self }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct Entered<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    owner: &'a DebugReentrancy,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}
