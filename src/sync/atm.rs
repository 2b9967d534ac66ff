/*
 * Created on Mon Jun 01 2026
 *
 * This file is a part of Snaptrie
 * Snaptrie is a free and open-source concurrent map written by Sayan Nandan
 * ("the Author") that implements a hash array mapped trie with lock-free
 * reads, writes and constant-time snapshots, with the vision to provide
 * safely shared state without compromising on performance or predictability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use core::{
    fmt,
    marker::PhantomData,
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};
use std::sync::Arc;
// re-export here because we have some future plans ;) (@ohsayan)
pub use crossbeam_epoch::{pin as cpin, unprotected as upin, Guard};

pub(crate) const ORD_RLX: Ordering = Ordering::Relaxed;
pub(crate) const ORD_ACQ: Ordering = Ordering::Acquire;
pub(crate) const ORD_REL: Ordering = Ordering::Release;

/*
    A CAS cell over refcounted payloads.
    ---
    The trie shares its immutable node structure across snapshot families, so a node's lifetime is governed by
    its strong count and not by any single map. The cell below owns exactly one strong count of whatever it
    currently points to. Loads hand out guard-bounded borrows without touching the count; a successful exchange
    moves the displaced count into the epoch reclaimer, which keeps every borrow handed out under a live guard
    valid until that guard unpins. Cells are the only mutable places in the trie.
*/

/// A guard-bounded borrow of a cell's payload. Never outlives the pin it was loaded under.
pub(crate) struct Shared<'g, T> {
    p: *const T,
    _m: PhantomData<&'g T>,
}

impl<'g, T> Clone for Shared<'g, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'g, T> Copy for Shared<'g, T> {}

impl<'g, T> Shared<'g, T> {
    #[inline(always)]
    const fn new(p: *const T) -> Self {
        Self {
            p,
            _m: PhantomData,
        }
    }
    #[inline(always)]
    pub(crate) fn is_null(&self) -> bool {
        self.p.is_null()
    }
    #[inline(always)]
    pub(crate) fn eq_arc(&self, a: &Arc<T>) -> bool {
        ptr::eq(self.p, Arc::as_ptr(a))
    }
    /// ## Safety
    /// The pointer must be non-null (i.e. loaded from a cell that is never stored to with null)
    #[inline(always)]
    pub(crate) unsafe fn deref(&self) -> &'g T {
        debug_assert!(!self.p.is_null(), "logic,deref of null shared");
        &*self.p
    }
    /// Take a new strong count on the payload.
    ///
    /// ## Safety
    /// The pointer must be non-null. Sound for any shared loaded under a live guard: the count the cell held
    /// at load time cannot be retired before the guard unpins
    #[inline(always)]
    pub(crate) unsafe fn to_arc(&self) -> Arc<T> {
        debug_assert!(!self.p.is_null(), "logic,upgrade of null shared");
        Arc::increment_strong_count(self.p);
        Arc::from_raw(self.p)
    }
}

pub(crate) struct Atomic<T> {
    p: AtomicPtr<T>,
    // the cell owns one strong count of its payload
    _m: PhantomData<Arc<T>>,
}

// the derive is stupid, it will enforce a debug constraint on T
impl<T> fmt::Debug for Atomic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.p)
    }
}

impl<T: Send + Sync + 'static> Atomic<T> {
    #[inline(always)]
    pub(crate) const fn null() -> Self {
        Self {
            p: AtomicPtr::new(ptr::null_mut()),
            _m: PhantomData,
        }
    }
    /// Instantiate a cell owning the given payload
    #[inline(always)]
    pub(crate) fn new_arc(a: Arc<T>) -> Self {
        Self {
            p: AtomicPtr::new(Arc::into_raw(a) as *mut T),
            _m: PhantomData,
        }
    }
    #[inline(always)]
    pub(crate) fn ld<'g>(&self, o: Ordering, _: &'g Guard) -> Shared<'g, T> {
        Shared::new(self.p.load(o))
    }
    #[inline(always)]
    pub(crate) fn ld_acq<'g>(&self, g: &'g Guard) -> Shared<'g, T> {
        self.ld(ORD_ACQ, g)
    }
    /// Seed an empty, not yet published cell
    pub(crate) fn st_rel(&self, a: Arc<T>) {
        let old = self.p.swap(Arc::into_raw(a) as *mut T, ORD_REL);
        debug_assert!(old.is_null(), "logic,seeded a non-empty cell");
    }
    /// Exchange `o` for `n`. On success the cell's count of `o` is retired through the epoch reclaimer and
    /// a borrow of the newly installed payload is returned; on failure `n` is handed back untouched
    pub(crate) fn cx_rel<'g>(
        &self,
        o: Shared<'g, T>,
        n: Option<Arc<T>>,
        g: &'g Guard,
    ) -> Result<Shared<'g, T>, Option<Arc<T>>> {
        let np = match n.as_ref() {
            Some(a) => Arc::as_ptr(a) as *mut T,
            None => ptr::null_mut(),
        };
        match self.p.compare_exchange(o.p as *mut T, np, ORD_REL, ORD_RLX) {
            Ok(_) => {
                if let Some(a) = n {
                    // the cell now owns this count
                    let _ = Arc::into_raw(a);
                }
                if !o.is_null() {
                    let displaced = unsafe {
                        // UNSAFE(@ohsayan): this was the cell's own count; we just took it over
                        Arc::from_raw(o.p)
                    };
                    g.defer(move || drop(displaced));
                }
                Ok(Shared::new(np))
            }
            Err(_) => Err(n),
        }
    }
}

impl<T> Drop for Atomic<T> {
    fn drop(&mut self) {
        let p = *self.p.get_mut();
        if !p.is_null() {
            unsafe {
                // UNSAFE(@ohsayan): dropping a cell means it is unreachable, so its count is all ours
                drop(Arc::from_raw(p))
            }
        }
    }
}
