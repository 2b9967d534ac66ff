/*
 * Created on Wed Jun 03 2026
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

use {
    crate::meta::{AsHasher, AsKeyClone},
    smallvec::SmallVec,
    std::{
        collections::hash_map::RandomState,
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            Arc,
        },
    },
};

const LNODE_STACK: usize = 2;
pub type DefConfig = Config32BRandomState;
pub(super) type LBuf<T> = SmallVec<[T; LNODE_STACK]>;

pub trait PreConfig: Sized + 'static {
    type HState: AsHasher;
    const BITS: u32;
}

pub trait Config: PreConfig {
    const BRANCH_MX: usize = <Self as PreConfig>::BITS as _;
    const BRANCH_LG: usize = {
        let mut index = <Self as Config>::BRANCH_MX;
        let mut log = 0usize;
        while {
            index >>= 1;
            index != 0
        } {
            log += 1;
        }
        log
    };
    const MASK: u32 = <Self as PreConfig>::BITS - 1;
    /// the trie hash is always folded to this width, whatever the fanout
    const HASH_BITS: usize = u32::BITS as _;
    /// first level at which the hash is exhausted and collisions go into a bucket
    const MAX_SPLIT_LEVEL: usize = ((<Self as Config>::HASH_BITS + <Self as Config>::BRANCH_LG
        - 1)
        / <Self as Config>::BRANCH_LG)
        * <Self as Config>::BRANCH_LG;
    /// branch levels on any root-to-leaf path (the bucket tail is not a branch level)
    const MAX_TREE_DEPTH: usize =
        <Self as Config>::MAX_SPLIT_LEVEL / <Self as Config>::BRANCH_LG;
    const LEVEL_ZERO: usize = 0;
}

impl<T: PreConfig> Config for T {}

macro_rules! impl_config {
    ($($vis:vis $name:ident: $state:ty = $ty:ty),*) => {
        $($vis struct $name; impl $crate::trie::meta::PreConfig for $name {
            type HState = $state; const BITS: u32 = <$ty>::BITS;
        })*
    }
}

pub(crate) use impl_config;

impl_config!(pub Config32BRandomState: RandomState = u32);

pub trait Key: AsKeyClone + Send + Sync + 'static {}
impl<T> Key for T where T: AsKeyClone + Send + Sync + 'static {}
pub trait Value: Clone + Send + Sync + 'static {}
impl<T> Value for T where T: Clone + Send + Sync + 'static {}

pub trait TreeElement: Clone + Send + Sync + 'static {
    type Key: Key;
    type Value: Value;
    fn new(k: Self::Key, v: Self::Value) -> Self;
    fn key(&self) -> &Self::Key;
    fn val(&self) -> &Self::Value;
}

impl<K: Key, V: Value> TreeElement for (K, V) {
    type Key = K;
    type Value = V;
    #[inline(always)]
    fn new(k: K, v: V) -> Self {
        (k, v)
    }
    #[inline(always)]
    fn key(&self) -> &K {
        &self.0
    }
    #[inline(always)]
    fn val(&self) -> &V {
        &self.1
    }
}

impl<K: Key, V: Value> TreeElement for Arc<(K, V)> {
    type Key = K;
    type Value = V;
    #[inline(always)]
    fn new(k: K, v: V) -> Self {
        Arc::new((k, v))
    }
    #[inline(always)]
    fn key(&self) -> &K {
        &self.0
    }
    #[inline(always)]
    fn val(&self) -> &V {
        &self.1
    }
}

/// A root lineage token. Fresh tokens come off a global counter and are only ever compared for
/// equality; a branch stamped with an older token than the operation's root is copied before it
/// is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Gen(u64);

impl Gen {
    pub(super) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(debug_assertions)]
struct TrieMetricsData {
    split: AtomicUsize,
    hln: AtomicUsize,
    restart: AtomicUsize,
    snap: AtomicUsize,
}

/// Debug-build event counters. Free of cost in release builds.
pub struct TrieRuntimeLog {
    #[cfg(debug_assertions)]
    data: TrieMetricsData,
    #[cfg(not(debug_assertions))]
    data: (),
}

impl TrieRuntimeLog {
    #[cfg(debug_assertions)]
    const ZERO: AtomicUsize = AtomicUsize::new(0);
    #[cfg(not(debug_assertions))]
    const NEW: Self = Self { data: () };
    #[cfg(debug_assertions)]
    const NEW: Self = Self {
        data: TrieMetricsData {
            split: Self::ZERO,
            hln: Self::ZERO,
            restart: Self::ZERO,
            snap: Self::ZERO,
        },
    };
    pub(super) const fn new() -> Self {
        Self::NEW
    }
    #[cfg(debug_assertions)]
    pub(super) fn hsplit(&self) {
        self.data.split.fetch_add(1, Ordering::Relaxed);
    }
    #[cfg(not(debug_assertions))]
    pub(super) fn hsplit(&self) {}
    #[cfg(debug_assertions)]
    pub(super) fn hlnode(&self) {
        self.data.hln.fetch_add(1, Ordering::Relaxed);
    }
    #[cfg(not(debug_assertions))]
    pub(super) fn hlnode(&self) {}
    #[cfg(debug_assertions)]
    pub(super) fn hrestart(&self) {
        self.data.restart.fetch_add(1, Ordering::Relaxed);
    }
    #[cfg(not(debug_assertions))]
    pub(super) fn hrestart(&self) {}
    #[cfg(debug_assertions)]
    pub(super) fn hsnapshot(&self) {
        self.data.snap.fetch_add(1, Ordering::Relaxed);
    }
    #[cfg(not(debug_assertions))]
    pub(super) fn hsnapshot(&self) {}
    #[cfg(all(test, debug_assertions))]
    pub(super) fn replnode(&self) -> usize {
        self.data.hln.load(Ordering::Relaxed)
    }
    #[cfg(all(test, not(debug_assertions)))]
    pub(super) fn replnode(&self) -> usize {
        0
    }
}

impl Drop for TrieRuntimeLog {
    fn drop(&mut self) {
        let _ = self.data;
    }
}
