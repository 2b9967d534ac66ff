/*
 * Created on Mon Jun 15 2026
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
    super::{
        access::{RModeClone, RModeElementRef, RModeExists, RModeRef},
        iter::{IterKV, IterKey, IterVal},
        meta::{Config, DefConfig, TreeElement},
        patch,
        RawTree,
    },
    crate::{
        meta::{Comparable, ComparableUpgradeable},
        sync::atm::{cpin, upin, Guard},
    },
    core::fmt,
    std::sync::Arc,
};

pub type TrieMapCopy<K, V> = TrieMap<(K, V)>;
pub type TrieMapArc<K, V> = TrieMap<Arc<(K, V)>>;
pub type FrozenMapCopy<K, V> = FrozenTrieMap<(K, V)>;
pub type FrozenMapArc<K, V> = FrozenTrieMap<Arc<(K, V)>>;

/// The mutable face of the trie.
///
/// Every operation takes an epoch [`Guard`] (see [`cpin`](crate::cpin)); references handed out
/// live as long as the guard does. [`Self::snapshot`] and [`Self::frozen_snapshot`] fork the
/// map in constant time.
pub struct TrieMap<T: TreeElement, C: Config = DefConfig> {
    pub(super) t: RawTree<T, C>,
}

/// A read-only fork of a [`TrieMap`], immune to any later write on the map it was taken from.
/// There are no mutating methods on purpose; [`Self::thaw`] forks a fresh mutable map off it.
pub struct FrozenTrieMap<T: TreeElement, C: Config = DefConfig> {
    pub(super) t: RawTree<T, C>,
}

impl<T: TreeElement, C: Config> Default for TrieMap<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeElement, C: Config> TrieMap<T, C> {
    pub fn new() -> Self {
        Self { t: RawTree::new() }
    }
    // write
    /// Returns true if the entry was inserted; returns false if the uniqueness constraint is
    /// violated
    pub fn insert<U>(&self, key: U, val: T::Value, g: &Guard) -> bool
    where
        U: ComparableUpgradeable<T::Key>,
    {
        self.t.insert(patch::Insert::new(key, val), g)
    }
    /// Like [`Self::insert`], but hands back the conflicting entry's value instead of inserting
    pub fn insert_return<'t, 'g, 'v, U>(
        &'t self,
        key: U,
        val: T::Value,
        g: &'g Guard,
    ) -> Option<&'v T::Value>
    where
        U: ComparableUpgradeable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.insert(patch::InsertRet::new(key, val), g)
    }
    /// Update or insert the given value
    pub fn upsert<U>(&self, key: U, val: T::Value, g: &Guard)
    where
        U: ComparableUpgradeable<T::Key>,
    {
        self.t.insert(patch::Upsert::new(key, val), g)
    }
    /// Update or insert the given value, returning the previous one if there was any
    pub fn upsert_return<'t, 'g, 'v, U>(
        &'t self,
        key: U,
        val: T::Value,
        g: &'g Guard,
    ) -> Option<&'v T::Value>
    where
        U: ComparableUpgradeable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.insert(patch::UpsertRet::new(key, val), g)
    }
    // update
    /// Returns true if the entry was updated
    pub fn update<Q>(&self, key: &Q, val: T::Value, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.insert(patch::Update::new(key, val), g)
    }
    /// Update the entry and return the old value, if it exists
    pub fn update_return<'t, 'g, 'v, Q>(
        &'t self,
        key: &Q,
        val: T::Value,
        g: &'g Guard,
    ) -> Option<&'v T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.insert(patch::UpdateRet::new(key, val), g)
    }
    /// Update the entry only if its current value is the expected one. Returns true iff the
    /// swap went through
    pub fn update_if<Q>(&self, key: &Q, expected: &T::Value, new: T::Value, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
        T::Value: PartialEq,
    {
        self.t.insert(patch::UpdateCond::new(key, expected, new), g)
    }
    // read
    pub fn contains_key<Q>(&self, key: &Q, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.lookup(RModeExists::new(key), g)
    }
    /// Returns a reference to the value corresponding to the key, if it exists
    pub fn get<'t, 'g, 'v, Q>(&'t self, key: &Q, g: &'g Guard) -> Option<&'v T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.lookup(RModeRef::new(key), g)
    }
    /// Returns a clone of the value corresponding to the key, if it exists
    pub fn get_cloned<Q>(&self, key: &Q, g: &Guard) -> Option<T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.lookup(RModeClone::new(key), g)
    }
    /// Returns a reference to the full entry corresponding to the key, if it exists
    pub fn get_full<'t, 'g, 'v, Q>(&'t self, key: &Q, g: &'g Guard) -> Option<&'v T>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.lookup(RModeElementRef::new(key), g)
    }
    /// Linear scan for a value over a frozen fork of this map
    pub fn contains_val(&self, val: &T::Value) -> bool
    where
        T::Value: PartialEq,
    {
        self.frozen_snapshot().contains_val(val)
    }
    // delete
    /// Returns true if the entry was deleted
    pub fn remove<Q>(&self, key: &Q, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.remove(patch::Delete::new(key), g)
    }
    /// Removes the entry and returns its value, if it existed
    pub fn remove_return<'t, 'g, 'v, Q>(&'t self, key: &Q, g: &'g Guard) -> Option<&'v T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.remove(patch::DeleteRet::new(key), g)
    }
    /// Removes the entry only if its current value is the expected one. Returns true iff the
    /// entry was removed
    pub fn remove_if<Q>(&self, key: &Q, expected: &T::Value, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
        T::Value: PartialEq,
    {
        self.t.remove(patch::DeleteCond::new(key, expected), g)
    }
    /// Drop every entry, in one root swap
    pub fn clear(&self) {
        self.t.clear()
    }
    // snapshot
    /// Fork a mutable snapshot of this map in O(1). Writes on either side are invisible to the
    /// other
    pub fn snapshot(&self) -> TrieMap<T, C> {
        TrieMap {
            t: self.t.snapshot(false),
        }
    }
    /// Fork a read-only snapshot of this map in O(1)
    pub fn frozen_snapshot(&self) -> FrozenTrieMap<T, C> {
        FrozenTrieMap {
            t: self.t.snapshot(true),
        }
    }
    // misc
    /// Entry count, read off a frozen fork so the answer is a consistent point in time
    pub fn len(&self) -> usize {
        self.frozen_snapshot().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    // iter
    /// An unordered walk over the live map. For a stable walk, take a
    /// [`Self::frozen_snapshot`] and iterate that instead
    pub fn iter_kv<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKV<'t, 'g, 'v, T, C> {
        self.t.iter_kv(g)
    }
    pub fn iter_key<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKey<'t, 'g, 'v, T, C> {
        self.t.iter_key(g)
    }
    pub fn iter_val<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterVal<'t, 'g, 'v, T, C> {
        self.t.iter_val(g)
    }
}

impl<T: TreeElement, C: Config> FrozenTrieMap<T, C> {
    // read
    pub fn contains_key<Q>(&self, key: &Q, g: &Guard) -> bool
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.lookup(RModeExists::new(key), g)
    }
    /// Returns a reference to the value corresponding to the key, if it exists
    pub fn get<'t, 'g, 'v, Q>(&'t self, key: &Q, g: &'g Guard) -> Option<&'v T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.lookup(RModeRef::new(key), g)
    }
    /// Returns a clone of the value corresponding to the key, if it exists
    pub fn get_cloned<Q>(&self, key: &Q, g: &Guard) -> Option<T::Value>
    where
        Q: ?Sized + Comparable<T::Key>,
    {
        self.t.lookup(RModeClone::new(key), g)
    }
    /// Returns a reference to the full entry corresponding to the key, if it exists
    pub fn get_full<'t, 'g, 'v, Q>(&'t self, key: &Q, g: &'g Guard) -> Option<&'v T>
    where
        Q: ?Sized + Comparable<T::Key>,
        't: 'v,
        'g: 't + 'v,
    {
        self.t.lookup(RModeElementRef::new(key), g)
    }
    /// Linear scan for a value
    pub fn contains_val(&self, val: &T::Value) -> bool
    where
        T::Value: PartialEq,
    {
        let g = cpin();
        let found = self.t.iter_val(&g).any(|v| v == val);
        found
    }
    // misc
    pub fn len(&self) -> usize {
        let g = cpin();
        self.t.count(&g)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Fork a fresh mutable map off this frozen one in O(1). The frozen map stays untouched
    pub fn thaw(&self) -> TrieMap<T, C> {
        TrieMap {
            t: self.t.snapshot(false),
        }
    }
    // iter
    pub fn iter_kv<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKV<'t, 'g, 'v, T, C> {
        self.t.iter_kv(g)
    }
    pub fn iter_key<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKey<'t, 'g, 'v, T, C> {
        self.t.iter_key(g)
    }
    pub fn iter_val<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterVal<'t, 'g, 'v, T, C> {
        self.t.iter_val(g)
    }
}

impl<T: TreeElement, C: Config> FromIterator<T> for TrieMap<T, C> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let g = unsafe {
            // UNSAFE(@ohsayan): it's me, hi, I'm the problem, it's me. yeah, Taylor knows it too. it's just us
            upin()
        };
        let t = Self::new();
        iter.into_iter()
            .for_each(|te| t.upsert(te.key().clone(), te.val().clone(), g));
        t
    }
}

impl<T: TreeElement, C: Config> fmt::Debug for TrieMap<T, C>
where
    T::Key: fmt::Debug,
    T::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.t.fmt(f)
    }
}

impl<T: TreeElement, C: Config> fmt::Debug for FrozenTrieMap<T, C>
where
    T::Key: fmt::Debug,
    T::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.t.fmt(f)
    }
}
