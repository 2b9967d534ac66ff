/*
 * Created on Tue Jun 02 2026
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
    borrow::Borrow,
    hash::{BuildHasher, Hash},
};

/// Any type implementing this trait can be used as a key inside the trie
pub trait AsKey: Hash + Eq {
    /// Read the key
    fn read_key(&self) -> &Self;
}

impl<T: Hash + Eq + ?Sized> AsKey for T {
    fn read_key(&self) -> &Self {
        self
    }
}

/// If your T can be cloned/copied and implements [`AsKey`], then this trait will automatically be implemented
pub trait AsKeyClone: AsKey + Clone {
    /// Read the key and return a clone
    fn read_key_clone(&self) -> Self;
}

impl<T: AsKey + Clone + ?Sized> AsKeyClone for T {
    #[inline(always)]
    fn read_key_clone(&self) -> Self {
        Clone::clone(self)
    }
}

pub trait AsHasher: BuildHasher + Default {}
impl<T> AsHasher for T where T: BuildHasher + Default {}

/// The [`Comparable`] trait is like [`PartialEq`], but is different due to its expectations, and escapes its scandalous relations with [`Eq`] and the consequential
/// implications across the [`std`].
///
/// ☢️ WARNING ☢️: In some cases implementations of the [`Comparable`] set of traits COMPLETELY VIOLATES [`Eq`]'s invariants. BE VERY CAREFUL WHEN USING IN EXPRESSIONS
pub trait Comparable<K: ?Sized>: Hash {
    fn cmp_eq(&self, key: &K) -> bool;
}

pub trait ComparableUpgradeable<K>: Comparable<K> {
    fn upgrade(&self) -> K;
}

impl<K: Borrow<T>, T: Eq + Hash + ?Sized> Comparable<K> for T {
    fn cmp_eq(&self, key: &K) -> bool {
        self == key.borrow()
    }
}

impl<K: Hash, T: ToOwned<Owned = K> + Hash + Comparable<K> + ?Sized> ComparableUpgradeable<K>
    for T
{
    fn upgrade(&self) -> K {
        self.to_owned()
    }
}
