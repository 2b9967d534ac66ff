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

//! A concurrent hash array mapped trie with constant-time snapshots.
//!
//! All operations run under an epoch [`Guard`] obtained from [`cpin`]. Reads
//! and writes are lock-free; [`TrieMap::snapshot`] and
//! [`TrieMap::frozen_snapshot`] fork the map in O(1) by installing a fresh
//! root generation, after which the two maps lazily copy-on-write any branch
//! they touch.

#![deny(unreachable_patterns)]

mod meta;
mod sync;
pub mod trie;

// re-exports
pub use {
    meta::{AsHasher, AsKey, AsKeyClone, Comparable, ComparableUpgradeable},
    sync::atm::{cpin, upin, Guard},
    trie::{
        imp::{
            FrozenMapArc, FrozenMapCopy, FrozenTrieMap, TrieMap, TrieMapArc, TrieMapCopy,
        },
        meta::{Config, DefConfig, Key, PreConfig, TreeElement, Value},
        ser::Restored,
    },
};
