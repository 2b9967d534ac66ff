/*
 * Created on Mon Jun 08 2026
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
    super::meta::TreeElement,
    crate::meta::Comparable,
    core::marker::PhantomData,
};

/// How a lookup probes the trie and what it hands back
pub trait ReadMode<T: TreeElement> {
    type Ret<'g>;
    type Target: ?Sized + Comparable<T::Key>;
    fn target(&self) -> &Self::Target;
    fn ex<'g>(c: &'g T) -> Self::Ret<'g>;
    fn nx<'g>() -> Self::Ret<'g>;
}

pub struct RModeExists<'a, T, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<T>,
}

impl<'a, T, Q: ?Sized> RModeExists<'a, T, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, T: TreeElement, Q: ?Sized + Comparable<T::Key>> ReadMode<T> for RModeExists<'a, T, Q> {
    type Ret<'g> = bool;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn ex<'g>(_: &'g T) -> Self::Ret<'g> {
        true
    }
    #[inline(always)]
    fn nx<'g>() -> Self::Ret<'g> {
        false
    }
}

pub struct RModeRef<'a, T, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<T>,
}

impl<'a, T, Q: ?Sized> RModeRef<'a, T, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, T: TreeElement, Q: ?Sized + Comparable<T::Key>> ReadMode<T> for RModeRef<'a, T, Q> {
    type Ret<'g> = Option<&'g T::Value>;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn ex<'g>(c: &'g T) -> Self::Ret<'g> {
        Some(c.val())
    }
    #[inline(always)]
    fn nx<'g>() -> Self::Ret<'g> {
        None
    }
}

pub struct RModeClone<'a, T, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<T>,
}

impl<'a, T, Q: ?Sized> RModeClone<'a, T, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, T: TreeElement, Q: ?Sized + Comparable<T::Key>> ReadMode<T> for RModeClone<'a, T, Q> {
    type Ret<'g> = Option<T::Value>;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn ex<'g>(c: &'g T) -> Self::Ret<'g> {
        Some(c.val().clone())
    }
    #[inline(always)]
    fn nx<'g>() -> Self::Ret<'g> {
        None
    }
}

pub struct RModeElementRef<'a, T, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<T>,
}

impl<'a, T, Q: ?Sized> RModeElementRef<'a, T, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, T: TreeElement, Q: ?Sized + Comparable<T::Key>> ReadMode<T>
    for RModeElementRef<'a, T, Q>
{
    type Ret<'g> = Option<&'g T>;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn ex<'g>(c: &'g T) -> Self::Ret<'g> {
        Some(c)
    }
    #[inline(always)]
    fn nx<'g>() -> Self::Ret<'g> {
        None
    }
}
