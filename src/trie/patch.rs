/*
 * Created on Tue Jun 09 2026
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
    crate::meta::{Comparable, ComparableUpgradeable},
    core::marker::PhantomData,
};

/// write mode flag
pub type WriteFlag = u8;
/// fresh
pub const WRITEMODE_FRESH: WriteFlag = 0b01;
/// refresh
pub const WRITEMODE_REFRESH: WriteFlag = 0b10;
/// any
pub const WRITEMODE_ANY: WriteFlag = 0b11;

/// A [`PatchWrite`] is intended to atomically update the state of the tree, which means that
/// all your deltas should be atomic
pub trait PatchWrite<E: TreeElement> {
    const WMODE: WriteFlag;
    type Ret<'g>;
    type Target: ?Sized + Comparable<E::Key>;
    fn target(&self) -> &Self::Target;
    fn nx_new(&mut self) -> E;
    fn nx_ret<'g>() -> Self::Ret<'g>;
    fn ex_apply(&mut self, current: &E) -> E;
    /// gate for the conditional-swap family; an entry it rejects is left untouched
    fn ex_cmp(&self, _current: &E) -> bool {
        true
    }
    fn ex_ret<'g>(current: &'g E) -> Self::Ret<'g>;
    /// return when [`PatchWrite::ex_cmp`] rejected the current entry
    fn mx_ret<'g>(current: &'g E) -> Self::Ret<'g> {
        Self::ex_ret(current)
    }
}

/// insert
pub struct Insert<E: TreeElement, U> {
    target: U,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<E: TreeElement, U> Insert<E, U> {
    pub fn new(target: U, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<E: TreeElement, U: ComparableUpgradeable<E::Key>> PatchWrite<E> for Insert<E, U> {
    const WMODE: WriteFlag = WRITEMODE_FRESH;
    type Ret<'g> = bool;
    type Target = U;
    fn target(&self) -> &Self::Target {
        &self.target
    }
    fn nx_new(&mut self) -> E {
        E::new(self.target.upgrade(), self.new_data.clone())
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        true
    }
    fn ex_apply(&mut self, _: &E) -> E {
        unreachable!()
    }
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        false
    }
}

/// insert, returning the conflicting entry's value if there is one
pub struct InsertRet<E: TreeElement, U> {
    target: U,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<E: TreeElement, U> InsertRet<E, U> {
    pub fn new(target: U, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<E: TreeElement, U: ComparableUpgradeable<E::Key>> PatchWrite<E> for InsertRet<E, U> {
    const WMODE: WriteFlag = WRITEMODE_FRESH;
    type Ret<'g> = Option<&'g E::Value>;
    type Target = U;
    fn target(&self) -> &Self::Target {
        &self.target
    }
    fn nx_new(&mut self) -> E {
        E::new(self.target.upgrade(), self.new_data.clone())
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        None
    }
    fn ex_apply(&mut self, _: &E) -> E {
        unreachable!()
    }
    fn ex_ret<'g>(c: &'g E) -> Self::Ret<'g> {
        Some(c.val())
    }
}

/// upsert
pub struct Upsert<E: TreeElement, U> {
    target: U,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<E: TreeElement, U> Upsert<E, U> {
    pub fn new(target: U, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<E: TreeElement, U: ComparableUpgradeable<E::Key>> PatchWrite<E> for Upsert<E, U> {
    const WMODE: WriteFlag = WRITEMODE_ANY;
    type Ret<'g> = ();
    type Target = U;
    fn target(&self) -> &Self::Target {
        &self.target
    }
    fn nx_new(&mut self) -> E {
        E::new(self.target.upgrade(), self.new_data.clone())
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {}
    fn ex_apply(&mut self, _: &E) -> E {
        self.nx_new()
    }
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {}
}

/// upsert, returning the previous value if there was one
pub struct UpsertRet<E: TreeElement, U> {
    target: U,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<E: TreeElement, U> UpsertRet<E, U> {
    pub fn new(target: U, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<E: TreeElement, U: ComparableUpgradeable<E::Key>> PatchWrite<E> for UpsertRet<E, U> {
    const WMODE: WriteFlag = WRITEMODE_ANY;
    type Ret<'g> = Option<&'g E::Value>;
    type Target = U;
    fn target(&self) -> &Self::Target {
        &self.target
    }
    fn nx_new(&mut self) -> E {
        E::new(self.target.upgrade(), self.new_data.clone())
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        None
    }
    fn ex_apply(&mut self, _: &E) -> E {
        self.nx_new()
    }
    fn ex_ret<'g>(c: &'g E) -> Self::Ret<'g> {
        Some(c.val())
    }
}

/// update
pub struct Update<'a, E: TreeElement, Q: ?Sized> {
    target: &'a Q,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<'a, E: TreeElement, Q: ?Sized> Update<'a, E, Q> {
    pub fn new(target: &'a Q, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchWrite<E> for Update<'a, E, Q> {
    const WMODE: WriteFlag = WRITEMODE_REFRESH;
    type Ret<'g> = bool;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    fn nx_new(&mut self) -> E {
        unreachable!()
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        false
    }
    fn ex_apply(&mut self, c: &E) -> E {
        E::new(c.key().clone(), self.new_data.clone())
    }
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        true
    }
}

/// update, returning the previous value
pub struct UpdateRet<'a, E: TreeElement, Q: ?Sized> {
    target: &'a Q,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<'a, E: TreeElement, Q: ?Sized> UpdateRet<'a, E, Q> {
    pub fn new(target: &'a Q, new_data: E::Value) -> Self {
        Self {
            target,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchWrite<E> for UpdateRet<'a, E, Q> {
    const WMODE: WriteFlag = WRITEMODE_REFRESH;
    type Ret<'g> = Option<&'g E::Value>;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    fn nx_new(&mut self) -> E {
        unreachable!()
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        None
    }
    fn ex_apply(&mut self, c: &E) -> E {
        E::new(c.key().clone(), self.new_data.clone())
    }
    fn ex_ret<'g>(c: &'g E) -> Self::Ret<'g> {
        Some(c.val())
    }
}

/// update only if the current value is the expected one
pub struct UpdateCond<'a, E: TreeElement, Q: ?Sized> {
    target: &'a Q,
    expected: &'a E::Value,
    new_data: E::Value,
    _m: PhantomData<E>,
}

impl<'a, E: TreeElement, Q: ?Sized> UpdateCond<'a, E, Q> {
    pub fn new(target: &'a Q, expected: &'a E::Value, new_data: E::Value) -> Self {
        Self {
            target,
            expected,
            new_data,
            _m: PhantomData,
        }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchWrite<E> for UpdateCond<'a, E, Q>
where
    E::Value: PartialEq,
{
    const WMODE: WriteFlag = WRITEMODE_REFRESH;
    type Ret<'g> = bool;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    fn nx_new(&mut self) -> E {
        unreachable!()
    }
    fn nx_ret<'g>() -> Self::Ret<'g> {
        false
    }
    fn ex_apply(&mut self, c: &E) -> E {
        E::new(c.key().clone(), self.new_data.clone())
    }
    fn ex_cmp(&self, c: &E) -> bool {
        c.val() == self.expected
    }
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        true
    }
    fn mx_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        false
    }
}

/// How a removal probes the trie and what it hands back
pub trait PatchDelete<E: TreeElement> {
    type Ret<'g>;
    type Target: ?Sized + Comparable<E::Key>;
    fn target(&self) -> &Self::Target;
    /// gate for conditional removal; an entry it rejects is left untouched
    fn ex_cmp(&self, _current: &E) -> bool {
        true
    }
    fn nx_ret<'g>() -> Self::Ret<'g>;
    fn ex_ret<'g>(current: &'g E) -> Self::Ret<'g>;
}

pub struct Delete<'a, E, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<E>,
}

impl<'a, E, Q: ?Sized> Delete<'a, E, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchDelete<E> for Delete<'a, E, Q> {
    type Ret<'g> = bool;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn nx_ret<'g>() -> Self::Ret<'g> {
        false
    }
    #[inline(always)]
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        true
    }
}

pub struct DeleteRet<'a, E, Q: ?Sized> {
    target: &'a Q,
    _m: PhantomData<E>,
}

impl<'a, E, Q: ?Sized> DeleteRet<'a, E, Q> {
    pub fn new(target: &'a Q) -> Self {
        Self {
            target,
            _m: PhantomData,
        }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchDelete<E> for DeleteRet<'a, E, Q> {
    type Ret<'g> = Option<&'g E::Value>;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    #[inline(always)]
    fn nx_ret<'g>() -> Self::Ret<'g> {
        None
    }
    #[inline(always)]
    fn ex_ret<'g>(c: &'g E) -> Self::Ret<'g> {
        Some(c.val())
    }
}

/// remove only if the current value is the expected one
pub struct DeleteCond<'a, E: TreeElement, Q: ?Sized> {
    target: &'a Q,
    expected: &'a E::Value,
}

impl<'a, E: TreeElement, Q: ?Sized> DeleteCond<'a, E, Q> {
    pub fn new(target: &'a Q, expected: &'a E::Value) -> Self {
        Self { target, expected }
    }
}

impl<'a, E: TreeElement, Q: ?Sized + Comparable<E::Key>> PatchDelete<E> for DeleteCond<'a, E, Q>
where
    E::Value: PartialEq,
{
    type Ret<'g> = bool;
    type Target = Q;
    fn target(&self) -> &Self::Target {
        self.target
    }
    fn ex_cmp(&self, c: &E) -> bool {
        c.val() == self.expected
    }
    #[inline(always)]
    fn nx_ret<'g>() -> Self::Ret<'g> {
        false
    }
    #[inline(always)]
    fn ex_ret<'g>(_: &'g E) -> Self::Ret<'g> {
        true
    }
}
