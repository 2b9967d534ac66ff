/*
 * Created on Sat Jun 13 2026
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
        meta::{Config, DefConfig, TreeElement},
        Branch, MainKind, RawTree,
    },
    crate::sync::atm::Guard,
    arrayvec::ArrayVec,
    core::{marker::PhantomData, slice},
};

/*
    A path-stacked depth-first walk. Every frame is one branch level; since the folded hash is 32 bits wide
    and a level consumes 5, no path can stack more than 7 frames (the collision bucket tail is drained off
    the side, not stacked). Walking a live trie yields the leaves of whatever mains the walk happens to read;
    walk a snapshot if you need a stable view.
*/

pub struct IterKV<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    C: Config,
{
    i: RawIter<'t, 'g, 'v, T, C, CfgIterKV>,
}

impl<'t, 'g, 'v, T, C> IterKV<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    pub(super) fn new(t: &'t RawTree<T, C>, g: &'g Guard) -> Self {
        Self {
            i: RawIter::new(t, g),
        }
    }
}

impl<'t, 'g, 'v, T, C> Iterator for IterKV<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    type Item = (&'v T::Key, &'v T::Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.i.next()
    }
}

pub struct IterKey<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    i: RawIter<'t, 'g, 'v, T, C, CfgIterKey>,
}

impl<'t, 'g, 'v, T, C> IterKey<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    pub(super) fn new(t: &'t RawTree<T, C>, g: &'g Guard) -> Self {
        Self {
            i: RawIter::new(t, g),
        }
    }
}

impl<'t, 'g, 'v, T, C> Iterator for IterKey<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    type Item = &'v T::Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.i.next()
    }
}

pub struct IterVal<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    i: RawIter<'t, 'g, 'v, T, C, CfgIterVal>,
}

impl<'t, 'g, 'v, T, C> IterVal<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    pub(super) fn new(t: &'t RawTree<T, C>, g: &'g Guard) -> Self {
        Self {
            i: RawIter::new(t, g),
        }
    }
}

impl<'t, 'g, 'v, T, C> Iterator for IterVal<'t, 'g, 'v, T, C>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
{
    type Item = &'v T::Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.i.next()
    }
}

trait IterConfig<T> {
    type Ret<'a>
    where
        T: 'a;
    fn some<'a>(v: &'a T) -> Option<Self::Ret<'a>>;
}

struct CfgIterKV;
impl<T: TreeElement> IterConfig<T> for CfgIterKV {
    type Ret<'a> = (&'a T::Key, &'a T::Value) where T: 'a;
    fn some<'a>(v: &'a T) -> Option<Self::Ret<'a>> {
        Some((v.key(), v.val()))
    }
}

struct CfgIterKey;
impl<T: TreeElement> IterConfig<T> for CfgIterKey {
    type Ret<'a> = &'a T::Key where T: 'a;
    fn some<'a>(v: &'a T) -> Option<Self::Ret<'a>> {
        Some(v.key())
    }
}

struct CfgIterVal;
impl<T: TreeElement> IterConfig<T> for CfgIterVal {
    type Ret<'a> = &'a T::Value where T: 'a;
    fn some<'a>(v: &'a T) -> Option<Self::Ret<'a>> {
        Some(v.val())
    }
}

struct DfsFrame<'g, T, C: Config> {
    arr: &'g [Branch<T, C>],
    idx: usize,
}

struct RawIter<'t, 'g, 'v, T, C, I>
where
    't: 'v,
    'g: 'v + 't,
    C: Config,
{
    ct: &'t RawTree<T, C>,
    g: &'g Guard,
    stack: ArrayVec<DfsFrame<'g, T, C>, { <DefConfig as Config>::MAX_TREE_DEPTH }>,
    bucket: Option<slice::Iter<'g, T>>,
    _m: PhantomData<(&'v T, I)>,
}

impl<'t, 'g, 'v, T, C, I> RawIter<'t, 'g, 'v, T, C, I>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
    I: IterConfig<T>,
{
    fn new(ct: &'t RawTree<T, C>, g: &'g Guard) -> Self {
        let r = ct.rdcss_read_root(false, g);
        let m = r.gcas_read(ct, g);
        let mut stack = ArrayVec::new();
        match &unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .kind
        {
            MainKind::C(cn) => stack.push(DfsFrame {
                arr: &cn.branch,
                idx: 0,
            }),
            _ => unreachable!("logic,root main must be a branch node"),
        }
        Self {
            ct,
            g,
            stack,
            bucket: None,
            _m: PhantomData,
        }
    }
    /// depth-first search the tree
    fn _next(&mut self) -> Option<I::Ret<'v>> {
        loop {
            // drain a collision bucket first, if one is open
            if let Some(it) = self.bucket.as_mut() {
                match it.next() {
                    Some(e) => return I::some(e),
                    None => self.bucket = None,
                }
                continue;
            }
            let l = self.stack.len();
            if l == 0 {
                return None;
            }
            let exhausted = {
                let ref frame = self.stack[l - 1];
                frame.idx == frame.arr.len()
            };
            if exhausted {
                self.stack.pop();
                continue;
            }
            let (arr, pos) = {
                let ref mut frame = self.stack[l - 1];
                let arr = frame.arr;
                let pos = frame.idx;
                frame.idx += 1;
                (arr, pos)
            };
            match &arr[pos] {
                Branch::S(sn) => return I::some(&sn.elem),
                Branch::I(sin) => {
                    let m = sin.gcas_read(self.ct, self.g);
                    match &unsafe {
                        // UNSAFE(@ohsayan): a main is never null
                        m.deref()
                    }
                    .kind
                    {
                        MainKind::C(cn) => self.stack.push(DfsFrame {
                            arr: &cn.branch,
                            idx: 0,
                        }),
                        // a tomb is a live leaf waiting for contraction
                        MainKind::T(sn) => return I::some(&sn.elem),
                        MainKind::L(ln) => self.bucket = Some(ln.data.iter()),
                    }
                }
            }
        }
    }
}

impl<'t, 'g, 'v, T, C, I> Iterator for RawIter<'t, 'g, 'v, T, C, I>
where
    't: 'v,
    'g: 'v + 't,
    T: TreeElement,
    C: Config,
    I: IterConfig<T>,
{
    type Item = I::Ret<'v>;

    fn next(&mut self) -> Option<Self::Item> {
        self._next()
    }
}
