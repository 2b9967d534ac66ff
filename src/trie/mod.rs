/*
 * Created on Thu Jun 04 2026
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

mod access;
pub mod imp;
pub mod iter;
pub mod meta;
mod patch;
pub mod ser;
#[cfg(test)]
mod tests;

use {
    self::{
        access::ReadMode,
        iter::{IterKV, IterKey, IterVal},
        meta::{Config, Gen, LBuf, TreeElement, TrieRuntimeLog},
        patch::{PatchDelete, PatchWrite, WRITEMODE_FRESH, WRITEMODE_REFRESH},
    },
    crate::{
        meta::Comparable,
        sync::atm::{cpin, Atomic, Guard, Shared, ORD_ACQ, ORD_REL},
    },
    smallvec::smallvec,
    std::{
        fmt,
        hash::{BuildHasher, Hash, Hasher},
        sync::{atomic::AtomicBool, Arc},
    },
};

/*
    concurrent snapshottable trie impl
    ---
    This implements the concurrent hash array mapped trie with non-blocking snapshots from the research by
    Prokopec et al[1] on top of Bagwell's hash trees[2]. Every interior node is reached through an indirection
    (an i-node) and the i-node's payload is the only thing we ever CAS, in two phases (gcas below) so that a
    write can be revoked if the operation's root was swapped out under it. Snapshots swap the root indirection
    itself through a restricted double compare (rdcss below): the new trie shares every branch with the old one
    and branches are copied lazily when a writer from a different lineage first crosses them.

    The immutable structure is refcounted since two tries may share arbitrary subgraphs after a snapshot; the
    epoch reclaimer only covers the window between loading a cell and retiring the count it displaced.

    ---
    References:
    [1]: Aleksandar Prokopec, Nathan Grasso Bronson, Phil Bagwell, and Martin Odersky. 2012.
    Concurrent tries with efficient non-blocking snapshots. SIGPLAN Not. 47, 8 (August 2012),
    151-160. https://doi.org/10.1145/2370036.2145836
    [2]: https://lampwww.epfl.ch/papers/idealhashtrees.pdf
    -- Sayan (@ohsayan)
*/

/// single key/value leaf
pub(super) struct SNode<T> {
    pub(super) hc: u32,
    pub(super) elem: T,
}

impl<T> SNode<T> {
    #[inline(always)]
    fn new(hc: u32, elem: T) -> Self {
        Self { hc, elem }
    }
}

/// collision bucket; every entry shares the full hash
pub(super) struct LNode<T> {
    pub(super) hc: u32,
    pub(super) data: LBuf<T>,
}

impl<T: TreeElement> LNode<T> {
    fn pos_of<Q: Comparable<T::Key> + ?Sized>(&self, k: &Q) -> Option<usize> {
        self.data.iter().position(|e| k.cmp_eq(e.key()))
    }
    fn get<Q: Comparable<T::Key> + ?Sized>(&self, k: &Q) -> Option<&T> {
        self.pos_of(k).map(|i| &self.data[i])
    }
}

pub(super) enum Branch<T, C: Config> {
    /// subtree
    I(Arc<INode<T, C>>),
    /// leaf
    S(Arc<SNode<T>>),
}

impl<T, C: Config> Clone for Branch<T, C> {
    fn clone(&self) -> Self {
        match self {
            Self::I(in_) => Self::I(in_.clone()),
            Self::S(sn) => Self::S(sn.clone()),
        }
    }
}

/// bitmap indexed branch node
pub(super) struct CNode<T, C: Config> {
    pub(super) bmp: u32,
    pub(super) branch: Box<[Branch<T, C>]>,
    pub(super) gen: Gen,
}

pub(super) enum MainKind<T, C: Config> {
    C(CNode<T, C>),
    L(LNode<T>),
    /// tomb: marks a subtree holding a single live leaf for contraction by the next writer
    T(Arc<SNode<T>>),
}

/// an i-node payload, with the slot the two-phase cas runs on
pub(super) struct Main<T, C: Config> {
    prev: Atomic<Prev<T, C>>,
    pub(super) kind: MainKind<T, C>,
}

impl<T: TreeElement, C: Config> Main<T, C> {
    #[inline(always)]
    fn new(kind: MainKind<T, C>) -> Arc<Self> {
        Arc::new(Self {
            prev: Atomic::null(),
            kind,
        })
    }
}

/// contents of a main's `prev` slot while a gcas is in flight
pub(super) enum Prev<T, C: Config> {
    /// speculative publication; holds the displaced main
    Spec(Arc<Main<T, C>>),
    /// revoked publication; holds the main to restore
    Failed(Arc<Main<T, C>>),
}

/// the indirection cell: the single CAS point of a subtree
pub(super) struct INode<T, C: Config> {
    main: Atomic<Main<T, C>>,
    pub(super) gen: Gen,
}

/// a pending root swap
pub(super) struct Rdcss<T, C: Config> {
    ov: Arc<INode<T, C>>,
    exp: Arc<Main<T, C>>,
    nv: Arc<INode<T, C>>,
    committed: AtomicBool,
}

/// the root cell: a live root indirection, or a root swap caught mid-flight
pub(super) enum Root<T, C: Config> {
    Live(Arc<INode<T, C>>),
    Pending(Rdcss<T, C>),
}

impl<T: TreeElement, C: Config> CNode<T, C> {
    #[inline(always)]
    fn empty(gen: Gen) -> Self {
        Self {
            bmp: 0,
            branch: Vec::new().into_boxed_slice(),
            gen,
        }
    }
    #[inline(always)]
    fn flagpos(&self, hc: u32, lev: usize) -> (u32, usize) {
        let flag = 1u32 << ((hc >> lev) & C::MASK);
        (flag, (self.bmp & (flag - 1)).count_ones() as usize)
    }
    fn updated_at(&self, pos: usize, nb: Branch<T, C>, gen: Gen) -> Self {
        let mut narr = self.branch.to_vec();
        narr[pos] = nb;
        Self {
            bmp: self.bmp,
            branch: narr.into_boxed_slice(),
            gen,
        }
    }
    fn inserted_at(&self, pos: usize, flag: u32, nb: Branch<T, C>, gen: Gen) -> Self {
        debug_assert_eq!(self.bmp & flag, 0, "logic,slot already populated");
        let mut narr = Vec::with_capacity(self.branch.len() + 1);
        narr.extend(self.branch[..pos].iter().cloned());
        narr.push(nb);
        narr.extend(self.branch[pos..].iter().cloned());
        Self {
            bmp: self.bmp | flag,
            branch: narr.into_boxed_slice(),
            gen,
        }
    }
    fn removed_at(&self, pos: usize, flag: u32, gen: Gen) -> Self {
        debug_assert_ne!(self.bmp & flag, 0, "logic,removing an empty slot");
        let mut narr = Vec::with_capacity(self.branch.len() - 1);
        narr.extend(self.branch[..pos].iter().cloned());
        narr.extend(self.branch[pos + 1..].iter().cloned());
        Self {
            bmp: self.bmp & !flag,
            branch: narr.into_boxed_slice(),
            gen,
        }
    }
    /// copy with every child indirection restamped to `ngen`; mains are shared until a writer
    /// actually crosses them
    fn renewed(&self, ngen: Gen, ct: &RawTree<T, C>, g: &Guard) -> Self {
        let mut narr = Vec::with_capacity(self.branch.len());
        for br in self.branch.iter() {
            match br {
                Branch::I(in_) => narr.push(Branch::I(in_.copy_to_gen(ngen, ct, g))),
                Branch::S(sn) => narr.push(Branch::S(sn.clone())),
            }
        }
        Self {
            bmp: self.bmp,
            branch: narr.into_boxed_slice(),
            gen: ngen,
        }
    }
    /// resurrect tombed children into plain leaves, then contract if a single leaf remains
    fn to_compressed(&self, ct: &RawTree<T, C>, lev: usize, gen: Gen, g: &Guard) -> MainKind<T, C> {
        let mut narr = Vec::with_capacity(self.branch.len());
        for br in self.branch.iter() {
            match br {
                Branch::I(in_) => {
                    let m = in_.gcas_read(ct, g);
                    match &unsafe {
                        // UNSAFE(@ohsayan): a main is never null
                        m.deref()
                    }
                    .kind
                    {
                        MainKind::T(sn) => narr.push(Branch::S(sn.clone())),
                        _ => narr.push(Branch::I(in_.clone())),
                    }
                }
                Branch::S(sn) => narr.push(Branch::S(sn.clone())),
            }
        }
        Self {
            bmp: self.bmp,
            branch: narr.into_boxed_slice(),
            gen,
        }
        .to_contracted(lev)
    }
    /// a single-leaf c-node below the root collapses into a tomb
    fn to_contracted(self, lev: usize) -> MainKind<T, C> {
        if lev > 0 && self.branch.len() == 1 {
            if let Branch::S(sn) = &self.branch[0] {
                return MainKind::T(sn.clone());
            }
        }
        MainKind::C(self)
    }
    /// the smallest structure holding two distinct leaves below `lev`: a chain of single-entry
    /// c-nodes while their hashes still agree, a bucket once the hash is exhausted
    fn dual(
        x: Arc<SNode<T>>,
        y: Arc<SNode<T>>,
        lev: usize,
        gen: Gen,
        ct: &RawTree<T, C>,
    ) -> MainKind<T, C> {
        if lev < C::MAX_SPLIT_LEVEL {
            let xidx = (x.hc >> lev) & C::MASK;
            let yidx = (y.hc >> lev) & C::MASK;
            let bmp = (1u32 << xidx) | (1u32 << yidx);
            if xidx == yidx {
                let sub = INode::new(
                    Main::new(Self::dual(x, y, lev + C::BRANCH_LG, gen, ct)),
                    gen,
                );
                MainKind::C(CNode {
                    bmp,
                    branch: vec![Branch::I(Arc::new(sub))].into_boxed_slice(),
                    gen,
                })
            } else {
                let (a, b) = if xidx < yidx { (x, y) } else { (y, x) };
                MainKind::C(CNode {
                    bmp,
                    branch: vec![Branch::S(a), Branch::S(b)].into_boxed_slice(),
                    gen,
                })
            }
        } else {
            debug_assert_eq!(x.hc, y.hc, "logic,bucket for distinct hashes");
            ct.m.hlnode();
            MainKind::L(LNode {
                hc: x.hc,
                data: smallvec![x.elem.clone(), y.elem.clone()],
            })
        }
    }
}

/// outcome of a lookup or write attempt at some level
enum Res<R> {
    Done(R),
    /// the caller's view of the trie went stale; redrive from the root
    Restart,
}

/// outcome of a removal attempt
enum Rm<'g, T> {
    Restart,
    Nx,
    Ex(&'g T),
}

impl<T: TreeElement, C: Config> INode<T, C> {
    #[inline(always)]
    fn new(main: Arc<Main<T, C>>, gen: Gen) -> Self {
        Self {
            main: Atomic::new_arc(main),
            gen,
        }
    }
    #[inline(always)]
    fn empty(gen: Gen) -> Self {
        Self::new(Main::new(MainKind::C(CNode::empty(gen))), gen)
    }
    /// a copy of this indirection under a new lineage, sharing the (settled) main
    fn copy_to_gen(&self, ngen: Gen, ct: &RawTree<T, C>, g: &Guard) -> Arc<Self> {
        let m = self.gcas_read(ct, g);
        Arc::new(Self::new(
            unsafe {
                // UNSAFE(@ohsayan): read under our pin
                m.to_arc()
            },
            ngen,
        ))
    }

    /*
        gcas
        ---
        Publishing a new main is speculative: the new main carries the displaced one in its `prev` slot until
        the publication is validated against the root lineage. Readers complete whatever they find in flight,
        so nobody ever observes an unvalidated main. A publication made by an operation whose root was swapped
        out (a snapshot happened) is revoked and the operation restarts from the fresh root.
    */

    fn gcas_read<'g>(&self, ct: &RawTree<T, C>, g: &'g Guard) -> Shared<'g, Main<T, C>> {
        let m = self.main.ld_acq(g);
        let prev = unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .prev
        .ld_acq(g);
        if prev.is_null() {
            m
        } else {
            self.gcas_complete(m, ct, g)
        }
    }

    fn gcas_complete<'g>(
        &self,
        mut m: Shared<'g, Main<T, C>>,
        ct: &RawTree<T, C>,
        g: &'g Guard,
    ) -> Shared<'g, Main<T, C>> {
        loop {
            let main = unsafe {
                // UNSAFE(@ohsayan): a main is never null
                m.deref()
            };
            let prev = main.prev.ld_acq(g);
            if prev.is_null() {
                return m;
            }
            // must not help a pending root swap along from here, or completing the swap and
            // completing this write would wait on each other
            let ctr = ct.rdcss_read_root(true, g);
            match unsafe {
                // UNSAFE(@ohsayan): nullck above
                prev.deref()
            } {
                Prev::Failed(om) => {
                    // a revoked publication: put the displaced main back
                    match self.main.cx_rel(m, Some(om.clone()), g) {
                        Ok(restored) => return restored,
                        Err(_) => m = self.main.ld_acq(g),
                    }
                }
                Prev::Spec(om) => {
                    if ctr.gen == self.gen && !ct.rdonly {
                        // lineage still ours: validate the publication
                        if main.prev.cx_rel(prev, None, g).is_ok() {
                            return m;
                        }
                    } else {
                        // overtaken by a snapshot (or we are a frozen reader): revoke
                        let _ = main
                            .prev
                            .cx_rel(prev, Some(Arc::new(Prev::Failed(om.clone()))), g);
                        m = self.main.ld_acq(g);
                    }
                }
            }
        }
    }

    /// returns true iff `new` was published and validated
    fn gcas(
        &self,
        old: Shared<Main<T, C>>,
        new: Arc<Main<T, C>>,
        ct: &RawTree<T, C>,
        g: &Guard,
    ) -> bool {
        new.prev.st_rel(Arc::new(Prev::Spec(unsafe {
            // UNSAFE(@ohsayan): old was read under this pin
            old.to_arc()
        })));
        match self.main.cx_rel(old, Some(new), g) {
            Ok(published) => {
                self.gcas_complete(published, ct, g);
                unsafe {
                    // UNSAFE(@ohsayan): published under this pin
                    published.deref()
                }
                .prev
                .ld_acq(g)
                .is_null()
            }
            Err(_) => false,
        }
    }

    /*
        the recursive engines. every one of them either settles at this level or asks the driver
        to restart from the (possibly replaced) root
    */

    fn rec_lookup<'g, R: ReadMode<T>>(
        &'g self,
        spec: &R,
        hc: u32,
        lev: usize,
        parent: Option<&'g INode<T, C>>,
        startgen: Gen,
        ct: &'g RawTree<T, C>,
        g: &'g Guard,
    ) -> Res<R::Ret<'g>> {
        let m = self.gcas_read(ct, g);
        match &unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .kind
        {
            MainKind::C(cn) => {
                let (flag, pos) = cn.flagpos(hc, lev);
                if cn.bmp & flag == 0 {
                    return Res::Done(R::nx());
                }
                match &cn.branch[pos] {
                    Branch::I(sin) => {
                        if ct.rdonly || sin.gen == startgen {
                            sin.rec_lookup(spec, hc, lev + C::BRANCH_LG, Some(self), startgen, ct, g)
                        } else {
                            // stale lineage: copy the branch level into ours, then retry it
                            let ncn = Main::new(MainKind::C(cn.renewed(startgen, ct, g)));
                            if self.gcas(m, ncn, ct, g) {
                                self.rec_lookup(spec, hc, lev, parent, startgen, ct, g)
                            } else {
                                Res::Restart
                            }
                        }
                    }
                    Branch::S(sn) => {
                        if sn.hc == hc && spec.target().cmp_eq(sn.elem.key()) {
                            Res::Done(R::ex(&sn.elem))
                        } else {
                            Res::Done(R::nx())
                        }
                    }
                }
            }
            MainKind::L(ln) => Res::Done(match ln.get(spec.target()) {
                Some(e) => R::ex(e),
                None => R::nx(),
            }),
            MainKind::T(sn) => {
                if ct.rdonly {
                    // frozen tries read through tombs
                    if sn.hc == hc && spec.target().cmp_eq(sn.elem.key()) {
                        Res::Done(R::ex(&sn.elem))
                    } else {
                        Res::Done(R::nx())
                    }
                } else {
                    if let Some(p) = parent {
                        p.clean(ct, lev - C::BRANCH_LG, g);
                    }
                    Res::Restart
                }
            }
        }
    }

    fn rec_insert<'g, P: PatchWrite<T>>(
        &'g self,
        patch: &mut P,
        hc: u32,
        lev: usize,
        parent: Option<&'g INode<T, C>>,
        startgen: Gen,
        ct: &'g RawTree<T, C>,
        g: &'g Guard,
    ) -> Res<P::Ret<'g>> {
        let m = self.gcas_read(ct, g);
        match &unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .kind
        {
            MainKind::C(cn) => {
                let (flag, pos) = cn.flagpos(hc, lev);
                if cn.bmp & flag == 0 {
                    // an empty slot
                    if P::WMODE == WRITEMODE_REFRESH {
                        // an update against a missing key; job well done
                        return Res::Done(P::nx_ret());
                    }
                    let nb = Branch::S(Arc::new(SNode::new(hc, patch.nx_new())));
                    let ncn = if cn.gen == startgen {
                        cn.inserted_at(pos, flag, nb, startgen)
                    } else {
                        cn.renewed(startgen, ct, g).inserted_at(pos, flag, nb, startgen)
                    };
                    if self.gcas(m, Main::new(MainKind::C(ncn)), ct, g) {
                        Res::Done(P::nx_ret())
                    } else {
                        Res::Restart
                    }
                } else {
                    match &cn.branch[pos] {
                        Branch::I(sin) => {
                            if sin.gen == startgen {
                                sin.rec_insert(
                                    patch,
                                    hc,
                                    lev + C::BRANCH_LG,
                                    Some(self),
                                    startgen,
                                    ct,
                                    g,
                                )
                            } else {
                                let ncn = Main::new(MainKind::C(cn.renewed(startgen, ct, g)));
                                if self.gcas(m, ncn, ct, g) {
                                    self.rec_insert(patch, hc, lev, parent, startgen, ct, g)
                                } else {
                                    Res::Restart
                                }
                            }
                        }
                        Branch::S(sn) => {
                            if sn.hc == hc && patch.target().cmp_eq(sn.elem.key()) {
                                // an entry for this key exists
                                if P::WMODE == WRITEMODE_FRESH {
                                    return Res::Done(P::ex_ret(&sn.elem));
                                }
                                if !patch.ex_cmp(&sn.elem) {
                                    return Res::Done(P::mx_ret(&sn.elem));
                                }
                                let nsn = Arc::new(SNode::new(hc, patch.ex_apply(&sn.elem)));
                                let ncn = cn.updated_at(pos, Branch::S(nsn), self.gen);
                                if self.gcas(m, Main::new(MainKind::C(ncn)), ct, g) {
                                    Res::Done(P::ex_ret(&sn.elem))
                                } else {
                                    Res::Restart
                                }
                            } else {
                                // distinct key in this slot: split it one level down
                                if P::WMODE == WRITEMODE_REFRESH {
                                    return Res::Done(P::nx_ret());
                                }
                                ct.m.hsplit();
                                let nsn = Arc::new(SNode::new(hc, patch.nx_new()));
                                let din = Branch::I(Arc::new(INode::new(
                                    Main::new(CNode::dual(
                                        sn.clone(),
                                        nsn,
                                        lev + C::BRANCH_LG,
                                        startgen,
                                        ct,
                                    )),
                                    startgen,
                                )));
                                let ncn = if cn.gen == startgen {
                                    cn.updated_at(pos, din, startgen)
                                } else {
                                    cn.renewed(startgen, ct, g).updated_at(pos, din, startgen)
                                };
                                if self.gcas(m, Main::new(MainKind::C(ncn)), ct, g) {
                                    Res::Done(P::nx_ret())
                                } else {
                                    Res::Restart
                                }
                            }
                        }
                    }
                }
            }
            MainKind::L(ln) => {
                debug_assert_eq!(ln.hc, hc, "logic,hash mismatch in collision bucket");
                match ln.pos_of(patch.target()) {
                    Some(i) => {
                        if P::WMODE == WRITEMODE_FRESH {
                            return Res::Done(P::ex_ret(&ln.data[i]));
                        }
                        if !patch.ex_cmp(&ln.data[i]) {
                            return Res::Done(P::mx_ret(&ln.data[i]));
                        }
                        // replace the entry in a copy of the bucket
                        let mut nd = LBuf::with_capacity(ln.data.len());
                        nd.extend(ln.data[..i].iter().cloned());
                        nd.extend(ln.data[i + 1..].iter().cloned());
                        nd.push(patch.ex_apply(&ln.data[i]));
                        let nln = Main::new(MainKind::L(LNode { hc: ln.hc, data: nd }));
                        if self.gcas(m, nln, ct, g) {
                            Res::Done(P::ex_ret(&ln.data[i]))
                        } else {
                            Res::Restart
                        }
                    }
                    None => {
                        if P::WMODE == WRITEMODE_REFRESH {
                            return Res::Done(P::nx_ret());
                        }
                        let mut nd = ln.data.clone();
                        nd.push(patch.nx_new());
                        ct.m.hlnode();
                        let nln = Main::new(MainKind::L(LNode { hc: ln.hc, data: nd }));
                        if self.gcas(m, nln, ct, g) {
                            Res::Done(P::nx_ret())
                        } else {
                            Res::Restart
                        }
                    }
                }
            }
            MainKind::T(_) => {
                if let Some(p) = parent {
                    p.clean(ct, lev - C::BRANCH_LG, g);
                }
                Res::Restart
            }
        }
    }

    fn rec_remove<'g, P: PatchDelete<T>>(
        &'g self,
        patch: &P,
        hc: u32,
        lev: usize,
        parent: Option<&'g INode<T, C>>,
        startgen: Gen,
        ct: &'g RawTree<T, C>,
        g: &'g Guard,
    ) -> Rm<'g, T> {
        let m = self.gcas_read(ct, g);
        match &unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .kind
        {
            MainKind::C(cn) => {
                let (flag, pos) = cn.flagpos(hc, lev);
                if cn.bmp & flag == 0 {
                    return Rm::Nx;
                }
                let res = match &cn.branch[pos] {
                    Branch::I(sin) => {
                        if sin.gen == startgen {
                            sin.rec_remove(patch, hc, lev + C::BRANCH_LG, Some(self), startgen, ct, g)
                        } else {
                            let ncn = Main::new(MainKind::C(cn.renewed(startgen, ct, g)));
                            if self.gcas(m, ncn, ct, g) {
                                self.rec_remove(patch, hc, lev, parent, startgen, ct, g)
                            } else {
                                Rm::Restart
                            }
                        }
                    }
                    Branch::S(sn) => {
                        if sn.hc == hc
                            && patch.target().cmp_eq(sn.elem.key())
                            && patch.ex_cmp(&sn.elem)
                        {
                            let ncn = cn.removed_at(pos, flag, self.gen).to_contracted(lev);
                            if self.gcas(m, Main::new(ncn), ct, g) {
                                Rm::Ex(&sn.elem)
                            } else {
                                Rm::Restart
                            }
                        } else {
                            Rm::Nx
                        }
                    }
                };
                if let Rm::Ex(_) = res {
                    if let Some(p) = parent {
                        // if the removal tombed this subtree, hoist the survivor into the parent
                        let nm = self.gcas_read(ct, g);
                        if let MainKind::T(_) = &unsafe {
                            // UNSAFE(@ohsayan): a main is never null
                            nm.deref()
                        }
                        .kind
                        {
                            self.clean_parent(nm, p, hc, lev, startgen, ct, g);
                        }
                    }
                }
                res
            }
            MainKind::L(ln) => {
                debug_assert_eq!(ln.hc, hc, "logic,hash mismatch in collision bucket");
                match ln.pos_of(patch.target()) {
                    None => Rm::Nx,
                    Some(i) if !patch.ex_cmp(&ln.data[i]) => Rm::Nx,
                    Some(i) => {
                        // shrink the bucket; a single survivor becomes a tomb
                        let mut nd = ln.data.clone();
                        nd.remove(i);
                        debug_assert!(!nd.is_empty(), "logic,bucket underflow");
                        let nkind = if nd.len() == 1 {
                            MainKind::T(Arc::new(SNode::new(ln.hc, nd.swap_remove(0))))
                        } else {
                            MainKind::L(LNode { hc: ln.hc, data: nd })
                        };
                        if self.gcas(m, Main::new(nkind), ct, g) {
                            Rm::Ex(&ln.data[i])
                        } else {
                            Rm::Restart
                        }
                    }
                }
            }
            MainKind::T(_) => {
                if let Some(p) = parent {
                    p.clean(ct, lev - C::BRANCH_LG, g);
                }
                Rm::Restart
            }
        }
    }

    /// force a compression of this (parent) level after a tomb was sighted below it
    fn clean(&self, ct: &RawTree<T, C>, lev: usize, g: &Guard) {
        let m = self.gcas_read(ct, g);
        if let MainKind::C(cn) = &unsafe {
            // UNSAFE(@ohsayan): a main is never null
            m.deref()
        }
        .kind
        {
            let _ = self.gcas(m, Main::new(cn.to_compressed(ct, lev, self.gen, g)), ct, g);
        }
    }

    /// replace the branch to this (tombed) indirection in the parent with the resurrected leaf
    fn clean_parent<'g>(
        &'g self,
        nonlive: Shared<'g, Main<T, C>>,
        parent: &'g INode<T, C>,
        hc: u32,
        lev: usize,
        startgen: Gen,
        ct: &'g RawTree<T, C>,
        g: &'g Guard,
    ) {
        loop {
            let pm = parent.gcas_read(ct, g);
            let cn = match &unsafe {
                // UNSAFE(@ohsayan): a main is never null
                pm.deref()
            }
            .kind
            {
                MainKind::C(cn) => cn,
                // parent is no longer a branch level; some other writer got here first
                _ => return,
            };
            let (flag, pos) = cn.flagpos(hc, lev - C::BRANCH_LG);
            if cn.bmp & flag == 0 {
                // the branch is already gone
                return;
            }
            match &cn.branch[pos] {
                Branch::I(sub) if std::ptr::eq(Arc::as_ptr(sub), self) => {}
                _ => return,
            }
            let sn = match &unsafe {
                // UNSAFE(@ohsayan): read under this pin by our caller
                nonlive.deref()
            }
            .kind
            {
                MainKind::T(sn) => sn.clone(),
                _ => return,
            };
            let ncn = cn
                .updated_at(pos, Branch::S(sn), parent.gen)
                .to_contracted(lev - C::BRANCH_LG);
            if parent.gcas(pm, Main::new(ncn), ct, g) {
                return;
            }
            if ct.rdcss_read_root(false, g).gen != startgen {
                // our lineage ended; the fresh one will compress on its own terms
                return;
            }
        }
    }
}

pub(super) struct RawTree<T, C: Config = meta::DefConfig> {
    root: Atomic<Root<T, C>>,
    rdonly: bool,
    h: C::HState,
    m: TrieRuntimeLog,
}

impl<T: TreeElement, C: Config> Default for RawTree<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeElement, C: Config> RawTree<T, C> {
    fn with_root(r: Arc<INode<T, C>>, rdonly: bool) -> Self {
        Self {
            root: Atomic::new_arc(Arc::new(Root::Live(r))),
            rdonly,
            h: C::HState::default(),
            m: TrieRuntimeLog::new(),
        }
    }
    pub(super) fn new() -> Self {
        Self::with_root(Arc::new(INode::empty(Gen::fresh())), false)
    }
    #[cfg(test)]
    pub(super) fn metrics(&self) -> &TrieRuntimeLog {
        &self.m
    }
    fn hash<Q>(&self, k: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        let mut state = self.h.build_hasher();
        k.hash(&mut state);
        let h = state.finish();
        ((h >> u32::BITS) ^ h) as u32
    }

    /*
        rdcss
        ---
        A snapshot must atomically (a) verify the root's main is still the one it observed and (b) install a
        new root indirection. The pending swap sits in the root cell as a descriptor until some thread settles
        it; readers that stumble into one settle it first (aborting it when asked to, see gcas_complete).
    */

    pub(super) fn rdcss_read_root<'g>(&self, abort: bool, g: &'g Guard) -> &'g INode<T, C> {
        let r = self.root.ld_acq(g);
        match unsafe {
            // UNSAFE(@ohsayan): the root cell is never null
            r.deref()
        } {
            Root::Live(in_) => in_,
            Root::Pending(_) => self.rdcss_complete(abort, g),
        }
    }

    fn rdcss_complete<'g>(&self, abort: bool, g: &'g Guard) -> &'g INode<T, C> {
        loop {
            let r = self.root.ld_acq(g);
            let desc = match unsafe {
                // UNSAFE(@ohsayan): the root cell is never null
                r.deref()
            } {
                Root::Live(in_) => return in_,
                Root::Pending(desc) => desc,
            };
            if !abort {
                let om = desc.ov.gcas_read(self, g);
                if om.eq_arc(&desc.exp) {
                    // still the observed main: the swap goes through
                    if self
                        .root
                        .cx_rel(r, Some(Arc::new(Root::Live(desc.nv.clone()))), g)
                        .is_ok()
                    {
                        desc.committed.store(true, ORD_REL);
                        return &desc.nv;
                    }
                    continue;
                }
            }
            // back the descriptor out
            if self
                .root
                .cx_rel(r, Some(Arc::new(Root::Live(desc.ov.clone()))), g)
                .is_ok()
            {
                return &desc.ov;
            }
        }
    }

    fn rdcss_root<'g>(
        &self,
        r: Shared<'g, Root<T, C>>,
        ov: Arc<INode<T, C>>,
        exp: Arc<Main<T, C>>,
        nv: Arc<INode<T, C>>,
        g: &'g Guard,
    ) -> bool {
        let desc = Arc::new(Root::Pending(Rdcss {
            ov,
            exp,
            nv,
            committed: AtomicBool::new(false),
        }));
        match self.root.cx_rel(r, Some(desc), g) {
            Ok(installed) => {
                self.rdcss_complete(false, g);
                match unsafe {
                    // UNSAFE(@ohsayan): installed under this pin
                    installed.deref()
                } {
                    Root::Pending(desc) => desc.committed.load(ORD_ACQ),
                    Root::Live(_) => unreachable!("logic,descriptor replaced in place"),
                }
            }
            Err(_) => false,
        }
    }

    /*
        the drivers: redrive an engine from the live root until it settles
    */

    pub(super) fn lookup<'g, R: ReadMode<T>>(&'g self, spec: R, g: &'g Guard) -> R::Ret<'g> {
        let hc = self.hash(spec.target());
        loop {
            let r = self.rdcss_read_root(false, g);
            match r.rec_lookup(&spec, hc, C::LEVEL_ZERO, None, r.gen, self, g) {
                Res::Done(ret) => return ret,
                Res::Restart => self.m.hrestart(),
            }
        }
    }

    pub(super) fn insert<'g, P: PatchWrite<T>>(&'g self, mut patch: P, g: &'g Guard) -> P::Ret<'g> {
        debug_assert!(!self.rdonly, "logic,write driven on a frozen trie");
        let hc = self.hash(patch.target());
        loop {
            let r = self.rdcss_read_root(false, g);
            match r.rec_insert(&mut patch, hc, C::LEVEL_ZERO, None, r.gen, self, g) {
                Res::Done(ret) => return ret,
                Res::Restart => self.m.hrestart(),
            }
        }
    }

    pub(super) fn remove<'g, P: PatchDelete<T>>(&'g self, patch: P, g: &'g Guard) -> P::Ret<'g> {
        debug_assert!(!self.rdonly, "logic,write driven on a frozen trie");
        let hc = self.hash(patch.target());
        loop {
            let r = self.rdcss_read_root(false, g);
            match r.rec_remove(&patch, hc, C::LEVEL_ZERO, None, r.gen, self, g) {
                Rm::Ex(e) => return P::ex_ret(e),
                Rm::Nx => return P::nx_ret(),
                Rm::Restart => self.m.hrestart(),
            }
        }
    }

    /// fork this trie in O(1). Both sides get fresh lineages over the very same main, and copy
    /// branches from each other lazily as they are written to.
    pub(super) fn snapshot(&self, rdonly: bool) -> Self {
        let g = cpin();
        loop {
            let r = self.root.ld_acq(&g);
            let rin = match unsafe {
                // UNSAFE(@ohsayan): the root cell is never null
                r.deref()
            } {
                Root::Live(in_) => in_,
                Root::Pending(_) => {
                    self.rdcss_complete(false, &g);
                    continue;
                }
            };
            let em = rin.gcas_read(self, &g);
            let exp = unsafe {
                // UNSAFE(@ohsayan): read under this pin
                em.to_arc()
            };
            let nr = Arc::new(INode::new(exp.clone(), Gen::fresh()));
            let sr = Arc::new(INode::new(exp.clone(), Gen::fresh()));
            if self.rdcss_root(r, rin.clone(), exp, nr, &g) {
                self.m.hsnapshot();
                return Self::with_root(sr, rdonly);
            }
        }
    }

    pub(super) fn clear(&self) {
        debug_assert!(!self.rdonly, "logic,write driven on a frozen trie");
        let g = cpin();
        loop {
            let r = self.root.ld_acq(&g);
            let rin = match unsafe {
                // UNSAFE(@ohsayan): the root cell is never null
                r.deref()
            } {
                Root::Live(in_) => in_,
                Root::Pending(_) => {
                    self.rdcss_complete(false, &g);
                    continue;
                }
            };
            let em = rin.gcas_read(self, &g);
            let exp = unsafe {
                // UNSAFE(@ohsayan): read under this pin
                em.to_arc()
            };
            if self.rdcss_root(r, rin.clone(), exp, Arc::new(INode::empty(Gen::fresh())), &g) {
                return;
            }
        }
    }
}

// iter
impl<T: TreeElement, C: Config> RawTree<T, C> {
    pub(super) fn iter_kv<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKV<'t, 'g, 'v, T, C> {
        IterKV::new(self, g)
    }
    pub(super) fn iter_key<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterKey<'t, 'g, 'v, T, C> {
        IterKey::new(self, g)
    }
    pub(super) fn iter_val<'t, 'g, 'v>(&'t self, g: &'g Guard) -> IterVal<'t, 'g, 'v, T, C> {
        IterVal::new(self, g)
    }
    pub(super) fn count(&self, g: &Guard) -> usize {
        self.iter_key(g).count()
    }
}

impl<T: TreeElement, C: Config> fmt::Debug for RawTree<T, C>
where
    T::Key: fmt::Debug,
    T::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = cpin();
        f.debug_map().entries(self.iter_kv(&g)).finish()
    }
}
