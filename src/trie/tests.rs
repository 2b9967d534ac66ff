/*
 * Created on Sat Jun 20 2026
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
        imp::{TrieMap, TrieMapCopy},
        meta::impl_config,
        ser::Restored,
    },
    crate::sync::atm::cpin,
    std::{
        collections::HashMap,
        hash::{BuildHasher, Hasher},
        sync::{Arc, RwLock},
        thread::{self, JoinHandle},
    },
};

type Map<K, V> = TrieMapCopy<K, V>;
type MapU8 = Map<u8, u8>;

/// every key hashes to the seed: the whole map is one collision bucket
struct LolHash {
    seed: usize,
}

impl LolHash {
    const fn with_seed(seed: usize) -> Self {
        Self { seed }
    }
    const fn init_default_seed() -> Self {
        Self::with_seed(0)
    }
}

impl Default for LolHash {
    fn default() -> Self {
        Self::init_default_seed()
    }
}

impl Hasher for LolHash {
    fn finish(&self) -> u64 {
        self.seed as _
    }
    fn write(&mut self, _: &[u8]) {}
}

#[derive(Default)]
struct LolState {
    seed: usize,
}

impl BuildHasher for LolState {
    type Hasher = LolHash;
    fn build_hasher(&self) -> Self::Hasher {
        LolHash::with_seed(self.seed)
    }
}

/// hash = the first eight little-endian bytes written; for u32 keys, hash == key
#[derive(Default)]
struct IdHash {
    h: u64,
}

impl Hasher for IdHash {
    fn finish(&self) -> u64 {
        self.h
    }
    fn write(&mut self, bytes: &[u8]) {
        let mut buf = [0u8; 8];
        let l = bytes.len().min(8);
        buf[..l].copy_from_slice(&bytes[..l]);
        self.h = u64::from_le_bytes(buf);
    }
}

#[derive(Default)]
struct IdState;

impl BuildHasher for IdState {
    type Hasher = IdHash;
    fn build_hasher(&self) -> Self::Hasher {
        IdHash::default()
    }
}

impl_config!(ConfigCollide: LolState = u32, ConfigId: IdState = u32);

type CollideMap = TrieMap<(String, String), ConfigCollide>;
type IdMap = TrieMap<(u32, u32), ConfigId>;

// empty
#[test]
fn drop_empty() {
    let idx = MapU8::new();
    drop(idx);
}

#[test]
fn get_empty() {
    let idx = MapU8::new();
    assert!(idx.get(&10, &cpin()).is_none());
}

#[test]
fn update_empty() {
    let idx = MapU8::new();
    assert!(!idx.update(&10, 20, &cpin()));
}

#[test]
fn iter_empty() {
    let idx = MapU8::new();
    let g = cpin();
    assert_eq!(idx.iter_kv(&g).count(), 0);
}

// single threaded ops
#[test]
fn insert_then_get() {
    let idx = Map::<String, String>::new();
    let g = cpin();
    assert!(idx.upsert_return("a".to_owned(), "1".to_owned(), &g).is_none());
    assert!(idx.upsert_return("b".to_owned(), "2".to_owned(), &g).is_none());
    assert_eq!(idx.get("a", &g).unwrap(), "1");
    assert_eq!(idx.get("b", &g).unwrap(), "2");
    assert!(idx.get("c", &g).is_none());
}

#[test]
fn insert_if_absent() {
    let idx = Map::<String, String>::new();
    let g = cpin();
    assert!(idx.insert_return("k".to_owned(), "1".to_owned(), &g).is_none());
    assert_eq!(
        idx.insert_return("k".to_owned(), "2".to_owned(), &g).unwrap(),
        "1"
    );
    assert_eq!(idx.get("k", &g).unwrap(), "1");
}

#[test]
fn update_variants() {
    let idx = Map::<String, u32>::new();
    let g = cpin();
    assert!(!idx.update("k", 1, &g));
    idx.upsert("k".to_owned(), 1, &g);
    assert!(idx.update("k", 2, &g));
    assert_eq!(*idx.update_return("k", 3, &g).unwrap(), 2);
    assert_eq!(*idx.get("k", &g).unwrap(), 3);
}

#[test]
fn update_if_swaps_only_on_match() {
    let idx = Map::<String, u32>::new();
    let g = cpin();
    idx.upsert("k".to_owned(), 1, &g);
    assert!(!idx.update_if("k", &2, 3, &g));
    assert_eq!(*idx.get("k", &g).unwrap(), 1);
    assert!(idx.update_if("k", &1, 3, &g));
    assert_eq!(*idx.get("k", &g).unwrap(), 3);
}

#[test]
fn remove_if_conditional() {
    let idx = Map::<String, String>::new();
    let g = cpin();
    idx.upsert("k".to_owned(), "1".to_owned(), &g);
    assert!(!idx.remove_if("k", &"2".to_owned(), &g));
    assert_eq!(idx.get("k", &g).unwrap(), "1");
    assert!(idx.remove_if("k", &"1".to_owned(), &g));
    assert!(idx.get("k", &g).is_none());
}

#[test]
fn remove_missing_is_noop() {
    let idx = Map::<String, String>::new();
    let g = cpin();
    idx.upsert("a".to_owned(), "1".to_owned(), &g);
    assert!(!idx.remove("b", &g));
    assert_eq!(idx.len(), 1);
}

#[test]
fn remove_return_previous() {
    let idx = Map::<String, String>::new();
    let g = cpin();
    idx.upsert("a".to_owned(), "1".to_owned(), &g);
    assert_eq!(idx.remove_return("a", &g).unwrap(), "1");
    assert!(idx.remove_return("a", &g).is_none());
}

#[test]
fn contains_val_scan() {
    let idx = Map::<String, u32>::new();
    let g = cpin();
    idx.upsert("a".to_owned(), 1, &g);
    idx.upsert("b".to_owned(), 2, &g);
    assert!(idx.contains_val(&2));
    assert!(!idx.contains_val(&3));
}

// degenerate hash layouts
#[test]
fn collision_bucket() {
    let idx = CollideMap::new();
    let g = cpin();
    assert!(idx.upsert_return("x".to_owned(), "X".to_owned(), &g).is_none());
    assert!(idx.upsert_return("y".to_owned(), "Y".to_owned(), &g).is_none());
    if cfg!(debug_assertions) {
        assert!(idx.t.metrics().replnode() >= 1);
    }
    assert_eq!(idx.get("x", &g).unwrap(), "X");
    assert_eq!(idx.get("y", &g).unwrap(), "Y");
    assert_eq!(idx.remove_return("x", &g).unwrap(), "X");
    // the bucket contracted to a tomb; any traversal past it settles it back into a leaf
    assert!(idx.get("x", &g).is_none());
    assert_eq!(idx.get("y", &g).unwrap(), "Y");
    assert_eq!(idx.len(), 1);
}

#[test]
fn collision_bucket_drains_to_empty() {
    let idx = CollideMap::new();
    let g = cpin();
    for i in 0..8 {
        idx.upsert(format!("k{i}"), format!("v{i}"), &g);
    }
    assert_eq!(idx.len(), 8);
    for i in 0..8 {
        assert_eq!(idx.remove_return(&format!("k{i}"), &g).unwrap(), &format!("v{i}"));
    }
    assert_eq!(idx.len(), 0);
    assert!(idx.get("k0", &g).is_none());
}

#[test]
fn deep_split_at_last_level() {
    // these keys agree on every 5-bit chunk below level 30 and diverge there
    let idx = IdMap::new();
    let g = cpin();
    idx.upsert(0u32, 100, &g);
    idx.upsert(1u32 << 30, 101, &g);
    idx.upsert(3u32 << 30, 102, &g);
    assert_eq!(*idx.get(&0, &g).unwrap(), 100);
    assert_eq!(*idx.get(&(1 << 30), &g).unwrap(), 101);
    assert_eq!(*idx.get(&(3 << 30), &g).unwrap(), 102);
    assert_eq!(idx.len(), 3);
    assert!(idx.remove(&(1u32 << 30), &g));
    assert!(idx.get(&(1 << 30), &g).is_none());
    assert_eq!(*idx.get(&0, &g).unwrap(), 100);
    assert_eq!(*idx.get(&(3 << 30), &g).unwrap(), 102);
}

// snapshots
#[test]
fn snapshot_isolation() {
    let m = Map::<String, String>::new();
    let g = cpin();
    m.upsert("a".to_owned(), "1".to_owned(), &g);
    let s = m.snapshot();
    m.upsert("a".to_owned(), "2".to_owned(), &g);
    m.upsert("b".to_owned(), "3".to_owned(), &g);
    assert_eq!(s.get("a", &g).unwrap(), "1");
    assert!(s.get("b", &g).is_none());
    assert_eq!(m.get("a", &g).unwrap(), "2");
    assert_eq!(m.get("b", &g).unwrap(), "3");
}

#[test]
fn snapshot_writes_stay_private() {
    let m = Map::<String, u32>::new();
    let g = cpin();
    m.upsert("a".to_owned(), 1, &g);
    let s = m.snapshot();
    s.upsert("b".to_owned(), 2, &g);
    s.upsert("a".to_owned(), 10, &g);
    assert_eq!(*m.get("a", &g).unwrap(), 1);
    assert!(m.get("b", &g).is_none());
    assert_eq!(*s.get("a", &g).unwrap(), 10);
    assert_eq!(*s.get("b", &g).unwrap(), 2);
}

#[test]
fn frozen_snapshot_survives_clear() {
    const N: usize = 1000;
    let m = Map::<u32, u32>::new();
    let g = cpin();
    for i in 0..N as u32 {
        m.upsert(i, i + 1, &g);
    }
    let s = m.frozen_snapshot();
    m.clear();
    assert_eq!(s.len(), N);
    for i in 0..N as u32 {
        assert_eq!(*s.get(&i, &g).unwrap(), i + 1);
    }
    assert_eq!(m.len(), 0);
    assert_eq!(m.iter_kv(&g).count(), 0);
}

#[test]
fn frozen_thaw() {
    let m = Map::<String, u32>::new();
    let g = cpin();
    m.upsert("a".to_owned(), 1, &g);
    let s = m.frozen_snapshot();
    let t = s.thaw();
    t.upsert("b".to_owned(), 2, &g);
    assert_eq!(*t.get("a", &g).unwrap(), 1);
    assert_eq!(*t.get("b", &g).unwrap(), 2);
    assert_eq!(s.len(), 1);
    assert!(s.get("b", &g).is_none());
}

#[test]
fn len_matches_iter() {
    let m = Map::<u32, u32>::new();
    let g = cpin();
    for i in 0..257u32 {
        m.upsert(i, i, &g);
    }
    let s = m.frozen_snapshot();
    assert_eq!(s.len(), 257);
    assert_eq!(s.iter_kv(&g).count(), s.len());
}

// serde
#[test]
fn serde_round_trip_mutable() {
    let m = Map::<String, String>::new();
    let g = cpin();
    m.upsert("a".to_owned(), "1".to_owned(), &g);
    m.upsert("b".to_owned(), "2".to_owned(), &g);
    m.upsert("c".to_owned(), "3".to_owned(), &g);
    let payload = serde_json::to_string(&m).unwrap();
    let restored: Restored<(String, String)> = serde_json::from_str(&payload).unwrap();
    assert!(!restored.is_frozen());
    let m2 = restored.into_mutable().unwrap();
    let before: HashMap<String, String> = m
        .iter_kv(&g)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let after: HashMap<String, String> = m2
        .iter_kv(&g)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn serde_round_trip_frozen() {
    let m = Map::<String, u32>::new();
    let g = cpin();
    m.upsert("a".to_owned(), 1, &g);
    m.upsert("b".to_owned(), 2, &g);
    let frozen = m.frozen_snapshot();
    let payload = serde_json::to_string(&frozen).unwrap();
    let restored: Restored<(String, u32)> = serde_json::from_str(&payload).unwrap();
    assert!(restored.is_frozen());
    let f2 = restored.into_frozen().unwrap();
    assert_eq!(f2.len(), 2);
    assert_eq!(*f2.get("a", &g).unwrap(), 1);
    assert_eq!(*f2.get("b", &g).unwrap(), 2);
}

#[test]
fn serde_live_map_snapshots_entries() {
    // the payload must reflect one instant even if the map moves on afterwards
    let m = Map::<String, u32>::new();
    let g = cpin();
    m.upsert("a".to_owned(), 1, &g);
    let payload = serde_json::to_string(&m).unwrap();
    m.upsert("b".to_owned(), 2, &g);
    let restored: Restored<(String, u32)> = serde_json::from_str(&payload).unwrap();
    let m2 = restored.into_mutable().unwrap();
    assert_eq!(m2.len(), 1);
    assert!(m2.get("b", &g).is_none());
}

// multi threaded
const SPAM_INSERT: usize = 16_384;
const SPAM_TENANTS: usize = 32;

#[test]
fn multispam_insert() {
    let idx = Arc::new(Map::<Arc<String>, Arc<String>>::new());
    let token = Arc::new(RwLock::new(()));
    let hold = token.write();
    let data: Vec<(Arc<String>, Arc<String>)> = (0..SPAM_INSERT)
        .map(|int| (format!("{int}"), format!("x-{int}-{}", int + 1)))
        .map(|(k, v)| (Arc::new(k), Arc::new(v)))
        .collect();
    let distr_data: Vec<Vec<(Arc<String>, Arc<String>)>> = data
        .chunks(SPAM_INSERT / SPAM_TENANTS)
        .map(|chunk| {
            chunk
                .iter()
                .map(|(k, v)| (Arc::clone(k), Arc::clone(v)))
                .collect()
        })
        .collect();
    let threads: Vec<JoinHandle<_>> = distr_data
        .into_iter()
        .enumerate()
        .map(|(tid, this_data)| {
            let this_token = token.clone();
            let this_idx = idx.clone();
            thread::Builder::new()
                .name(tid.to_string())
                .spawn(move || {
                    let _token = this_token.read();
                    let g = cpin();
                    this_data.into_iter().for_each(|(k, v)| {
                        assert!(this_idx.insert(k, v, &g));
                    })
                })
                .unwrap()
        })
        .collect();
    // rush everyone to insert; superb intercore traffic
    drop(hold);
    let _x: Box<[()]> = threads
        .into_iter()
        .map(JoinHandle::join)
        .map(Result::unwrap)
        .collect();
    let pin = cpin();
    assert_eq!(idx.len(), SPAM_INSERT);
    data.into_iter().for_each(|(k, v)| {
        assert_eq!(idx.get(&k, &pin).unwrap().as_str(), v.as_str());
    });
}

#[test]
fn multispam_disjoint_interleaving() {
    const PER_TENANT: u32 = 2048;
    let idx = Arc::new(Map::<u32, u32>::new());
    let threads: Vec<JoinHandle<_>> = (0..4u32)
        .map(|tid| {
            let this_idx = idx.clone();
            thread::spawn(move || {
                let g = cpin();
                let base = tid * PER_TENANT;
                for i in base..base + PER_TENANT {
                    this_idx.upsert(i, i + 1, &g);
                }
                // remove every other key we own
                for i in (base..base + PER_TENANT).step_by(2) {
                    assert!(this_idx.remove(&i, &g));
                }
            })
        })
        .collect();
    threads.into_iter().for_each(|t| t.join().unwrap());
    let g = cpin();
    assert_eq!(idx.len(), 4 * PER_TENANT as usize / 2);
    for i in 0..4 * PER_TENANT {
        if i % 2 == 0 {
            assert!(idx.get(&i, &g).is_none());
        } else {
            assert_eq!(*idx.get(&i, &g).unwrap(), i + 1);
        }
    }
}

#[test]
fn multispam_snapshot_consistency() {
    const PER_TENANT: u32 = 1024;
    const TENANTS: u32 = 4;
    let idx = Arc::new(Map::<u32, u32>::new());
    let threads: Vec<JoinHandle<_>> = (0..TENANTS)
        .map(|tid| {
            let this_idx = idx.clone();
            thread::spawn(move || {
                let g = cpin();
                let base = tid * PER_TENANT;
                for i in base..base + PER_TENANT {
                    this_idx.upsert(i, i + 1, &g);
                }
            })
        })
        .collect();
    // every snapshot must be internally consistent while the writers hammer away
    for _ in 0..16 {
        let s = idx.frozen_snapshot();
        let g = cpin();
        let mut seen = 0usize;
        for (k, v) in s.iter_kv(&g) {
            assert_eq!(*v, *k + 1);
            seen += 1;
        }
        assert!(seen <= (TENANTS * PER_TENANT) as usize);
        assert_eq!(seen, s.len());
    }
    threads.into_iter().for_each(|t| t.join().unwrap());
    assert_eq!(idx.len(), (TENANTS * PER_TENANT) as usize);
}

#[test]
fn random_ops_match_oracle() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let idx = Map::<u16, u32>::new();
    let mut oracle: HashMap<u16, u32> = HashMap::new();
    let g = cpin();
    for _ in 0..10_000 {
        let k: u16 = rng.gen_range(0..512);
        if rng.gen_bool(0.6) {
            let v: u32 = rng.gen();
            idx.upsert(k, v, &g);
            oracle.insert(k, v);
        } else {
            assert_eq!(idx.remove(&k, &g), oracle.remove(&k).is_some());
        }
    }
    assert_eq!(idx.len(), oracle.len());
    for (k, v) in oracle.iter() {
        assert_eq!(idx.get(k, &g).unwrap(), v);
    }
}

#[test]
fn borrowed_key_probe() {
    let idx = Map::<String, u32>::new();
    let g = cpin();
    idx.upsert("hello".to_owned(), 1, &g);
    assert!(idx.contains_key("hello", &g));
    assert_eq!(*idx.get("hello", &g).unwrap(), 1);
    assert!(idx.remove("hello", &g));
}
