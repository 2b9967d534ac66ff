/*
 * Created on Thu Jun 18 2026
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

/*
    Persistence goes through a frozen fork: the read-only flag first, then every entry as a
    (key, value) pair. Restoring rebuilds a fresh map by reinserting the entries and freezes
    it again if the flag said so; nothing about the trie's internal shape is persisted.
*/

use {
    super::{
        imp::{FrozenTrieMap, TrieMap},
        meta::{Config, DefConfig, TreeElement},
        RawTree,
    },
    crate::sync::atm::cpin,
    core::{fmt, marker::PhantomData},
    serde::{
        de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor},
        ser::{SerializeSeq, SerializeStruct},
        Deserialize, Deserializer, Serialize, Serializer,
    },
};

const SER_NAME: &str = "TrieMap";
const SER_FIELDS: &[&str] = &["read_only", "entries"];

/// What a persisted trie restores into: the map is rebuilt mutable and refrozen when the
/// persisted read-only flag was set
pub enum Restored<T: TreeElement, C: Config = DefConfig> {
    Mutable(TrieMap<T, C>),
    Frozen(FrozenTrieMap<T, C>),
}

impl<T: TreeElement, C: Config> Restored<T, C> {
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }
    pub fn into_mutable(self) -> Option<TrieMap<T, C>> {
        match self {
            Self::Mutable(m) => Some(m),
            Self::Frozen(_) => None,
        }
    }
    pub fn into_frozen(self) -> Option<FrozenTrieMap<T, C>> {
        match self {
            Self::Frozen(f) => Some(f),
            Self::Mutable(_) => None,
        }
    }
}

struct Entries<'a, T: TreeElement, C: Config>(&'a RawTree<T, C>);

impl<'a, T, C> Serialize for Entries<'a, T, C>
where
    T: TreeElement,
    T::Key: Serialize,
    T::Value: Serialize,
    C: Config,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let g = cpin();
        let mut seq = serializer.serialize_seq(Some(self.0.count(&g)))?;
        for kv in self.0.iter_kv(&g) {
            seq.serialize_element(&kv)?;
        }
        seq.end()
    }
}

fn serialize_parts<S, T, C>(
    read_only: bool,
    t: &RawTree<T, C>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: TreeElement,
    T::Key: Serialize,
    T::Value: Serialize,
    C: Config,
{
    let mut st = serializer.serialize_struct(SER_NAME, 2)?;
    st.serialize_field(SER_FIELDS[0], &read_only)?;
    st.serialize_field(SER_FIELDS[1], &Entries(t))?;
    st.end()
}

impl<T, C> Serialize for TrieMap<T, C>
where
    T: TreeElement,
    T::Key: Serialize,
    T::Value: Serialize,
    C: Config,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // persist a frozen fork, not the live trie
        let frozen = self.frozen_snapshot();
        serialize_parts(false, &frozen.t, serializer)
    }
}

impl<T, C> Serialize for FrozenTrieMap<T, C>
where
    T: TreeElement,
    T::Key: Serialize,
    T::Value: Serialize,
    C: Config,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_parts(true, &self.t, serializer)
    }
}

enum Field {
    ReadOnly,
    Entries,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;
        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = Field;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("`read_only` or `entries`")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Field, E> {
                match v {
                    "read_only" => Ok(Field::ReadOnly),
                    "entries" => Ok(Field::Entries),
                    _ => Err(de::Error::unknown_field(v, SER_FIELDS)),
                }
            }
        }
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

/// Streams the persisted entries straight into the map being rebuilt
struct EntriesSeed<'a, T: TreeElement, C: Config>(&'a TrieMap<T, C>);

impl<'de, 'a, T, C> DeserializeSeed<'de> for EntriesSeed<'a, T, C>
where
    T: TreeElement,
    T::Key: Deserialize<'de>,
    T::Value: Deserialize<'de>,
    C: Config,
{
    type Value = ();
    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a, T, C> Visitor<'de> for EntriesSeed<'a, T, C>
where
    T: TreeElement,
    T::Key: Deserialize<'de>,
    T::Value: Deserialize<'de>,
    C: Config,
{
    type Value = ();
    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence of (key, value) entries")
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let g = cpin();
        while let Some((k, v)) = seq.next_element::<(T::Key, T::Value)>()? {
            self.0.upsert(k, v, &g);
        }
        Ok(())
    }
}

struct RestoredVisitor<T, C> {
    _m: PhantomData<(T, C)>,
}

impl<T: TreeElement, C: Config> RestoredVisitor<T, C> {
    fn finish(read_only: bool, map: TrieMap<T, C>) -> Restored<T, C> {
        if read_only {
            Restored::Frozen(map.frozen_snapshot())
        } else {
            Restored::Mutable(map)
        }
    }
}

impl<'de, T, C> Visitor<'de> for RestoredVisitor<T, C>
where
    T: TreeElement,
    T::Key: Deserialize<'de>,
    T::Value: Deserialize<'de>,
    C: Config,
{
    type Value = Restored<T, C>;
    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a read-only flag followed by a sequence of entries")
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let read_only: bool = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let map = TrieMap::new();
        seq.next_element_seed(EntriesSeed(&map))?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok(Self::finish(read_only, map))
    }
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut read_only: Option<bool> = None;
        let mut has_entries = false;
        let map = TrieMap::new();
        while let Some(field) = access.next_key::<Field>()? {
            match field {
                Field::ReadOnly => {
                    if read_only.is_some() {
                        return Err(de::Error::duplicate_field(SER_FIELDS[0]));
                    }
                    read_only = Some(access.next_value()?);
                }
                Field::Entries => {
                    if has_entries {
                        return Err(de::Error::duplicate_field(SER_FIELDS[1]));
                    }
                    access.next_value_seed(EntriesSeed(&map))?;
                    has_entries = true;
                }
            }
        }
        let read_only = read_only.ok_or_else(|| de::Error::missing_field(SER_FIELDS[0]))?;
        if !has_entries {
            return Err(de::Error::missing_field(SER_FIELDS[1]));
        }
        Ok(Self::finish(read_only, map))
    }
}

impl<'de, T, C> Deserialize<'de> for Restored<T, C>
where
    T: TreeElement,
    T::Key: Deserialize<'de>,
    T::Value: Deserialize<'de>,
    C: Config,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct(
            SER_NAME,
            SER_FIELDS,
            RestoredVisitor { _m: PhantomData },
        )
    }
}
