//! Map codecs.
//!
//! Maps keyed by `String` take the fast path: entries become record fields
//! (JSON/XML) or length-prefixed key strings (binary). Every other key type
//! encodes entries as two-field records named by the configured entry
//! key/value names. Decoding always goes through a [`MapAccumulator`], so a
//! sorted container is built from the accumulated entries only at construct
//! time.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codec::{SharedCodec, ValueCodec};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned, expect_ref};

/// A concrete map container a map codec can target.
pub trait MapContainer<K, V>: Any + Send + Sync {
    fn from_entries(entries: Vec<(K, V)>) -> Self;
    fn len(&self) -> usize;
    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_>;
}

impl<K, V> MapContainer<K, V> for HashMap<K, V>
where
    K: Any + Send + Sync + Eq + Hash,
    V: Any + Send + Sync,
{
    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

impl<K, V> MapContainer<K, V> for BTreeMap<K, V>
where
    K: Any + Send + Sync + Ord,
    V: Any + Send + Sync,
{
    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_entries(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

/// The decode-side map proxy: entries land in insertion order and the
/// concrete map is materialized once at construct time. The accumulator is
/// owned by the decoding call frame and discarded afterwards.
pub struct MapAccumulator<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> MapAccumulator<K, V> {
    pub fn with_len_hint(len: usize) -> Self {
        Self {
            entries: Vec::with_capacity(len),
        }
    }

    pub fn put(&mut self, key: K, value: V) {
        self.entries.push((key, value));
    }

    pub fn construct<M: MapContainer<K, V>>(self) -> M {
        M::from_entries(self.entries)
    }
}

pub struct MapCodec<M, K, V, F: Format> {
    id: String,
    key: SharedCodec<F>,
    value: SharedCodec<F>,
    string_keys: bool,
    _marker: PhantomData<fn() -> (M, K, V)>,
}

impl<M, K: Any, V, F: Format> MapCodec<M, K, V, F> {
    pub(crate) fn new(id: String, key: SharedCodec<F>, value: SharedCodec<F>) -> Self {
        Self {
            id,
            key,
            value,
            string_keys: TypeId::of::<K>() == TypeId::of::<String>(),
            _marker: PhantomData,
        }
    }
}

impl<M, K, V, F> ValueCodec<F> for MapCodec<M, K, V, F>
where
    M: MapContainer<K, V>,
    K: Any + Send + Sync,
    V: Any + Send + Sync,
    F: Format,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let map = expect_ref::<M>(&self.id, value)?;
        if self.string_keys {
            F::map_begin(w, map.len())?;
            for (k, v) in map.iter_entries() {
                let key_any: &dyn Any = k;
                let key = key_any.downcast_ref::<String>().ok_or_else(|| {
                    CodecError::reflection(&self.id, "string-keyed map holds a non-string key")
                })?;
                F::map_key(w, key)?;
                self.value.encode_value(core, v, w)?;
            }
            F::map_end(w)
        } else {
            let names = core.config().names();
            F::entries_begin(w, map.len(), names)?;
            for (k, v) in map.iter_entries() {
                F::entry_begin(w, names)?;
                F::entry_key(w, names)?;
                self.key.encode_value(core, k, w)?;
                F::entry_value(w, names)?;
                self.value.encode_value(core, v, w)?;
                F::entry_end(w, names)?;
            }
            F::entries_end(w, names)
        }
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        if self.string_keys {
            let len = F::map_begin_read(r)?;
            let mut acc = MapAccumulator::<K, V>::with_len_hint(len);
            for _ in 0..len {
                let key = F::map_key_read(r)?;
                let key = expect_owned::<K>(&self.id, Box::new(key) as DynValue)?;
                let value = self.value.decode_value(core, r)?;
                acc.put(key, expect_owned::<V>(&self.id, value)?);
            }
            F::map_end_read(r)?;
            Ok(Box::new(acc.construct::<M>()) as DynValue)
        } else {
            let names = core.config().names();
            let len = F::entries_begin_read(r, names)?;
            let mut acc = MapAccumulator::<K, V>::with_len_hint(len);
            for _ in 0..len {
                F::entry_begin_read(r, names)?;
                F::entry_key_read(r, names)?;
                let key = self.key.decode_value(core, r)?;
                F::entry_value_read(r, names)?;
                let value = self.value.decode_value(core, r)?;
                F::entry_end_read(r, names)?;
                acc.put(
                    expect_owned::<K>(&self.id, key)?,
                    expect_owned::<V>(&self.id, value)?,
                );
            }
            F::entries_end_read(r, names)?;
            Ok(Box::new(acc.construct::<M>()) as DynValue)
        }
    }
}
