//! The codec abstraction and the declared-type combinators.
//!
//! A [`ValueCodec`] pairs a target identifier with an encode and a decode
//! operation against one format family. Codecs are pure with respect to the
//! core and the streams: they hold no mutable state beyond construction
//! parameters (nested codecs resolve lazily and cache in a `OnceLock`).
//!
//! The free functions in this module build [`FieldType`] tokens: declared
//! types for fields and top-level calls. `of::<V>()` names a registered type;
//! the collection combinators ([`seq`], [`set`], [`map`], [`array`],
//! [`optional`], …) materialize the matching codec family on first use;
//! [`dynamic`] declares a polymorphic slot.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use crate::codecs::array::ArrayCodec;
use crate::codecs::dynamic::DynamicCodec;
use crate::codecs::map::MapCodec;
use crate::codecs::option::OptionCodec;
use crate::codecs::seq::SeqCodec;
use crate::codecs::set::SetCodec;
use crate::config::{MapKind, SeqKind, SetKind};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::name;
use crate::reflect::{DynValue, Reflected};

/// A codec for one target type against one format family.
///
/// `encode_value` borrows the value and the writer for the duration of the
/// call; `decode_value` returns the reconstructed value with its type erased.
/// Both receive the core so nested codecs can be resolved through the
/// registry.
pub trait ValueCodec<F: Format>: Send + Sync {
    /// The canonical identifier of the target type.
    fn id(&self) -> &str;

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError>;

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError>;
}

pub type SharedCodec<F> = Arc<dyn ValueCodec<F>>;

type BuildFn<F> =
    dyn Fn(&CodecCore<F>) -> Result<SharedCodec<F>, CodecError> + Send + Sync;

/// A declared type: a lazily-resolved handle on the codec for some Rust type
/// `V`.
///
/// Resolution happens at first encode/decode, never at registration, so a
/// field whose type cannot be served fails with
/// [`CodecError::UnknownType`] only when it is actually exercised.
pub struct FieldType<V, F: Format> {
    describe: String,
    build: Arc<BuildFn<F>>,
    cache: OnceLock<SharedCodec<F>>,
    _marker: PhantomData<fn() -> V>,
}

impl<V, F: Format> FieldType<V, F> {
    pub(crate) fn new(
        describe: impl Into<String>,
        build: impl Fn(&CodecCore<F>) -> Result<SharedCodec<F>, CodecError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            describe: describe.into(),
            build: Arc::new(build),
            cache: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    /// A human-readable description of the declared type, used in errors
    /// before the codec has been resolved.
    pub fn describe(&self) -> &str {
        &self.describe
    }

    /// Resolves the codec, materializing it on first use. Losers of a
    /// resolution race discard their candidate and adopt the winner.
    pub(crate) fn resolve(&self, core: &CodecCore<F>) -> Result<SharedCodec<F>, CodecError> {
        if let Some(codec) = self.cache.get() {
            return Ok(codec.clone());
        }
        let codec = (self.build)(core)?;
        let _ = self.cache.set(codec.clone());
        Ok(self.cache.get().cloned().unwrap_or(codec))
    }
}

impl<V, F: Format> Clone for FieldType<V, F> {
    fn clone(&self) -> Self {
        Self {
            describe: self.describe.clone(),
            build: self.build.clone(),
            cache: self.cache.clone(),
            _marker: PhantomData,
        }
    }
}

/// Declares a plain registered type. Resolution looks the type up by its
/// `TypeId`; an unregistered type surfaces [`CodecError::UnknownType`] at
/// first use.
pub fn of<V, F>() -> FieldType<V, F>
where
    V: Any + Send + Sync,
    F: Format,
{
    FieldType::new(std::any::type_name::<V>(), |core| {
        core.registry()
            .typed_codec(TypeId::of::<V>())
            .ok_or_else(|| {
                CodecError::unknown(std::any::type_name::<V>(), "resolving a declared type")
            })
    })
}

/// Declares a growable sequence `Vec<E>` (`List<E>` on the wire).
pub fn seq<E, F>(elem: FieldType<E, F>) -> FieldType<Vec<E>, F>
where
    E: Any + Send + Sync,
    F: Format,
{
    FieldType::new(format!("List<{}>", elem.describe()), move |core| {
        let elem_codec = elem.resolve(core)?;
        let id = name::seq(elem_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<Vec<E>>(), &id, || {
                Arc::new(SeqCodec::<Vec<E>, E, F>::new(id.clone(), elem_codec.clone()))
            });
        let binding: SharedCodec<F> = match core.config().default_seq() {
            SeqKind::Growable => codec.clone(),
            SeqKind::Deque => Arc::new(SeqCodec::<VecDeque<E>, E, F>::new(
                id.clone(),
                elem_codec,
            )),
        };
        core.registry().bind(&id, binding);
        Ok(codec)
    })
}

/// Declares a double-ended sequence `VecDeque<E>` (`Deque<E>`, written to the
/// wire as `List<E>` through the container proxy).
pub fn deque<E, F>(elem: FieldType<E, F>) -> FieldType<VecDeque<E>, F>
where
    E: Any + Send + Sync,
    F: Format,
{
    FieldType::new(format!("Deque<{}>", elem.describe()), move |core| {
        let elem_codec = elem.resolve(core)?;
        let id = name::deque(elem_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<VecDeque<E>>(), &id, || {
                Arc::new(SeqCodec::<VecDeque<E>, E, F>::new(
                    id.clone(),
                    elem_codec.clone(),
                ))
            });
        let list_id = name::seq(elem_codec.id());
        let binding: SharedCodec<F> = match core.config().default_seq() {
            SeqKind::Growable => Arc::new(SeqCodec::<Vec<E>, E, F>::new(
                list_id.clone(),
                elem_codec,
            )),
            SeqKind::Deque => Arc::new(SeqCodec::<VecDeque<E>, E, F>::new(
                list_id.clone(),
                elem_codec,
            )),
        };
        core.registry().bind(&list_id, binding);
        Ok(codec)
    })
}

/// Declares a hashed set `HashSet<E>` (`Set<E>` on the wire).
///
/// Set elements must be `Eq + Hash + Ord` so either concrete kind can own
/// the abstract identifier.
pub fn set<E, F>(elem: FieldType<E, F>) -> FieldType<HashSet<E>, F>
where
    E: Any + Send + Sync + Eq + Hash + Ord,
    F: Format,
{
    FieldType::new(format!("Set<{}>", elem.describe()), move |core| {
        let elem_codec = elem.resolve(core)?;
        let id = name::set(elem_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<HashSet<E>>(), &id, || {
                Arc::new(SetCodec::<HashSet<E>, E, F>::new(id.clone(), elem_codec.clone()))
            });
        let binding: SharedCodec<F> = match core.config().default_set() {
            SetKind::Hashed => codec.clone(),
            SetKind::Sorted => Arc::new(SetCodec::<BTreeSet<E>, E, F>::new(
                id.clone(),
                elem_codec,
            )),
        };
        core.registry().bind(&id, binding);
        Ok(codec)
    })
}

/// Declares a sorted set `BTreeSet<E>` (`SortedSet<E>`, written as `Set<E>`
/// through the container proxy).
pub fn sorted_set<E, F>(elem: FieldType<E, F>) -> FieldType<BTreeSet<E>, F>
where
    E: Any + Send + Sync + Eq + Hash + Ord,
    F: Format,
{
    FieldType::new(format!("SortedSet<{}>", elem.describe()), move |core| {
        let elem_codec = elem.resolve(core)?;
        let id = name::sorted_set(elem_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<BTreeSet<E>>(), &id, || {
                Arc::new(SetCodec::<BTreeSet<E>, E, F>::new(id.clone(), elem_codec.clone()))
            });
        let set_id = name::set(elem_codec.id());
        let binding: SharedCodec<F> = match core.config().default_set() {
            SetKind::Hashed => Arc::new(SetCodec::<HashSet<E>, E, F>::new(
                set_id.clone(),
                elem_codec,
            )),
            SetKind::Sorted => Arc::new(SetCodec::<BTreeSet<E>, E, F>::new(
                set_id.clone(),
                elem_codec,
            )),
        };
        core.registry().bind(&set_id, binding);
        Ok(codec)
    })
}

/// Declares a hashed map `HashMap<K, V>` (`Map<K,V>` on the wire).
///
/// Maps with `String` keys take the string-keyed fast path: entries become
/// record fields keyed by the map key. Any other key type encodes entries as
/// two-field records. Keys must be `Eq + Hash + Ord` so either concrete kind
/// can own the abstract identifier.
pub fn map<K, V, F>(key: FieldType<K, F>, value: FieldType<V, F>) -> FieldType<HashMap<K, V>, F>
where
    K: Any + Send + Sync + Eq + Hash + Ord,
    V: Any + Send + Sync,
    F: Format,
{
    let describe = format!("Map<{},{}>", key.describe(), value.describe());
    FieldType::new(describe, move |core| {
        let key_codec = key.resolve(core)?;
        let value_codec = value.resolve(core)?;
        let id = name::map(key_codec.id(), value_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<HashMap<K, V>>(), &id, || {
                Arc::new(MapCodec::<HashMap<K, V>, K, V, F>::new(
                    id.clone(),
                    key_codec.clone(),
                    value_codec.clone(),
                ))
            });
        let binding: SharedCodec<F> = match core.config().default_map() {
            MapKind::Hashed => codec.clone(),
            MapKind::Sorted => Arc::new(MapCodec::<BTreeMap<K, V>, K, V, F>::new(
                id.clone(),
                key_codec,
                value_codec,
            )),
        };
        core.registry().bind(&id, binding);
        Ok(codec)
    })
}

/// Declares a sorted map `BTreeMap<K, V>` (`SortedMap<K,V>`, written as
/// `Map<K,V>` through the container proxy).
pub fn sorted_map<K, V, F>(
    key: FieldType<K, F>,
    value: FieldType<V, F>,
) -> FieldType<BTreeMap<K, V>, F>
where
    K: Any + Send + Sync + Eq + Hash + Ord,
    V: Any + Send + Sync,
    F: Format,
{
    let describe = format!("SortedMap<{},{}>", key.describe(), value.describe());
    FieldType::new(describe, move |core| {
        let key_codec = key.resolve(core)?;
        let value_codec = value.resolve(core)?;
        let id = name::sorted_map(key_codec.id(), value_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<BTreeMap<K, V>>(), &id, || {
                Arc::new(MapCodec::<BTreeMap<K, V>, K, V, F>::new(
                    id.clone(),
                    key_codec.clone(),
                    value_codec.clone(),
                ))
            });
        let map_id = name::map(key_codec.id(), value_codec.id());
        let binding: SharedCodec<F> = match core.config().default_map() {
            MapKind::Hashed => Arc::new(MapCodec::<HashMap<K, V>, K, V, F>::new(
                map_id.clone(),
                key_codec,
                value_codec,
            )),
            MapKind::Sorted => Arc::new(MapCodec::<BTreeMap<K, V>, K, V, F>::new(
                map_id.clone(),
                key_codec,
                value_codec,
            )),
        };
        core.registry().bind(&map_id, binding);
        Ok(codec)
    })
}

/// Declares an immutable array `Box<[E]>` (`Array<E>` on the wire), built on
/// decode by collecting the elements and converting.
pub fn array<E, F>(elem: FieldType<E, F>) -> FieldType<Box<[E]>, F>
where
    E: Any + Send + Sync,
    F: Format,
{
    FieldType::new(format!("Array<{}>", elem.describe()), move |core| {
        let elem_codec = elem.resolve(core)?;
        let id = name::array(elem_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<Box<[E]>>(), &id, || {
                Arc::new(ArrayCodec::<E, F>::new(id.clone(), elem_codec.clone()))
            });
        core.registry().bind(&id, codec.clone());
        Ok(codec)
    })
}

/// Declares a nullable slot `Option<E>`. `None` writes the format's null
/// marker and short-circuits everything else, including type tags.
pub fn optional<E, F>(inner: FieldType<E, F>) -> FieldType<Option<E>, F>
where
    E: Any + Send + Sync,
    F: Format,
{
    FieldType::new(format!("Option<{}>", inner.describe()), move |core| {
        let inner_codec = inner.resolve(core)?;
        let id = name::optional(inner_codec.id());
        let codec = core
            .registry()
            .typed_or_insert(TypeId::of::<Option<E>>(), &id, || {
                Arc::new(OptionCodec::<E, F>::new(id.clone(), inner_codec.clone()))
            });
        Ok(codec)
    })
}

/// Declares a polymorphic slot holding a [`DynValue`]. The encoder writes
/// the runtime value's identifier as a type tag; the decoder resolves the
/// tag through the alias table, the proxy table, and the allow-list.
pub fn dynamic<F: Format>() -> FieldType<DynValue, F> {
    FieldType::new(name::DYNAMIC, |_core| {
        Ok(Arc::new(DynamicCodec) as SharedCodec<F>)
    })
}
