//! The codec cache: canonical identifier to codec, plus a `TypeId` index for
//! the encode side.
//!
//! Lookups are lock-free reads; materialization is insert-if-absent with
//! losers discarding their candidate, so concurrent lookups for the same key
//! always converge on a single codec instance. Before the first
//! encode/decode (the bootstrap window) the last registration for a key
//! wins; afterwards insertions are monotone and codecs are never replaced.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::codec::SharedCodec;
use crate::format::Format;

struct TypedEntry<F: Format> {
    id: String,
    codec: SharedCodec<F>,
}

pub(crate) struct Registry<F: Format> {
    by_id: DashMap<String, SharedCodec<F>>,
    by_type: DashMap<TypeId, TypedEntry<F>>,
    sealed: AtomicBool,
}

impl<F: Format> Registry<F> {
    pub(crate) fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_type: DashMap::new(),
            sealed: AtomicBool::new(false),
        }
    }

    /// Ends the bootstrap window. Called on the first encode/decode.
    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Registers a codec for a concrete Rust type under its canonical
    /// identifier, covering both the encode-side `TypeId` index and the
    /// decode-side identifier binding.
    pub(crate) fn register(&self, type_id: TypeId, codec: SharedCodec<F>) {
        let id = codec.id().to_string();
        debug!(id = %id, "registering codec");
        if self.is_sealed() {
            self.by_type.entry(type_id).or_insert_with(|| TypedEntry {
                id: id.clone(),
                codec: codec.clone(),
            });
            self.by_id.entry(id).or_insert(codec);
        } else {
            // Bootstrap: the last registration for a key wins.
            self.by_type.insert(
                type_id,
                TypedEntry {
                    id: id.clone(),
                    codec: codec.clone(),
                },
            );
            self.by_id.insert(id, codec);
        }
    }

    /// The codec bound to an identifier, if any.
    pub(crate) fn lookup(&self, id: &str) -> Option<SharedCodec<F>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    /// The codec registered for a concrete Rust type, if any.
    pub(crate) fn typed_codec(&self, type_id: TypeId) -> Option<SharedCodec<F>> {
        self.by_type.get(&type_id).map(|entry| entry.codec.clone())
    }

    /// The canonical identifier and codec registered for a concrete Rust
    /// type, if any.
    pub(crate) fn typed_entry(&self, type_id: TypeId) -> Option<(String, SharedCodec<F>)> {
        self.by_type
            .get(&type_id)
            .map(|entry| (entry.id.clone(), entry.codec.clone()))
    }

    /// Returns the codec indexed for a concrete Rust type, materializing and
    /// indexing a new one if the type has not been seen. The constructor runs
    /// without any shard lock held; a concurrent loser discards its candidate
    /// and adopts the winner.
    pub(crate) fn typed_or_insert(
        &self,
        type_id: TypeId,
        id: &str,
        make: impl FnOnce() -> SharedCodec<F>,
    ) -> SharedCodec<F> {
        if let Some(codec) = self.typed_codec(type_id) {
            return codec;
        }
        let candidate = make();
        debug!(id = %id, "materialized codec");
        match self.by_type.entry(type_id) {
            Entry::Occupied(entry) => entry.get().codec.clone(),
            Entry::Vacant(entry) => {
                entry.insert(TypedEntry {
                    id: id.to_string(),
                    codec: candidate.clone(),
                });
                candidate
            }
        }
    }

    /// Binds an identifier to a decode codec if it is not already bound.
    /// During bootstrap the binding may still be replaced by a later
    /// registration; afterwards the first binding sticks.
    pub(crate) fn bind(&self, id: &str, codec: SharedCodec<F>) {
        match self.by_id.entry(id.to_string()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(codec);
            }
        }
    }
}
