//! Set codecs. A set shares the sequence wire shape; the concrete container
//! decides membership semantics on decode.

use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codec::{SharedCodec, ValueCodec};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned, expect_ref};

/// A concrete set container a set codec can target.
pub trait SetContainer<E>: Any + Send + Sync {
    fn empty() -> Self;
    fn add(&mut self, elem: E);
    fn len(&self) -> usize;
    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_>;
}

impl<E: Any + Send + Sync + Eq + Hash> SetContainer<E> for HashSet<E> {
    fn empty() -> Self {
        Self::new()
    }

    fn add(&mut self, elem: E) {
        self.insert(elem);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

impl<E: Any + Send + Sync + Ord> SetContainer<E> for BTreeSet<E> {
    fn empty() -> Self {
        Self::new()
    }

    fn add(&mut self, elem: E) {
        self.insert(elem);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

pub struct SetCodec<S, E, F: Format> {
    id: String,
    elem: SharedCodec<F>,
    _marker: PhantomData<fn() -> (S, E)>,
}

impl<S, E, F: Format> SetCodec<S, E, F> {
    pub(crate) fn new(id: String, elem: SharedCodec<F>) -> Self {
        Self {
            id,
            elem,
            _marker: PhantomData,
        }
    }
}

impl<S, E, F> ValueCodec<F> for SetCodec<S, E, F>
where
    S: SetContainer<E>,
    E: Any + Send + Sync,
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
        let set = expect_ref::<S>(&self.id, value)?;
        F::seq_begin(w, set.len())?;
        for (index, elem) in set.iter_elems().enumerate() {
            F::seq_elem(w, index)?;
            self.elem.encode_value(core, elem, w)?;
        }
        F::seq_end(w)
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        let len = F::seq_begin_read(r)?;
        let mut out = S::empty();
        for index in 0..len {
            F::seq_elem_read(r, index)?;
            let elem = self.elem.decode_value(core, r)?;
            out.add(expect_owned::<E>(&self.id, elem)?);
        }
        F::seq_end_read(r)?;
        Ok(Box::new(out) as DynValue)
    }
}
