//! Sequence codecs, generic over the element codec and the concrete
//! container. Iteration order is preserved on the wire and the byte format
//! relies on it.

use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::codec::{SharedCodec, ValueCodec};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned, expect_ref};

/// A concrete ordered container a sequence codec can target.
pub trait SeqContainer<E>: Any + Send + Sync {
    fn with_len_hint(len: usize) -> Self;
    fn add(&mut self, elem: E);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_>;
}

impl<E: Any + Send + Sync> SeqContainer<E> for Vec<E> {
    fn with_len_hint(len: usize) -> Self {
        Self::with_capacity(len)
    }

    fn add(&mut self, elem: E) {
        self.push(elem);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

impl<E: Any + Send + Sync> SeqContainer<E> for VecDeque<E> {
    fn with_len_hint(len: usize) -> Self {
        Self::with_capacity(len)
    }

    fn add(&mut self, elem: E) {
        self.push_back(elem);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter_elems(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }
}

pub struct SeqCodec<C, E, F: Format> {
    id: String,
    elem: SharedCodec<F>,
    _marker: PhantomData<fn() -> (C, E)>,
}

impl<C, E, F: Format> SeqCodec<C, E, F> {
    pub(crate) fn new(id: String, elem: SharedCodec<F>) -> Self {
        Self {
            id,
            elem,
            _marker: PhantomData,
        }
    }
}

impl<C, E, F> ValueCodec<F> for SeqCodec<C, E, F>
where
    C: SeqContainer<E>,
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
        let seq = expect_ref::<C>(&self.id, value)?;
        F::seq_begin(w, seq.len())?;
        for (index, elem) in seq.iter_elems().enumerate() {
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
        let mut out = C::with_len_hint(len);
        for index in 0..len {
            F::seq_elem_read(r, index)?;
            let elem = self.elem.decode_value(core, r)?;
            out.add(expect_owned::<E>(&self.id, elem)?);
        }
        F::seq_end_read(r)?;
        Ok(Box::new(out) as DynValue)
    }
}
