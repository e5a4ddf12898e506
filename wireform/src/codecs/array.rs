//! Array codecs: immutable `Box<[E]>` slices built by collecting decoded
//! elements, plus the raw byte fast path for `Vec<u8>`.

use std::any::Any;
use std::marker::PhantomData;

use crate::codec::{SharedCodec, ValueCodec};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned, expect_ref};

pub struct ArrayCodec<E, F: Format> {
    id: String,
    elem: SharedCodec<F>,
    _marker: PhantomData<fn() -> E>,
}

impl<E, F: Format> ArrayCodec<E, F> {
    pub(crate) fn new(id: String, elem: SharedCodec<F>) -> Self {
        Self {
            id,
            elem,
            _marker: PhantomData,
        }
    }
}

impl<E: Any + Send + Sync, F: Format> ValueCodec<F> for ArrayCodec<E, F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let array = expect_ref::<Box<[E]>>(&self.id, value)?;
        F::seq_begin(w, array.len())?;
        for (index, elem) in array.iter().enumerate() {
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
        let mut elems = Vec::with_capacity(len);
        for index in 0..len {
            F::seq_elem_read(r, index)?;
            let elem = self.elem.decode_value(core, r)?;
            elems.push(expect_owned::<E>(&self.id, elem)?);
        }
        F::seq_end_read(r)?;
        Ok(Box::new(elems.into_boxed_slice()) as DynValue)
    }
}

/// The `Vec<u8>` fast path (identifier `Array<u8>`): formats may override
/// the byte hooks to carry the payload raw.
pub struct ByteArrayCodec;

impl<F: Format> ValueCodec<F> for ByteArrayCodec {
    fn id(&self) -> &str {
        "Array<u8>"
    }

    fn encode_value(
        &self,
        _core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let bytes = expect_ref::<Vec<u8>>("Array<u8>", value)?;
        F::write_bytes(w, bytes)
    }

    fn decode_value(
        &self,
        _core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        F::read_bytes(r).map(|bytes| Box::new(bytes) as DynValue)
    }
}
