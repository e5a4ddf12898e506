//! Null handling. `None` writes the format's null marker and returns before
//! anything else would be written, type tags included; the decoder peeks for
//! the marker symmetrically.

use std::any::Any;
use std::marker::PhantomData;

use crate::codec::{SharedCodec, ValueCodec};
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned, expect_ref};

pub struct OptionCodec<E, F: Format> {
    id: String,
    inner: SharedCodec<F>,
    _marker: PhantomData<fn() -> E>,
}

impl<E, F: Format> OptionCodec<E, F> {
    pub(crate) fn new(id: String, inner: SharedCodec<F>) -> Self {
        Self {
            id,
            inner,
            _marker: PhantomData,
        }
    }
}

impl<E: Any + Send + Sync, F: Format> ValueCodec<F> for OptionCodec<E, F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let v = expect_ref::<Option<E>>(&self.id, value)?;
        match v {
            None => F::write_null(w, core.config().names()),
            Some(inner) => {
                F::write_present(w)?;
                self.inner.encode_value(core, inner, w)
            }
        }
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        if !F::read_present(r, core.config().names())? {
            return Ok(Box::new(None::<E>) as DynValue);
        }
        let inner = self.inner.decode_value(core, r)?;
        let inner = expect_owned::<E>(&self.id, inner)?;
        Ok(Box::new(Some(inner)) as DynValue)
    }
}
