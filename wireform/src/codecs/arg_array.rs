//! The arg-array codec: fields are projected out by accessors on encode, and
//! decode collects the values into a positional bundle handed to the
//! user-supplied constructor. This is how immutable and externally
//! constructed types (dates, offsets, wrappers without setters) are rebuilt.

use std::any::Any;

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_ref};
use crate::schema::{ArgSchema, Args};

type Ctor<T> = Box<dyn Fn(Args) -> Result<T, CodecError> + Send + Sync>;

pub(crate) struct ArgArrayCodec<T, F: Format> {
    id: String,
    fields: Vec<ArgSchema<T, F>>,
    ctor: Ctor<T>,
}

impl<T, F: Format> ArgArrayCodec<T, F> {
    pub(crate) fn new(id: String, fields: Vec<ArgSchema<T, F>>, ctor: Ctor<T>) -> Self {
        Self { id, fields, ctor }
    }
}

impl<T: Any + Send + Sync, F: Format> ValueCodec<F> for ArgArrayCodec<T, F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let v = expect_ref::<T>(&self.id, value)?;
        F::record_begin(w, self.fields.len())?;
        for field in &self.fields {
            F::record_field(w, &field.name)?;
            (field.encode)(v, core, w)?;
        }
        F::record_end(w)
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        F::record_begin_read(r)?;
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            F::record_field_read(r, &field.name)?;
            values.push(Some((field.decode)(core, r)?));
        }
        F::record_end_read(r)?;
        let args = Args::new(self.id.clone(), values);
        (self.ctor)(args).map(|v| Box::new(v) as DynValue)
    }
}
