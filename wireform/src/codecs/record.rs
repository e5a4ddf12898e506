//! The product codec: emits fields in declaration order, decodes into an
//! instance from the no-argument constructor. Named formats read fields back
//! by name; the byte format walks the schema in the same order used during
//! encode.

use std::any::Any;

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_ref};
use crate::schema::FieldSchema;

pub(crate) struct RecordCodec<T, F: Format> {
    id: String,
    fields: Vec<FieldSchema<T, F>>,
    ctor: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T, F: Format> RecordCodec<T, F> {
    pub(crate) fn new(
        id: String,
        fields: Vec<FieldSchema<T, F>>,
        ctor: Box<dyn Fn() -> T + Send + Sync>,
    ) -> Self {
        Self { id, fields, ctor }
    }
}

impl<T: Any + Send + Sync, F: Format> ValueCodec<F> for RecordCodec<T, F> {
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
        let mut v = (self.ctor)();
        F::record_begin_read(r)?;
        for field in &self.fields {
            F::record_field_read(r, &field.name)?;
            (field.decode)(&mut v, core, r)?;
        }
        F::record_end_read(r)?;
        Ok(Box::new(v) as DynValue)
    }
}
