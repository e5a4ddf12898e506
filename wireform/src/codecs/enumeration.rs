//! Fieldless enums, encoded by variant name through the format's string
//! codec.

use std::any::Any;

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_ref};

pub struct EnumCodec<T> {
    id: String,
    variants: Vec<(String, T)>,
}

impl<T> EnumCodec<T> {
    pub(crate) fn new(
        id: String,
        variants: impl IntoIterator<Item = (&'static str, T)>,
    ) -> Self {
        Self {
            id,
            variants: variants
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl<T, F> ValueCodec<F> for EnumCodec<T>
where
    T: Any + Send + Sync + PartialEq + Clone,
    F: Format,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn encode_value(
        &self,
        _core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let v = expect_ref::<T>(&self.id, value)?;
        let name = self
            .variants
            .iter()
            .find(|(_, variant)| variant == v)
            .map(|(name, _)| name)
            .ok_or_else(|| {
                CodecError::reflection(&self.id, "value is not a registered variant")
            })?;
        F::write_str(w, name)
    }

    fn decode_value(
        &self,
        _core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        let s = F::read_string(r)?;
        self.variants
            .iter()
            .find(|(name, _)| name == &s)
            .map(|(_, variant)| Box::new(variant.clone()) as DynValue)
            .ok_or_else(|| CodecError::schema(&self.id, format!("unknown variant `{s}`")))
    }
}
