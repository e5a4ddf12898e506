//! Codecs that route a type through a round-tripping string projection,
//! deferring to the format's string codec on both sides.

use std::any::Any;

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, TypeRef, expect_ref};

pub struct StringProxyCodec<T> {
    id: String,
    to_string: fn(&T) -> String,
    from_str: fn(&str) -> Result<T, String>,
}

impl<T> StringProxyCodec<T> {
    pub(crate) fn new(
        id: String,
        to_string: fn(&T) -> String,
        from_str: fn(&str) -> Result<T, String>,
    ) -> Self {
        Self {
            id,
            to_string,
            from_str,
        }
    }
}

impl<T: Any + Send + Sync, F: Format> ValueCodec<F> for StringProxyCodec<T> {
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
        F::write_str(w, &(self.to_string)(v))
    }

    fn decode_value(
        &self,
        _core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        let s = F::read_string(r)?;
        (self.from_str)(&s)
            .map(|v| Box::new(v) as DynValue)
            .map_err(|detail| CodecError::schema(&self.id, detail))
    }
}

/// The codec behind [`TypeRef`]: type identifiers travel as strings and are
/// validated against the alias table and the registry on the way in, so a
/// decoded reference always names a known type.
pub(crate) struct TypeRefCodec;

impl<F: Format> ValueCodec<F> for TypeRefCodec {
    fn id(&self) -> &str {
        "TypeRef"
    }

    fn encode_value(
        &self,
        _core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let v = expect_ref::<TypeRef>("TypeRef", value)?;
        F::write_str(w, &v.0)
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        let s = F::read_string(r)?;
        let canonical = core.config().resolve_alias(&s).to_string();
        if core.registry().lookup(&canonical).is_none() {
            return Err(CodecError::unknown(canonical, "resolving a type reference"));
        }
        Ok(Box::new(TypeRef(canonical)) as DynValue)
    }
}
