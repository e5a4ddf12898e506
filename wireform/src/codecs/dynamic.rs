//! Dynamic dispatch: the one place where the runtime type of a value is not
//! fixed by its declaration.
//!
//! On encode the runtime `TypeId` is resolved to a canonical identifier, the
//! proxy table rewrites it to its public surrogate, and the identifier is
//! written through the format's type-tag writer ahead of the payload. On
//! decode the incoming tag is resolved alias first, then proxy, then checked
//! against the allow-list before any codec lookup happens; only then is the
//! payload decoded.

use tracing::trace;

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::name;
use crate::reflect::{DynValue, Reflected, expect_ref};

/// The codec bound to a [`crate::codec::dynamic`] slot. The slot's field
/// type is [`DynValue`]; the tag decides everything else.
pub struct DynamicCodec;

impl<F: Format> ValueCodec<F> for DynamicCodec {
    fn id(&self) -> &str {
        name::DYNAMIC
    }

    fn encode_value(
        &self,
        core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let slot = expect_ref::<DynValue>(name::DYNAMIC, value)?;
        encode_dynamic(core, slot.as_ref(), w)
    }

    fn decode_value(
        &self,
        core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        decode_dynamic(core, r).map(|value| Box::new(value) as DynValue)
    }
}

pub(crate) fn encode_dynamic<F: Format>(
    core: &CodecCore<F>,
    value: &dyn Reflected,
    w: &mut F::Writer,
) -> Result<(), CodecError> {
    let type_id = value.as_any().type_id();
    let (id, codec) = core.registry().typed_entry(type_id).ok_or_else(|| {
        CodecError::unknown("<unregistered runtime type>", "encoding a dynamic value")
    })?;
    let tag = core.config().proxied(&id);
    trace!(tag = %tag, "tagging dynamic value");
    F::tag_begin(w, &tag, core.config().names())?;
    codec.encode_value(core, value, w)?;
    F::tag_end(w)
}

pub(crate) fn decode_dynamic<F: Format>(
    core: &CodecCore<F>,
    r: &mut F::Reader,
) -> Result<DynValue, CodecError> {
    let Some(wire_id) = F::tag_read(r, core.config().names())? else {
        return Err(CodecError::schema(
            name::DYNAMIC,
            "missing type tag on a polymorphic value",
        ));
    };
    let aliased = core.config().resolve_alias(&wire_id);
    let canonical = core.config().proxied(aliased);
    trace!(tag = %canonical, "resolving dynamic tag");
    if !core.config().is_allowed(&canonical) {
        return Err(CodecError::disallowed(canonical.to_string()));
    }
    let codec = core
        .registry()
        .lookup(&canonical)
        .ok_or_else(|| CodecError::unknown(canonical.to_string(), "decoding a dynamic value"))?;
    let value = codec.decode_value(core, r)?;
    F::tag_end_read(r)?;
    Ok(value)
}
