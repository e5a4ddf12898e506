//! One codec per primitive atom, each a zero-sized struct deferring to the
//! format's matching write/read hook.

use crate::codec::ValueCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_ref};

/// Generates the struct and [`ValueCodec`] implementation for a primitive
/// codec.
macro_rules! primitive_codec {
    ($codec:ident, $ty:ty, $id:literal, $write:ident, $read:ident) => {
        #[doc = concat!("Codec for [`", stringify!($ty), "`] (identifier `", $id, "`).")]
        pub struct $codec;

        impl<F: Format> ValueCodec<F> for $codec {
            fn id(&self) -> &str {
                $id
            }

            fn encode_value(
                &self,
                _core: &CodecCore<F>,
                value: &dyn Reflected,
                w: &mut F::Writer,
            ) -> Result<(), CodecError> {
                let v = expect_ref::<$ty>($id, value)?;
                F::$write(w, *v)
            }

            fn decode_value(
                &self,
                _core: &CodecCore<F>,
                r: &mut F::Reader,
            ) -> Result<DynValue, CodecError> {
                F::$read(r).map(|v| Box::new(v) as DynValue)
            }
        }
    };
}

primitive_codec!(BoolCodec, bool, "bool", write_bool, read_bool);

primitive_codec!(I8Codec, i8, "i8", write_i8, read_i8);
primitive_codec!(I16Codec, i16, "i16", write_i16, read_i16);
primitive_codec!(I32Codec, i32, "i32", write_i32, read_i32);
primitive_codec!(I64Codec, i64, "i64", write_i64, read_i64);

primitive_codec!(U8Codec, u8, "u8", write_u8, read_u8);
primitive_codec!(U16Codec, u16, "u16", write_u16, read_u16);
primitive_codec!(U32Codec, u32, "u32", write_u32, read_u32);
primitive_codec!(U64Codec, u64, "u64", write_u64, read_u64);

primitive_codec!(F32Codec, f32, "f32", write_f32, read_f32);
primitive_codec!(F64Codec, f64, "f64", write_f64, read_f64);

primitive_codec!(CharCodec, char, "char", write_char, read_char);

/// Codec for [`String`] (identifier `String`).
pub struct StringCodec;

impl<F: Format> ValueCodec<F> for StringCodec {
    fn id(&self) -> &str {
        "String"
    }

    fn encode_value(
        &self,
        _core: &CodecCore<F>,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        let v = expect_ref::<String>("String", value)?;
        F::write_str(w, v)
    }

    fn decode_value(
        &self,
        _core: &CodecCore<F>,
        r: &mut F::Reader,
    ) -> Result<DynValue, CodecError> {
        F::read_string(r).map(|v| Box::new(v) as DynValue)
    }
}
