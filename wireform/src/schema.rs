//! Product-type schemas: the builders registered once per type, the field
//! schema they produce, and the positional argument bundle used by
//! externally-constructed types.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::codec::FieldType;
use crate::codecs::arg_array::ArgArrayCodec;
use crate::codecs::record::RecordCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, expect_owned};

pub(crate) type EncodeField<T, F> = Box<
    dyn Fn(&T, &CodecCore<F>, &mut <F as Format>::Writer) -> Result<(), CodecError>
    + Send
    + Sync,
>;
pub(crate) type DecodeField<T, F> = Box<
    dyn Fn(&mut T, &CodecCore<F>, &mut <F as Format>::Reader) -> Result<(), CodecError>
    + Send
    + Sync,
>;
pub(crate) type DecodeArg<F> = Box<
    dyn Fn(&CodecCore<F>, &mut <F as Format>::Reader) -> Result<DynValue, CodecError>
    + Send
    + Sync,
>;

/// One field of a product type: its final wire name plus the erased
/// read-from-object and write-to-stream halves.
pub(crate) struct FieldSchema<T, F: Format> {
    pub(crate) name: String,
    pub(crate) encode: EncodeField<T, F>,
    pub(crate) decode: DecodeField<T, F>,
}

/// One field of an arg-array type: like [`FieldSchema`] but the decode half
/// yields the value instead of assigning it.
pub(crate) struct ArgSchema<T, F: Format> {
    pub(crate) name: String,
    pub(crate) encode: EncodeField<T, F>,
    pub(crate) decode: DecodeArg<F>,
}

/// The rename policy: while a declared name collides with an earlier field,
/// prepend the configured prefix until it is unique. Deterministic in
/// declaration order.
fn unique_name(declared: &str, prefix: &str, taken: &[String]) -> String {
    let mut candidate = declared.to_string();
    while taken.contains(&candidate) {
        candidate = format!("{prefix}{candidate}");
    }
    candidate
}

/// Builds the codec of a product type with a no-argument constructor: fields
/// are read back by name (or positionally on the byte format) and assigned
/// through their setters.
pub struct RecordBuilder<'c, T, F: Format> {
    core: &'c mut CodecCore<F>,
    id: String,
    fields: Vec<FieldSchema<T, F>>,
    taken: Vec<String>,
}

impl<'c, T: Any + Send + Sync, F: Format> RecordBuilder<'c, T, F> {
    pub(crate) fn new(core: &'c mut CodecCore<F>, id: String) -> Self {
        Self {
            core,
            id,
            fields: Vec::new(),
            taken: Vec::new(),
        }
    }

    /// Declares the next field: its wire name, a borrowing getter, a setter,
    /// and its declared type.
    pub fn field<V>(
        mut self,
        name: &str,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
        ty: FieldType<V, F>,
    ) -> Self
    where
        V: Any + Send + Sync,
    {
        let final_name = unique_name(name, self.core.config().rename_prefix(), &self.taken);
        self.taken.push(final_name.clone());
        let ty = Arc::new(ty);
        let ty_enc = Arc::clone(&ty);
        let encode: EncodeField<T, F> = Box::new(move |value, core, w| {
            let codec = ty_enc.resolve(core)?;
            codec.encode_value(core, get(value), w)
        });
        let decode: DecodeField<T, F> = Box::new(move |value, core, r| {
            let codec = ty.resolve(core)?;
            let field = codec.decode_value(core, r)?;
            set(value, expect_owned::<V>(codec.id(), field)?);
            Ok(())
        });
        self.fields.push(FieldSchema {
            name: final_name,
            encode,
            decode,
        });
        self
    }

    /// Finishes the schema and registers the codec. `ctor` produces the
    /// instance that decode assigns fields into, typically
    /// `Default::default`.
    pub fn build(self, ctor: impl Fn() -> T + Send + Sync + 'static) {
        let codec = RecordCodec::new(self.id, self.fields, Box::new(ctor));
        self.core
            .registry()
            .register(TypeId::of::<T>(), Arc::new(codec));
    }
}

/// Builds the codec of an externally-constructed type: fields are projected
/// out by accessors on encode, and decode collects the values into a
/// positional [`Args`] bundle handed to the constructor function.
pub struct ArgArrayBuilder<'c, T, F: Format> {
    core: &'c mut CodecCore<F>,
    id: String,
    fields: Vec<ArgSchema<T, F>>,
    taken: Vec<String>,
}

impl<'c, T: Any + Send + Sync, F: Format> ArgArrayBuilder<'c, T, F> {
    pub(crate) fn new(core: &'c mut CodecCore<F>, id: String) -> Self {
        Self {
            core,
            id,
            fields: Vec::new(),
            taken: Vec::new(),
        }
    }

    /// Declares the next field: its wire name, an owning accessor, and its
    /// declared type.
    pub fn field<V>(
        mut self,
        name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        ty: FieldType<V, F>,
    ) -> Self
    where
        V: Any + Send + Sync,
    {
        let final_name = unique_name(name, self.core.config().rename_prefix(), &self.taken);
        self.taken.push(final_name.clone());
        let ty = Arc::new(ty);
        let ty_enc = Arc::clone(&ty);
        let encode: EncodeField<T, F> = Box::new(move |value, core, w| {
            let codec = ty_enc.resolve(core)?;
            let field = get(value);
            codec.encode_value(core, &field, w)
        });
        let decode: DecodeArg<F> =
            Box::new(move |core, r| ty.resolve(core)?.decode_value(core, r));
        self.fields.push(ArgSchema {
            name: final_name,
            encode,
            decode,
        });
        self
    }

    /// Finishes the schema and registers the codec. `construct` receives the
    /// decoded field values in declaration order.
    pub fn construct(self, ctor: impl Fn(Args) -> Result<T, CodecError> + Send + Sync + 'static) {
        let codec = ArgArrayCodec::new(self.id, self.fields, Box::new(ctor));
        self.core
            .registry()
            .register(TypeId::of::<T>(), Arc::new(codec));
    }
}

/// The positional bundle of decoded field values handed to an arg-array
/// constructor.
pub struct Args {
    id: String,
    values: Vec<Option<DynValue>>,
}

impl Args {
    pub(crate) fn new(id: String, values: Vec<Option<DynValue>>) -> Self {
        Self { id, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the argument at `index` as a `V`. Out-of-range indexes, doubly
    /// taken slots, and wrongly-typed takes fail with the arity in the
    /// message.
    pub fn take<V: Any>(&mut self, index: usize) -> Result<V, CodecError> {
        let arity = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            CodecError::schema(
                &self.id,
                format!("argument index {index} out of range for arity {arity}"),
            )
        })?;
        let value = slot.take().ok_or_else(|| {
            CodecError::schema(&self.id, format!("argument {index} taken twice"))
        })?;
        expect_owned::<V>(&self.id, value)
    }

    /// Takes all arguments as alternating key/value pairs. An odd arity is a
    /// schema mismatch naming the type and the received arity.
    pub fn take_pairs<K: Any, V: Any>(mut self) -> Result<Vec<(K, V)>, CodecError> {
        let arity = self.len();
        if arity % 2 != 0 {
            return Err(CodecError::schema(
                &self.id,
                format!("paired arguments require an even arity, got {arity}"),
            ));
        }
        let mut pairs = Vec::with_capacity(arity / 2);
        for index in (0..arity).step_by(2) {
            pairs.push((self.take::<K>(index)?, self.take::<V>(index + 1)?));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rename_policy_prefixes_until_unique() {
        let taken = vec!["name".to_string(), "_name".to_string()];
        assert_eq!(unique_name("name", "_", &taken), "__name");
        assert_eq!(unique_name("other", "_", &taken), "other");
    }

    #[test]
    fn args_enforce_arity() {
        let mut args = Args::new(
            "demo.Pair".to_string(),
            vec![Some(Box::new(1i32)), Some(Box::new(2i32))],
        );
        assert_eq!(args.take::<i32>(0).unwrap(), 1);
        assert!(args.take::<i32>(0).is_err());
        assert!(args.take::<i32>(5).is_err());
    }

    #[test]
    fn odd_pair_arity_is_rejected() {
        let args = Args::new(
            "demo.Table".to_string(),
            vec![
                Some(Box::new("a".to_string())),
                Some(Box::new(1i32)),
                Some(Box::new("b".to_string())),
            ],
        );
        let err = args.take_pairs::<String, i32>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("demo.Table"));
        assert!(message.contains("arity, got 3"));
    }
}
