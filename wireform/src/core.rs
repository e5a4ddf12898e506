//! The codec core: one registry plus one configuration, parameterized by a
//! wire format.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::bootstrap;
use crate::codec::FieldType;
use crate::codecs::dynamic;
use crate::codecs::enumeration::EnumCodec;
use crate::codecs::string_proxy::StringProxyCodec;
use crate::config::Config;
use crate::error::CodecError;
use crate::format::Format;
use crate::reflect::{DynValue, Reflected, expect_owned};
use crate::registry::Registry;
use crate::schema::{ArgArrayBuilder, RecordBuilder};

/// The engine: a codec registry and a configuration behind one wire format.
///
/// A fresh core arrives with the bootstrap registrations installed:
/// primitive codecs and their aliases, string proxies for big numbers, ids
/// and type references, and the arg-array codecs for the date/time surface.
/// User types are added through [`CodecCore::record`],
/// [`CodecCore::arg_array`], [`CodecCore::register_enum`], and
/// [`CodecCore::register_string_proxy`].
///
/// Registration and configuration require `&mut` access; encode and decode
/// take `&self` and may run concurrently once setup is done. The first
/// encode/decode seals the registry: from then on codecs are only added by
/// lazy materialization and are never replaced.
///
/// ```
/// use wireform::codec::{of, seq};
/// use wireform::formats::json::JsonCore;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Person {
///     name: String,
///     scores: Vec<i32>,
/// }
///
/// let mut core = JsonCore::new();
/// core.record::<Person>("demo.Person")
///     .field("name", |p| &p.name, |p, v| p.name = v, of())
///     .field("scores", |p| &p.scores, |p, v| p.scores = v, seq(of()))
///     .build(Person::default);
///
/// let person = Person { name: "ada".to_string(), scores: vec![1, 2] };
/// let json = core.to_json_value(&person).unwrap();
/// assert_eq!(core.from_json_value::<Person>(json).unwrap(), person);
/// ```
pub struct CodecCore<F: Format> {
    config: Config,
    registry: Registry<F>,
}

impl<F: Format> CodecCore<F> {
    pub fn new() -> Self {
        let mut core = Self {
            config: Config::default(),
            registry: Registry::new(),
        };
        bootstrap::install(&mut core);
        core
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the configuration: aliases, allow-list, proxies,
    /// default collection kinds, field-name policy, wire names.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub(crate) fn registry(&self) -> &Registry<F> {
        &self.registry
    }

    /// Starts the schema of a product type with a no-argument constructor.
    pub fn record<T: Any + Send + Sync>(&mut self, id: impl Into<String>) -> RecordBuilder<'_, T, F> {
        RecordBuilder::new(self, id.into())
    }

    /// Starts the schema of an externally-constructed type: decoded field
    /// values are collected into a positional argument bundle and handed to
    /// the constructor function.
    pub fn arg_array<T: Any + Send + Sync>(
        &mut self,
        id: impl Into<String>,
    ) -> ArgArrayBuilder<'_, T, F> {
        ArgArrayBuilder::new(self, id.into())
    }

    /// Registers a codec routing `T` through a round-tripping string
    /// projection.
    pub fn register_string_proxy<T: Any + Send + Sync>(
        &mut self,
        id: impl Into<String>,
        to_string: fn(&T) -> String,
        from_str: fn(&str) -> Result<T, String>,
    ) {
        let id = id.into();
        self.registry.register(
            TypeId::of::<T>(),
            Arc::new(StringProxyCodec::new(id, to_string, from_str)),
        );
    }

    /// Registers a fieldless enum encoded by variant name.
    pub fn register_enum<T>(
        &mut self,
        id: impl Into<String>,
        variants: impl IntoIterator<Item = (&'static str, T)>,
    ) where
        T: Any + Send + Sync + PartialEq + Clone,
    {
        let id = id.into();
        self.registry
            .register(TypeId::of::<T>(), Arc::new(EnumCodec::new(id, variants)));
    }

    /// Materializes the codec for a declared type eagerly, so values of
    /// composite types (`Vec<i32>`, `HashMap<String, i32>`, …) can be used
    /// with the plain [`CodecCore::encode`]/[`CodecCore::decode`] entry
    /// points and as dynamic values.
    pub fn register_type<V: Any + Send + Sync>(
        &mut self,
        ty: &FieldType<V, F>,
    ) -> Result<(), CodecError> {
        ty.resolve(self).map(|_| ())
    }

    /// Encodes a value of a registered type into the writer.
    pub fn encode<T: Any + Send + Sync>(
        &self,
        value: &T,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        self.registry.seal();
        let codec = self
            .registry
            .typed_codec(TypeId::of::<T>())
            .ok_or_else(|| CodecError::unknown(std::any::type_name::<T>(), "encoding"))?;
        codec.encode_value(self, value, w)
    }

    /// Decodes a value of a registered type from the reader.
    pub fn decode<T: Any + Send + Sync>(&self, r: &mut F::Reader) -> Result<T, CodecError> {
        self.registry.seal();
        let codec = self
            .registry
            .typed_codec(TypeId::of::<T>())
            .ok_or_else(|| CodecError::unknown(std::any::type_name::<T>(), "decoding"))?;
        let value = codec.decode_value(self, r)?;
        expect_owned::<T>(codec.id(), value)
    }

    /// Encodes a value under an explicitly declared type.
    pub fn encode_as<V: Any + Send + Sync>(
        &self,
        ty: &FieldType<V, F>,
        value: &V,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        self.registry.seal();
        let codec = ty.resolve(self)?;
        codec.encode_value(self, value, w)
    }

    /// Decodes a value under an explicitly declared type.
    pub fn decode_as<V: Any + Send + Sync>(
        &self,
        ty: &FieldType<V, F>,
        r: &mut F::Reader,
    ) -> Result<V, CodecError> {
        self.registry.seal();
        let codec = ty.resolve(self)?;
        let value = codec.decode_value(self, r)?;
        expect_owned::<V>(codec.id(), value)
    }

    /// Encodes a value of any registered runtime type with a leading type
    /// tag, the way a [`crate::codec::dynamic`] slot would.
    pub fn encode_dynamic(
        &self,
        value: &dyn Reflected,
        w: &mut F::Writer,
    ) -> Result<(), CodecError> {
        self.registry.seal();
        dynamic::encode_dynamic(self, value, w)
    }

    /// Decodes a tagged polymorphic value, enforcing the allow-list.
    pub fn decode_dynamic(&self, r: &mut F::Reader) -> Result<DynValue, CodecError> {
        self.registry.seal();
        dynamic::decode_dynamic(self, r)
    }
}

impl<F: Format> Default for CodecCore<F> {
    fn default() -> Self {
        Self::new()
    }
}
