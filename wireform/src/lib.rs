//! A reflective, multi-format value-serialization engine.
//!
//! One format-independent core pairs a codec registry with a configuration;
//! JSON, XML, and binary adapters plug in underneath. Types are registered
//! once (through the record builder, the arg-array builder, an enum table,
//! or a string proxy) and every registered type can then be encoded and
//! decoded on all three wire forms, including polymorphically behind a
//! [`codec::dynamic`] slot guarded by the decode allow-list.
//!
//! ```
//! use wireform::formats::json::JsonCore;
//! use wireform::reflect::DynValue;
//!
//! let core = JsonCore::new();
//! // Dynamic values carry a type tag on the wire and resolve back through
//! // the allow-list at decode time.
//! let value: DynValue = Box::new("hello".to_string());
//! let json = {
//!     let mut w = wireform::formats::json::JsonWriter::new();
//!     core.encode_dynamic(value.as_ref(), &mut w).unwrap();
//!     w.finish().unwrap()
//! };
//! assert_eq!(json["@type"], "String");
//! assert_eq!(json["@value"], "hello");
//! ```

pub mod codec;
pub mod codecs;
pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod formats;
pub mod name;
pub mod reflect;
pub mod schema;

mod bootstrap;
mod registry;

pub use crate::core::CodecCore;
pub use crate::error::CodecError;
