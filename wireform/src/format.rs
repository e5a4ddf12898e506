//! The per-format capability trait consumed by every codec.
//!
//! A format supplies primitive atoms, the null/presence markers, structural
//! helpers for records, sequences and maps, and the type-tag writer/reader.
//! The codec families never look at concrete wire representations; they drive
//! these hooks and each format decides what the calls mean (tree nodes for
//! JSON and XML, raw bytes for the binary form).

use crate::config::WireNames;
use crate::error::CodecError;

/// Generates the paired `write_*`/`read_*` declarations for primitive atoms.
macro_rules! primitive_atoms {
    ($($write:ident / $read:ident : $ty:ty),* $(,)?) => {
        $(
            fn $write(w: &mut Self::Writer, v: $ty) -> Result<(), CodecError>;
            fn $read(r: &mut Self::Reader) -> Result<$ty, CodecError>;
        )*
    };
}

/// A wire format. Implementations are zero-sized markers; all state lives in
/// the per-call [`Format::Writer`] and [`Format::Reader`].
///
/// # Structural protocol
///
/// Codecs call the hooks in fixed bracketed shapes, and implementations may
/// rely on that discipline:
///
/// - record: `record_begin`, then per field `record_field(name)` followed by
///   exactly one value, then `record_end`;
/// - sequence: `seq_begin(len)`, then per element `seq_elem(index)` followed
///   by one value, then `seq_end`;
/// - string-keyed map: `map_begin(len)`, then per entry `map_key(key)`
///   followed by one value, then `map_end`;
/// - general map: `entries_begin(len)`, then per entry `entry_begin`,
///   `entry_key` + key value, `entry_value` + value value, `entry_end`, and
///   finally `entries_end`;
/// - type tag: `tag_begin(id)`, one value, `tag_end`.
///
/// On the read side the same shapes apply. Formats that carry field names
/// (JSON, XML) honor `record_field_read` by name and are order-agnostic; the
/// binary format ignores the name and relies on the caller traversing the
/// schema in encode order.
pub trait Format: Sized + Send + Sync + 'static {
    type Writer;
    type Reader;

    /// Short format name used in diagnostics.
    const NAME: &'static str;

    primitive_atoms! {
        write_bool / read_bool: bool,
        write_i8 / read_i8: i8,
        write_i16 / read_i16: i16,
        write_i32 / read_i32: i32,
        write_i64 / read_i64: i64,
        write_u8 / read_u8: u8,
        write_u16 / read_u16: u16,
        write_u32 / read_u32: u32,
        write_u64 / read_u64: u64,
        write_f32 / read_f32: f32,
        write_f64 / read_f64: f64,
        write_char / read_char: char,
    }

    fn write_str(w: &mut Self::Writer, v: &str) -> Result<(), CodecError>;
    fn read_string(r: &mut Self::Reader) -> Result<String, CodecError>;

    /// Writes a byte array. The default renders it as a sequence of `u8`
    /// atoms; length-prefixed formats may override it with a raw copy.
    fn write_bytes(w: &mut Self::Writer, v: &[u8]) -> Result<(), CodecError> {
        Self::seq_begin(w, v.len())?;
        for (index, byte) in v.iter().enumerate() {
            Self::seq_elem(w, index)?;
            Self::write_u8(w, *byte)?;
        }
        Self::seq_end(w)
    }

    /// Reads a byte array written by [`Format::write_bytes`].
    fn read_bytes(r: &mut Self::Reader) -> Result<Vec<u8>, CodecError> {
        let len = Self::seq_begin_read(r)?;
        let mut out = Vec::with_capacity(len);
        for index in 0..len {
            Self::seq_elem_read(r, index)?;
            out.push(Self::read_u8(r)?);
        }
        Self::seq_end_read(r)?;
        Ok(out)
    }

    /// Writes the format's null marker in place of a value.
    fn write_null(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;

    /// Announces that a nullable slot holds a value. The binary format emits
    /// its leading presence byte here; the self-describing formats do
    /// nothing.
    fn write_present(w: &mut Self::Writer) -> Result<(), CodecError>;

    /// Reads the nullable marker: `false` means the null marker was consumed
    /// and no value follows.
    fn read_present(r: &mut Self::Reader, names: &WireNames) -> Result<bool, CodecError>;

    fn record_begin(w: &mut Self::Writer, fields: usize) -> Result<(), CodecError>;
    fn record_field(w: &mut Self::Writer, field: &str) -> Result<(), CodecError>;
    fn record_end(w: &mut Self::Writer) -> Result<(), CodecError>;
    fn record_begin_read(r: &mut Self::Reader) -> Result<(), CodecError>;
    fn record_field_read(r: &mut Self::Reader, field: &str) -> Result<(), CodecError>;
    fn record_end_read(r: &mut Self::Reader) -> Result<(), CodecError>;

    fn seq_begin(w: &mut Self::Writer, len: usize) -> Result<(), CodecError>;
    fn seq_elem(w: &mut Self::Writer, index: usize) -> Result<(), CodecError>;
    fn seq_end(w: &mut Self::Writer) -> Result<(), CodecError>;
    fn seq_begin_read(r: &mut Self::Reader) -> Result<usize, CodecError>;
    fn seq_elem_read(r: &mut Self::Reader, index: usize) -> Result<(), CodecError>;
    fn seq_end_read(r: &mut Self::Reader) -> Result<(), CodecError>;

    fn map_begin(w: &mut Self::Writer, len: usize) -> Result<(), CodecError>;
    fn map_key(w: &mut Self::Writer, key: &str) -> Result<(), CodecError>;
    fn map_end(w: &mut Self::Writer) -> Result<(), CodecError>;
    fn map_begin_read(r: &mut Self::Reader) -> Result<usize, CodecError>;
    fn map_key_read(r: &mut Self::Reader) -> Result<String, CodecError>;
    fn map_end_read(r: &mut Self::Reader) -> Result<(), CodecError>;

    fn entries_begin(
        w: &mut Self::Writer,
        len: usize,
        names: &WireNames,
    ) -> Result<(), CodecError>;
    fn entry_begin(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;
    fn entry_key(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;
    fn entry_value(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;
    fn entry_end(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;
    fn entries_end(w: &mut Self::Writer, names: &WireNames) -> Result<(), CodecError>;
    fn entries_begin_read(
        r: &mut Self::Reader,
        names: &WireNames,
    ) -> Result<usize, CodecError>;
    fn entry_begin_read(r: &mut Self::Reader, names: &WireNames) -> Result<(), CodecError>;
    fn entry_key_read(r: &mut Self::Reader, names: &WireNames) -> Result<(), CodecError>;
    fn entry_value_read(r: &mut Self::Reader, names: &WireNames) -> Result<(), CodecError>;
    fn entry_end_read(r: &mut Self::Reader, names: &WireNames) -> Result<(), CodecError>;
    fn entries_end_read(r: &mut Self::Reader, names: &WireNames) -> Result<(), CodecError>;

    /// Opens a tagged polymorphic value with the given type identifier.
    fn tag_begin(
        w: &mut Self::Writer,
        id: &str,
        names: &WireNames,
    ) -> Result<(), CodecError>;
    fn tag_end(w: &mut Self::Writer) -> Result<(), CodecError>;

    /// Reads a type tag if the next value carries one, positioning the reader
    /// on the payload. Returns `None` when the value is untagged.
    fn tag_read(
        r: &mut Self::Reader,
        names: &WireNames,
    ) -> Result<Option<String>, CodecError>;
    fn tag_end_read(r: &mut Self::Reader) -> Result<(), CodecError>;
}
