//! The binary adapter: fixed-width big-endian primitives over a byte
//! stream.
//!
//! Strings are a `u16` length followed by UTF-8 bytes; sequences and maps
//! are `u32` length-prefixed; nullable values carry one leading boolean
//! byte. Records concatenate field payloads in declared order with neither
//! names nor lengths, so decode must traverse the schema in encode order.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::WireNames;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;

/// A core speaking the binary wire form.
pub type BinCore = CodecCore<Bin>;

const FORMAT: &str = "binary";

fn wire(detail: impl Into<String>) -> CodecError {
    CodecError::wire(FORMAT, detail.into())
}

/// The binary format marker.
pub struct Bin;

/// Appends big-endian atoms to a growable buffer.
pub struct BinWriter {
    buf: BytesMut,
}

impl BinWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// The finished byte string.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for BinWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes big-endian atoms from a byte string.
pub struct BinReader {
    buf: Bytes,
}

impl BinReader {
    pub fn new(input: impl Into<Bytes>) -> Self {
        Self { buf: input.into() }
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(wire("unexpected end of input"));
        }
        Ok(())
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32() as usize)
    }
}

fn write_len(w: &mut BinWriter, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| wire("length exceeds u32 range"))?;
    w.buf.put_u32(len);
    Ok(())
}

macro_rules! bin_fixed_atoms {
    ($($write:ident / $read:ident : $ty:ty => $put:ident / $get:ident / $size:literal),* $(,)?) => {
        $(
            fn $write(w: &mut BinWriter, v: $ty) -> Result<(), CodecError> {
                w.buf.$put(v);
                Ok(())
            }

            fn $read(r: &mut BinReader) -> Result<$ty, CodecError> {
                r.need($size)?;
                Ok(r.buf.$get())
            }
        )*
    };
}

impl Format for Bin {
    type Writer = BinWriter;
    type Reader = BinReader;

    const NAME: &'static str = FORMAT;

    bin_fixed_atoms! {
        write_i8 / read_i8: i8 => put_i8 / get_i8 / 1,
        write_i16 / read_i16: i16 => put_i16 / get_i16 / 2,
        write_i32 / read_i32: i32 => put_i32 / get_i32 / 4,
        write_i64 / read_i64: i64 => put_i64 / get_i64 / 8,
        write_u8 / read_u8: u8 => put_u8 / get_u8 / 1,
        write_u16 / read_u16: u16 => put_u16 / get_u16 / 2,
        write_u32 / read_u32: u32 => put_u32 / get_u32 / 4,
        write_u64 / read_u64: u64 => put_u64 / get_u64 / 8,
        write_f32 / read_f32: f32 => put_f32 / get_f32 / 4,
        write_f64 / read_f64: f64 => put_f64 / get_f64 / 8,
    }

    fn write_bool(w: &mut BinWriter, v: bool) -> Result<(), CodecError> {
        w.buf.put_u8(u8::from(v));
        Ok(())
    }

    fn read_bool(r: &mut BinReader) -> Result<bool, CodecError> {
        r.need(1)?;
        match r.buf.get_u8() {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(wire(format!("invalid boolean byte {b:#04x}"))),
        }
    }

    fn write_char(w: &mut BinWriter, v: char) -> Result<(), CodecError> {
        w.buf.put_u32(v as u32);
        Ok(())
    }

    fn read_char(r: &mut BinReader) -> Result<char, CodecError> {
        r.need(4)?;
        let scalar = r.buf.get_u32();
        char::from_u32(scalar)
            .ok_or_else(|| wire(format!("{scalar:#010x} is not a character")))
    }

    fn write_str(w: &mut BinWriter, v: &str) -> Result<(), CodecError> {
        let len = u16::try_from(v.len())
            .map_err(|_| wire("string length exceeds u16 range"))?;
        w.buf.put_u16(len);
        w.buf.put_slice(v.as_bytes());
        Ok(())
    }

    fn read_string(r: &mut BinReader) -> Result<String, CodecError> {
        r.need(2)?;
        let len = r.buf.get_u16() as usize;
        r.need(len)?;
        let bytes = r.buf.copy_to_bytes(len);
        String::from_utf8(bytes.to_vec()).map_err(|e| wire(e.to_string()))
    }

    fn write_bytes(w: &mut BinWriter, v: &[u8]) -> Result<(), CodecError> {
        write_len(w, v.len())?;
        w.buf.put_slice(v);
        Ok(())
    }

    fn read_bytes(r: &mut BinReader) -> Result<Vec<u8>, CodecError> {
        let len = r.read_len()?;
        r.need(len)?;
        Ok(r.buf.copy_to_bytes(len).to_vec())
    }

    fn write_null(w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.buf.put_u8(0);
        Ok(())
    }

    fn write_present(w: &mut BinWriter) -> Result<(), CodecError> {
        w.buf.put_u8(1);
        Ok(())
    }

    fn read_present(r: &mut BinReader, _names: &WireNames) -> Result<bool, CodecError> {
        Self::read_bool(r)
    }

    fn record_begin(_w: &mut BinWriter, _fields: usize) -> Result<(), CodecError> {
        Ok(())
    }

    fn record_field(_w: &mut BinWriter, _field: &str) -> Result<(), CodecError> {
        Ok(())
    }

    fn record_end(_w: &mut BinWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn record_begin_read(_r: &mut BinReader) -> Result<(), CodecError> {
        Ok(())
    }

    fn record_field_read(_r: &mut BinReader, _field: &str) -> Result<(), CodecError> {
        Ok(())
    }

    fn record_end_read(_r: &mut BinReader) -> Result<(), CodecError> {
        Ok(())
    }

    fn seq_begin(w: &mut BinWriter, len: usize) -> Result<(), CodecError> {
        write_len(w, len)
    }

    fn seq_elem(_w: &mut BinWriter, _index: usize) -> Result<(), CodecError> {
        Ok(())
    }

    fn seq_end(_w: &mut BinWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn seq_begin_read(r: &mut BinReader) -> Result<usize, CodecError> {
        r.read_len()
    }

    fn seq_elem_read(_r: &mut BinReader, _index: usize) -> Result<(), CodecError> {
        Ok(())
    }

    fn seq_end_read(_r: &mut BinReader) -> Result<(), CodecError> {
        Ok(())
    }

    fn map_begin(w: &mut BinWriter, len: usize) -> Result<(), CodecError> {
        write_len(w, len)
    }

    fn map_key(w: &mut BinWriter, key: &str) -> Result<(), CodecError> {
        Self::write_str(w, key)
    }

    fn map_end(_w: &mut BinWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn map_begin_read(r: &mut BinReader) -> Result<usize, CodecError> {
        r.read_len()
    }

    fn map_key_read(r: &mut BinReader) -> Result<String, CodecError> {
        Self::read_string(r)
    }

    fn map_end_read(_r: &mut BinReader) -> Result<(), CodecError> {
        Ok(())
    }

    fn entries_begin(
        w: &mut BinWriter,
        len: usize,
        _names: &WireNames,
    ) -> Result<(), CodecError> {
        write_len(w, len)
    }

    fn entry_begin(_w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_key(_w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_value(_w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_end(_w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entries_end(_w: &mut BinWriter, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entries_begin_read(
        r: &mut BinReader,
        _names: &WireNames,
    ) -> Result<usize, CodecError> {
        r.read_len()
    }

    fn entry_begin_read(_r: &mut BinReader, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_key_read(_r: &mut BinReader, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_value_read(_r: &mut BinReader, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entry_end_read(_r: &mut BinReader, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn entries_end_read(_r: &mut BinReader, _names: &WireNames) -> Result<(), CodecError> {
        Ok(())
    }

    fn tag_begin(w: &mut BinWriter, id: &str, _names: &WireNames) -> Result<(), CodecError> {
        Self::write_str(w, id)
    }

    fn tag_end(_w: &mut BinWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn tag_read(r: &mut BinReader, _names: &WireNames) -> Result<Option<String>, CodecError> {
        Self::read_string(r).map(Some)
    }

    fn tag_end_read(_r: &mut BinReader) -> Result<(), CodecError> {
        Ok(())
    }
}

impl BinCore {
    /// Encodes a registered value into its byte form.
    pub fn to_bytes<T: std::any::Any + Send + Sync>(
        &self,
        value: &T,
    ) -> Result<Bytes, CodecError> {
        let mut w = BinWriter::new();
        self.encode(value, &mut w)?;
        Ok(w.finish())
    }

    /// Decodes a registered value from its byte form.
    pub fn from_bytes<T: std::any::Any + Send + Sync>(
        &self,
        input: impl Into<Bytes>,
    ) -> Result<T, CodecError> {
        let mut r = BinReader::new(input);
        self.decode(&mut r)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn atoms_round_trip_big_endian() {
        let mut w = BinWriter::new();
        Bin::write_i32(&mut w, -2).unwrap();
        Bin::write_u16(&mut w, 515).unwrap();
        Bin::write_bool(&mut w, true).unwrap();
        Bin::write_str(&mut w, "hi").unwrap();
        let bytes = w.finish();
        assert_eq!(
            bytes.as_ref(),
            &[0xff, 0xff, 0xff, 0xfe, 0x02, 0x03, 0x01, 0x00, 0x02, b'h', b'i']
        );

        let mut r = BinReader::new(bytes);
        assert_eq!(Bin::read_i32(&mut r).unwrap(), -2);
        assert_eq!(Bin::read_u16(&mut r).unwrap(), 515);
        assert!(Bin::read_bool(&mut r).unwrap());
        assert_eq!(Bin::read_string(&mut r).unwrap(), "hi");
    }

    #[test]
    fn truncated_input_is_a_wire_error() {
        let mut r = BinReader::new(vec![0x00]);
        let err = Bin::read_i32(&mut r).unwrap_err();
        assert!(matches!(err, CodecError::WireFormat { .. }));
    }

    #[test]
    fn invalid_boolean_bytes_are_rejected() {
        let mut r = BinReader::new(vec![0x02]);
        assert!(Bin::read_bool(&mut r).is_err());
    }

    #[test]
    fn byte_arrays_are_raw_length_prefixed() {
        let mut w = BinWriter::new();
        Bin::write_bytes(&mut w, &[9, 8, 7]).unwrap();
        let bytes = w.finish();
        assert_eq!(bytes.as_ref(), &[0, 0, 0, 3, 9, 8, 7]);
        let mut r = BinReader::new(bytes);
        assert_eq!(Bin::read_bytes(&mut r).unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn nullable_values_lead_with_a_presence_byte() {
        let names = WireNames::default();
        let mut w = BinWriter::new();
        Bin::write_null(&mut w, &names).unwrap();
        Bin::write_present(&mut w).unwrap();
        Bin::write_i8(&mut w, 5).unwrap();
        let mut r = BinReader::new(w.finish());
        assert!(!Bin::read_present(&mut r, &names).unwrap());
        assert!(Bin::read_present(&mut r, &names).unwrap());
        assert_eq!(Bin::read_i8(&mut r).unwrap(), 5);
    }
}
