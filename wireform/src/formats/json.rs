//! The JSON adapter, realized over a [`serde_json::Value`] tree.
//!
//! The writer assembles the tree through a stack of open frames; the reader
//! walks it back down with a cursor. Polymorphic values wrap as
//! `{"@type": id, "@value": payload}` (key names config-controlled); the
//! string-keyed map fast path writes entries as plain object members.

use serde_json::{Map, Number, Value};

use crate::config::WireNames;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;

/// A core speaking the JSON wire form.
pub type JsonCore = CodecCore<Json>;

const FORMAT: &str = "JSON";

fn wire(detail: impl Into<String>) -> CodecError {
    CodecError::wire(FORMAT, detail.into())
}

/// The JSON format marker.
pub struct Json;

enum Frame {
    Record {
        map: Map<String, Value>,
        pending: Option<String>,
    },
    Seq {
        items: Vec<Value>,
    },
}

/// Builds a [`Value`] tree from the structural calls of the codec core.
pub struct JsonWriter {
    frames: Vec<Frame>,
    root: Option<Value>,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            root: None,
        }
    }

    /// The finished tree. Fails if a frame is still open or nothing was
    /// written.
    pub fn finish(self) -> Result<Value, CodecError> {
        if !self.frames.is_empty() {
            return Err(wire("unclosed structure at end of encode"));
        }
        self.root.ok_or_else(|| wire("nothing was encoded"))
    }

    fn push_value(&mut self, value: Value) -> Result<(), CodecError> {
        match self.frames.last_mut() {
            None => {
                if self.root.is_some() {
                    return Err(wire("more than one root value"));
                }
                self.root = Some(value);
                Ok(())
            }
            Some(Frame::Record { map, pending }) => {
                let key = pending
                    .take()
                    .ok_or_else(|| wire("value written without a field name"))?;
                map.insert(key, value);
                Ok(())
            }
            Some(Frame::Seq { items }) => {
                items.push(value);
                Ok(())
            }
        }
    }

    fn open_record(&mut self, map: Map<String, Value>, pending: Option<String>) {
        self.frames.push(Frame::Record { map, pending });
    }

    fn set_pending(&mut self, name: &str) -> Result<(), CodecError> {
        match self.frames.last_mut() {
            Some(Frame::Record { pending, .. }) => {
                if pending.is_some() {
                    return Err(wire(format!("field `{name}` opened before the previous field was written")));
                }
                *pending = Some(name.to_string());
                Ok(())
            }
            _ => Err(wire(format!("field `{name}` written outside an object"))),
        }
    }

    fn close_record(&mut self) -> Result<(), CodecError> {
        match self.frames.pop() {
            Some(Frame::Record { map, pending: None }) => self.push_value(Value::Object(map)),
            Some(Frame::Record { .. }) => Err(wire("object closed with an unwritten field")),
            _ => Err(wire("object closed without being open")),
        }
    }

    fn open_seq(&mut self) {
        self.frames.push(Frame::Seq { items: Vec::new() });
    }

    fn close_seq(&mut self) -> Result<(), CodecError> {
        match self.frames.pop() {
            Some(Frame::Seq { items }) => self.push_value(Value::Array(items)),
            _ => Err(wire("array closed without being open")),
        }
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

enum ReadFrame {
    Record(Map<String, Value>),
    Seq(std::vec::IntoIter<Value>),
    Entries(serde_json::map::IntoIter),
}

/// Walks a [`Value`] tree for the structural calls of the codec core.
pub struct JsonReader {
    current: Option<Value>,
    frames: Vec<ReadFrame>,
}

impl JsonReader {
    pub fn new(value: Value) -> Self {
        Self {
            current: Some(value),
            frames: Vec::new(),
        }
    }

    fn take(&mut self) -> Result<Value, CodecError> {
        self.current
            .take()
            .ok_or_else(|| wire("no value pending"))
    }

    fn peek(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    fn take_i64(&mut self) -> Result<i64, CodecError> {
        let v = self.take()?;
        v.as_i64()
            .ok_or_else(|| wire(format!("expected an integer, got {v}")))
    }

    fn take_u64(&mut self) -> Result<u64, CodecError> {
        let v = self.take()?;
        v.as_u64()
            .ok_or_else(|| wire(format!("expected an unsigned integer, got {v}")))
    }
}

/// Generates the signed/unsigned integer atoms over the reader's widest
/// lane, narrowing with a range check.
macro_rules! json_int_atoms {
    ($($write:ident / $read:ident : $ty:ty => $lane:ident),* $(,)?) => {
        $(
            fn $write(w: &mut JsonWriter, v: $ty) -> Result<(), CodecError> {
                w.push_value(Value::from(v))
            }

            fn $read(r: &mut JsonReader) -> Result<$ty, CodecError> {
                let n = r.$lane()?;
                <$ty>::try_from(n)
                    .map_err(|_| wire(format!("{n} out of range for {}", stringify!($ty))))
            }
        )*
    };
}

impl Format for Json {
    type Writer = JsonWriter;
    type Reader = JsonReader;

    const NAME: &'static str = FORMAT;

    fn write_bool(w: &mut JsonWriter, v: bool) -> Result<(), CodecError> {
        w.push_value(Value::Bool(v))
    }

    fn read_bool(r: &mut JsonReader) -> Result<bool, CodecError> {
        let v = r.take()?;
        v.as_bool()
            .ok_or_else(|| wire(format!("expected a boolean, got {v}")))
    }

    json_int_atoms! {
        write_i8 / read_i8: i8 => take_i64,
        write_i16 / read_i16: i16 => take_i64,
        write_i32 / read_i32: i32 => take_i64,
        write_u8 / read_u8: u8 => take_u64,
        write_u16 / read_u16: u16 => take_u64,
        write_u32 / read_u32: u32 => take_u64,
    }

    fn write_i64(w: &mut JsonWriter, v: i64) -> Result<(), CodecError> {
        w.push_value(Value::from(v))
    }

    fn read_i64(r: &mut JsonReader) -> Result<i64, CodecError> {
        r.take_i64()
    }

    fn write_u64(w: &mut JsonWriter, v: u64) -> Result<(), CodecError> {
        w.push_value(Value::from(v))
    }

    fn read_u64(r: &mut JsonReader) -> Result<u64, CodecError> {
        r.take_u64()
    }

    fn write_f32(w: &mut JsonWriter, v: f32) -> Result<(), CodecError> {
        Self::write_f64(w, f64::from(v))
    }

    fn read_f32(r: &mut JsonReader) -> Result<f32, CodecError> {
        Self::read_f64(r).map(|v| v as f32)
    }

    fn write_f64(w: &mut JsonWriter, v: f64) -> Result<(), CodecError> {
        let n = Number::from_f64(v)
            .ok_or_else(|| wire("non-finite numbers have no JSON representation"))?;
        w.push_value(Value::Number(n))
    }

    fn read_f64(r: &mut JsonReader) -> Result<f64, CodecError> {
        let v = r.take()?;
        v.as_f64()
            .ok_or_else(|| wire(format!("expected a number, got {v}")))
    }

    fn write_char(w: &mut JsonWriter, v: char) -> Result<(), CodecError> {
        w.push_value(Value::String(v.to_string()))
    }

    fn read_char(r: &mut JsonReader) -> Result<char, CodecError> {
        let s = Self::read_string(r)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(wire(format!("expected a single character, got {s:?}"))),
        }
    }

    fn write_str(w: &mut JsonWriter, v: &str) -> Result<(), CodecError> {
        w.push_value(Value::String(v.to_string()))
    }

    fn read_string(r: &mut JsonReader) -> Result<String, CodecError> {
        match r.take()? {
            Value::String(s) => Ok(s),
            v => Err(wire(format!("expected a string, got {v}"))),
        }
    }

    fn write_null(w: &mut JsonWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.push_value(Value::Null)
    }

    fn write_present(_w: &mut JsonWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn read_present(r: &mut JsonReader, _names: &WireNames) -> Result<bool, CodecError> {
        match r.peek() {
            Some(Value::Null) => {
                r.take()?;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Err(wire("no value pending")),
        }
    }

    fn record_begin(w: &mut JsonWriter, _fields: usize) -> Result<(), CodecError> {
        w.open_record(Map::new(), None);
        Ok(())
    }

    fn record_field(w: &mut JsonWriter, field: &str) -> Result<(), CodecError> {
        w.set_pending(field)
    }

    fn record_end(w: &mut JsonWriter) -> Result<(), CodecError> {
        w.close_record()
    }

    fn record_begin_read(r: &mut JsonReader) -> Result<(), CodecError> {
        match r.take()? {
            Value::Object(map) => {
                r.frames.push(ReadFrame::Record(map));
                Ok(())
            }
            v => Err(wire(format!("expected an object, got {v}"))),
        }
    }

    fn record_field_read(r: &mut JsonReader, field: &str) -> Result<(), CodecError> {
        match r.frames.last_mut() {
            Some(ReadFrame::Record(map)) => {
                let value = map
                    .remove(field)
                    .ok_or_else(|| CodecError::schema(field, "field missing from object"))?;
                r.current = Some(value);
                Ok(())
            }
            _ => Err(wire(format!("field `{field}` read outside an object"))),
        }
    }

    fn record_end_read(r: &mut JsonReader) -> Result<(), CodecError> {
        match r.frames.pop() {
            Some(ReadFrame::Record(_)) => Ok(()),
            _ => Err(wire("object closed without being open")),
        }
    }

    fn seq_begin(w: &mut JsonWriter, _len: usize) -> Result<(), CodecError> {
        w.open_seq();
        Ok(())
    }

    fn seq_elem(_w: &mut JsonWriter, _index: usize) -> Result<(), CodecError> {
        Ok(())
    }

    fn seq_end(w: &mut JsonWriter) -> Result<(), CodecError> {
        w.close_seq()
    }

    fn seq_begin_read(r: &mut JsonReader) -> Result<usize, CodecError> {
        match r.take()? {
            Value::Array(items) => {
                let len = items.len();
                r.frames.push(ReadFrame::Seq(items.into_iter()));
                Ok(len)
            }
            v => Err(wire(format!("expected an array, got {v}"))),
        }
    }

    fn seq_elem_read(r: &mut JsonReader, _index: usize) -> Result<(), CodecError> {
        match r.frames.last_mut() {
            Some(ReadFrame::Seq(items)) => {
                let value = items.next().ok_or_else(|| wire("array ended early"))?;
                r.current = Some(value);
                Ok(())
            }
            _ => Err(wire("element read outside an array")),
        }
    }

    fn seq_end_read(r: &mut JsonReader) -> Result<(), CodecError> {
        match r.frames.pop() {
            Some(ReadFrame::Seq(_)) => Ok(()),
            _ => Err(wire("array closed without being open")),
        }
    }

    fn map_begin(w: &mut JsonWriter, _len: usize) -> Result<(), CodecError> {
        w.open_record(Map::new(), None);
        Ok(())
    }

    fn map_key(w: &mut JsonWriter, key: &str) -> Result<(), CodecError> {
        w.set_pending(key)
    }

    fn map_end(w: &mut JsonWriter) -> Result<(), CodecError> {
        w.close_record()
    }

    fn map_begin_read(r: &mut JsonReader) -> Result<usize, CodecError> {
        match r.take()? {
            Value::Object(map) => {
                let len = map.len();
                r.frames.push(ReadFrame::Entries(map.into_iter()));
                Ok(len)
            }
            v => Err(wire(format!("expected an object, got {v}"))),
        }
    }

    fn map_key_read(r: &mut JsonReader) -> Result<String, CodecError> {
        match r.frames.last_mut() {
            Some(ReadFrame::Entries(entries)) => {
                let (key, value) = entries.next().ok_or_else(|| wire("object ended early"))?;
                r.current = Some(value);
                Ok(key)
            }
            _ => Err(wire("map key read outside an object")),
        }
    }

    fn map_end_read(r: &mut JsonReader) -> Result<(), CodecError> {
        match r.frames.pop() {
            Some(ReadFrame::Entries(_)) => Ok(()),
            _ => Err(wire("object closed without being open")),
        }
    }

    fn entries_begin(
        w: &mut JsonWriter,
        _len: usize,
        _names: &WireNames,
    ) -> Result<(), CodecError> {
        w.open_seq();
        Ok(())
    }

    fn entry_begin(w: &mut JsonWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.open_record(Map::new(), None);
        Ok(())
    }

    fn entry_key(w: &mut JsonWriter, names: &WireNames) -> Result<(), CodecError> {
        w.set_pending(&names.entry_key)
    }

    fn entry_value(w: &mut JsonWriter, names: &WireNames) -> Result<(), CodecError> {
        w.set_pending(&names.entry_value)
    }

    fn entry_end(w: &mut JsonWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.close_record()
    }

    fn entries_end(w: &mut JsonWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.close_seq()
    }

    fn entries_begin_read(
        r: &mut JsonReader,
        _names: &WireNames,
    ) -> Result<usize, CodecError> {
        Self::seq_begin_read(r)
    }

    fn entry_begin_read(r: &mut JsonReader, _names: &WireNames) -> Result<(), CodecError> {
        Self::seq_elem_read(r, 0)?;
        Self::record_begin_read(r)
    }

    fn entry_key_read(r: &mut JsonReader, names: &WireNames) -> Result<(), CodecError> {
        Self::record_field_read(r, &names.entry_key)
    }

    fn entry_value_read(r: &mut JsonReader, names: &WireNames) -> Result<(), CodecError> {
        Self::record_field_read(r, &names.entry_value)
    }

    fn entry_end_read(r: &mut JsonReader, _names: &WireNames) -> Result<(), CodecError> {
        Self::record_end_read(r)
    }

    fn entries_end_read(r: &mut JsonReader, _names: &WireNames) -> Result<(), CodecError> {
        Self::seq_end_read(r)
    }

    fn tag_begin(w: &mut JsonWriter, id: &str, names: &WireNames) -> Result<(), CodecError> {
        let mut map = Map::new();
        map.insert(names.tag_key.clone(), Value::String(id.to_string()));
        w.open_record(map, Some(names.payload_key.clone()));
        Ok(())
    }

    fn tag_end(w: &mut JsonWriter) -> Result<(), CodecError> {
        w.close_record()
    }

    fn tag_read(r: &mut JsonReader, names: &WireNames) -> Result<Option<String>, CodecError> {
        let tagged = matches!(r.peek(), Some(Value::Object(map)) if map.contains_key(&names.tag_key));
        if !tagged {
            return Ok(None);
        }
        let Value::Object(mut map) = r.take()? else {
            return Err(wire("tagged value vanished"));
        };
        let id = match map.remove(&names.tag_key) {
            Some(Value::String(id)) => id,
            _ => return Err(wire("type tag is not a string")),
        };
        let payload = map.remove(&names.payload_key).ok_or_else(|| {
            CodecError::schema(&id, format!("tagged value has no `{}` payload", names.payload_key))
        })?;
        r.current = Some(payload);
        Ok(Some(id))
    }

    fn tag_end_read(_r: &mut JsonReader) -> Result<(), CodecError> {
        Ok(())
    }
}

impl JsonCore {
    /// Encodes a registered value into a JSON tree.
    pub fn to_json_value<T: std::any::Any + Send + Sync>(
        &self,
        value: &T,
    ) -> Result<Value, CodecError> {
        let mut w = JsonWriter::new();
        self.encode(value, &mut w)?;
        w.finish()
    }

    /// Encodes a registered value into JSON text.
    pub fn to_json_string<T: std::any::Any + Send + Sync>(
        &self,
        value: &T,
    ) -> Result<String, CodecError> {
        let v = self.to_json_value(value)?;
        serde_json::to_string(&v).map_err(|e| wire(e.to_string()))
    }

    /// Decodes a registered value from a JSON tree.
    pub fn from_json_value<T: std::any::Any + Send + Sync>(
        &self,
        value: Value,
    ) -> Result<T, CodecError> {
        let mut r = JsonReader::new(value);
        self.decode(&mut r)
    }

    /// Decodes a registered value from JSON text.
    pub fn from_json_str<T: std::any::Any + Send + Sync>(
        &self,
        input: &str,
    ) -> Result<T, CodecError> {
        let value = serde_json::from_str(input).map_err(|e| wire(e.to_string()))?;
        self.from_json_value(value)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn writer_builds_nested_structures() {
        let names = WireNames::default();
        let mut w = JsonWriter::new();
        Json::record_begin(&mut w, 2).unwrap();
        Json::record_field(&mut w, "a").unwrap();
        Json::write_i32(&mut w, 1).unwrap();
        Json::record_field(&mut w, "b").unwrap();
        Json::seq_begin(&mut w, 2).unwrap();
        Json::seq_elem(&mut w, 0).unwrap();
        Json::write_bool(&mut w, true).unwrap();
        Json::seq_elem(&mut w, 1).unwrap();
        Json::write_null(&mut w, &names).unwrap();
        Json::seq_end(&mut w).unwrap();
        Json::record_end(&mut w).unwrap();
        assert_eq!(w.finish().unwrap(), json!({"a": 1, "b": [true, null]}));
    }

    #[test]
    fn writer_rejects_values_without_a_field_name() {
        let mut w = JsonWriter::new();
        Json::record_begin(&mut w, 1).unwrap();
        assert!(Json::write_i32(&mut w, 1).is_err());
    }

    #[test]
    fn reader_reads_fields_by_name_in_any_order() {
        let mut r = JsonReader::new(json!({"x": 5, "y": 6}));
        Json::record_begin_read(&mut r).unwrap();
        Json::record_field_read(&mut r, "y").unwrap();
        assert_eq!(Json::read_i32(&mut r).unwrap(), 6);
        Json::record_field_read(&mut r, "x").unwrap();
        assert_eq!(Json::read_i32(&mut r).unwrap(), 5);
        Json::record_end_read(&mut r).unwrap();
    }

    #[test]
    fn missing_field_is_a_schema_mismatch() {
        let mut r = JsonReader::new(json!({"x": 5}));
        Json::record_begin_read(&mut r).unwrap();
        let err = Json::record_field_read(&mut r, "gone").unwrap_err();
        assert!(matches!(err, CodecError::SchemaMismatch { .. }));
    }

    #[test]
    fn tags_wrap_and_unwrap() {
        let names = WireNames::default();
        let mut w = JsonWriter::new();
        Json::tag_begin(&mut w, "String", &names).unwrap();
        Json::write_str(&mut w, "hello").unwrap();
        Json::tag_end(&mut w).unwrap();
        let value = w.finish().unwrap();
        assert_eq!(value, json!({"@type": "String", "@value": "hello"}));

        let mut r = JsonReader::new(value);
        assert_eq!(
            Json::tag_read(&mut r, &names).unwrap().as_deref(),
            Some("String")
        );
        assert_eq!(Json::read_string(&mut r).unwrap(), "hello");

        let mut untagged = JsonReader::new(json!(42));
        assert!(Json::tag_read(&mut untagged, &names).unwrap().is_none());
        assert_eq!(Json::read_i32(&mut untagged).unwrap(), 42);
    }

    #[test]
    fn null_peeking_consumes_only_nulls() {
        let names = WireNames::default();
        let mut r = JsonReader::new(json!(null));
        assert!(!Json::read_present(&mut r, &names).unwrap());

        let mut r = JsonReader::new(json!(7));
        assert!(Json::read_present(&mut r, &names).unwrap());
        assert_eq!(Json::read_i32(&mut r).unwrap(), 7);
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let mut r = JsonReader::new(json!(300));
        assert!(Json::read_i8(&mut r).is_err());
        let mut r = JsonReader::new(json!(-1));
        assert!(Json::read_u32(&mut r).is_err());
    }
}
