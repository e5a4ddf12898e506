//! The XML adapter.
//!
//! Each value occupies a dedicated element whose name comes from the parent
//! context: record fields are children named after the field, sequence
//! elements are positional children (`_0`, `_1`, …), string-keyed map
//! entries are children named after the key, and general map entries are
//! children with the configured entry/key/value names. Type tags and null
//! markers are attributes. The element tree is the wire form; text is
//! produced and consumed through `quick-xml` events.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::config::WireNames;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;

/// A core speaking the XML wire form.
pub type XmlCore = CodecCore<Xml>;

const FORMAT: &str = "XML";

fn wire(detail: impl Into<String>) -> CodecError {
    CodecError::wire(FORMAT, detail.into())
}

/// The XML format marker.
pub struct Xml;

/// One element of the XML wire form: a name, attributes, and either text
/// content or child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// The value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the element to XML text.
    pub fn to_xml(&self) -> Result<String, CodecError> {
        let mut writer = quick_xml::Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| wire(e.to_string()))
    }

    fn write_into(&self, writer: &mut quick_xml::Writer<Vec<u8>>) -> Result<(), CodecError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (attr, value) in &self.attrs {
            start.push_attribute((attr.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| wire(e.to_string()))?;
            return Ok(());
        }
        writer
            .write_event(Event::Start(start))
            .map_err(|e| wire(e.to_string()))?;
        if self.children.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| wire(e.to_string()))?;
        } else {
            for child in &self.children {
                child.write_into(writer)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| wire(e.to_string()))?;
        Ok(())
    }

    /// Parses a single element from XML text.
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        let mut reader = quick_xml::Reader::from_str(input);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        loop {
            let event = reader.read_event().map_err(|e| wire(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        let raw = std::str::from_utf8(&text)
                            .map_err(|e| wire(e.to_string()))?;
                        let unescaped = quick_xml::escape::unescape(raw)
                            .map_err(|e| wire(e.to_string()))?;
                        top.text.push_str(&unescaped);
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| wire("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(wire("unclosed element at end of input"));
        }
        root.ok_or_else(|| wire("no root element"))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, CodecError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| wire(e.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| wire(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| wire(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| wire(e.to_string()))?
            .into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(wire("more than one root element"));
            }
            *root = Some(element);
            Ok(())
        }
    }
}

struct WriteFrame {
    element: Element,
    pending: Option<String>,
}

/// Builds an [`Element`] tree from the structural calls of the codec core.
/// Every value lands in an element named by its parent context; the writer
/// tracks that pending name plus any attributes announced for the next
/// element.
pub struct XmlWriter {
    frames: Vec<WriteFrame>,
    pending_attrs: Vec<(String, String)>,
}

impl XmlWriter {
    /// Starts a document whose single root element carries `root_name`.
    pub fn new(root_name: &str) -> Self {
        Self {
            frames: vec![WriteFrame {
                element: Element::new("#document"),
                pending: Some(root_name.to_string()),
            }],
            pending_attrs: Vec::new(),
        }
    }

    /// The finished root element.
    pub fn finish(mut self) -> Result<Element, CodecError> {
        if self.frames.len() != 1 {
            return Err(wire("unclosed structure at end of encode"));
        }
        let document = self.frames.pop().ok_or_else(|| wire("writer has no document"))?;
        let mut children = document.element.children;
        match (children.pop(), children.pop()) {
            (Some(root), None) => Ok(root),
            _ => Err(wire("expected exactly one root element")),
        }
    }

    fn take_name(&mut self) -> Result<String, CodecError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| wire("write outside the document"))?;
        frame
            .pending
            .take()
            .ok_or_else(|| wire("value written without an element name"))
    }

    fn new_element(&mut self) -> Result<Element, CodecError> {
        let name = self.take_name()?;
        let mut element = Element::new(name);
        element.attrs.append(&mut self.pending_attrs);
        Ok(element)
    }

    fn leaf(&mut self, text: String) -> Result<(), CodecError> {
        let mut element = self.new_element()?;
        element.text = text;
        self.attach_child(element)
    }

    fn attach_child(&mut self, element: Element) -> Result<(), CodecError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| wire("write outside the document"))?;
        frame.element.children.push(element);
        Ok(())
    }

    fn begin(&mut self) -> Result<(), CodecError> {
        let element = self.new_element()?;
        self.frames.push(WriteFrame {
            element,
            pending: None,
        });
        Ok(())
    }

    fn begin_named(&mut self, name: &str) -> Result<(), CodecError> {
        let mut element = Element::new(name);
        element.attrs.append(&mut self.pending_attrs);
        self.frames.push(WriteFrame {
            element,
            pending: None,
        });
        Ok(())
    }

    fn end(&mut self) -> Result<(), CodecError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| wire("structure closed without being open"))?;
        if frame.pending.is_some() {
            return Err(wire("structure closed with an unwritten value"));
        }
        self.attach_child(frame.element)
    }

    fn set_pending(&mut self, name: &str) -> Result<(), CodecError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| wire("write outside the document"))?;
        if frame.pending.is_some() {
            return Err(wire(format!("element `{name}` opened before the previous value was written")));
        }
        frame.pending = Some(name.to_string());
        Ok(())
    }
}

enum ReadFrame {
    Record(Vec<Option<Element>>),
    Seq(std::collections::VecDeque<Element>),
}

/// Walks an [`Element`] tree for the structural calls of the codec core.
pub struct XmlReader {
    current: Option<Element>,
    frames: Vec<ReadFrame>,
}

impl XmlReader {
    pub fn new(root: Element) -> Self {
        Self {
            current: Some(root),
            frames: Vec::new(),
        }
    }

    fn take(&mut self) -> Result<Element, CodecError> {
        self.current
            .take()
            .ok_or_else(|| wire("no element pending"))
    }

    fn take_text(&mut self) -> Result<String, CodecError> {
        let element = self.take()?;
        if !element.children.is_empty() {
            return Err(wire(format!("element `{}` holds children, not text", element.name)));
        }
        Ok(element.text)
    }

    fn parse_text<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, CodecError> {
        let text = self.take_text()?;
        text.trim()
            .parse()
            .map_err(|_| wire(format!("expected {what}, got {text:?}")))
    }

    fn next_child(&mut self) -> Result<Element, CodecError> {
        match self.frames.last_mut() {
            Some(ReadFrame::Seq(children)) => children
                .pop_front()
                .ok_or_else(|| wire("element ran out of children")),
            _ => Err(wire("child read outside a sequence")),
        }
    }

    fn named_child(&mut self, name: &str) -> Result<Element, CodecError> {
        match self.frames.last_mut() {
            Some(ReadFrame::Record(children)) => {
                let slot = children.iter_mut().find(
                    |slot| matches!(slot, Some(child) if child.name == name),
                );
                match slot {
                    Some(slot) => slot
                        .take()
                        .ok_or_else(|| CodecError::schema(name, "child element missing")),
                    None => Err(CodecError::schema(name, "child element missing")),
                }
            }
            _ => Err(wire(format!("element `{name}` read outside a record"))),
        }
    }
}

macro_rules! xml_text_atoms {
    ($($write:ident / $read:ident : $ty:ty => $what:literal),* $(,)?) => {
        $(
            fn $write(w: &mut XmlWriter, v: $ty) -> Result<(), CodecError> {
                w.leaf(v.to_string())
            }

            fn $read(r: &mut XmlReader) -> Result<$ty, CodecError> {
                r.parse_text($what)
            }
        )*
    };
}

impl Format for Xml {
    type Writer = XmlWriter;
    type Reader = XmlReader;

    const NAME: &'static str = FORMAT;

    xml_text_atoms! {
        write_bool / read_bool: bool => "a boolean",
        write_i8 / read_i8: i8 => "an integer",
        write_i16 / read_i16: i16 => "an integer",
        write_i32 / read_i32: i32 => "an integer",
        write_i64 / read_i64: i64 => "an integer",
        write_u8 / read_u8: u8 => "an unsigned integer",
        write_u16 / read_u16: u16 => "an unsigned integer",
        write_u32 / read_u32: u32 => "an unsigned integer",
        write_u64 / read_u64: u64 => "an unsigned integer",
        write_f32 / read_f32: f32 => "a number",
        write_f64 / read_f64: f64 => "a number",
    }

    fn write_char(w: &mut XmlWriter, v: char) -> Result<(), CodecError> {
        w.leaf(v.to_string())
    }

    fn read_char(r: &mut XmlReader) -> Result<char, CodecError> {
        let text = r.take_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(wire(format!("expected a single character, got {text:?}"))),
        }
    }

    fn write_str(w: &mut XmlWriter, v: &str) -> Result<(), CodecError> {
        w.leaf(v.to_string())
    }

    fn read_string(r: &mut XmlReader) -> Result<String, CodecError> {
        r.take_text()
    }

    fn write_null(w: &mut XmlWriter, names: &WireNames) -> Result<(), CodecError> {
        w.pending_attrs
            .push((names.xml_null_attr.clone(), "true".to_string()));
        w.leaf(String::new())
    }

    fn write_present(_w: &mut XmlWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn read_present(r: &mut XmlReader, names: &WireNames) -> Result<bool, CodecError> {
        let is_null = r
            .current
            .as_ref()
            .ok_or_else(|| wire("no element pending"))?
            .attr(&names.xml_null_attr)
            == Some("true");
        if is_null {
            r.take()?;
            return Ok(false);
        }
        Ok(true)
    }

    fn record_begin(w: &mut XmlWriter, _fields: usize) -> Result<(), CodecError> {
        w.begin()
    }

    fn record_field(w: &mut XmlWriter, field: &str) -> Result<(), CodecError> {
        w.set_pending(field)
    }

    fn record_end(w: &mut XmlWriter) -> Result<(), CodecError> {
        w.end()
    }

    fn record_begin_read(r: &mut XmlReader) -> Result<(), CodecError> {
        let element = r.take()?;
        r.frames.push(ReadFrame::Record(
            element.children.into_iter().map(Some).collect(),
        ));
        Ok(())
    }

    fn record_field_read(r: &mut XmlReader, field: &str) -> Result<(), CodecError> {
        let child = r.named_child(field)?;
        r.current = Some(child);
        Ok(())
    }

    fn record_end_read(r: &mut XmlReader) -> Result<(), CodecError> {
        match r.frames.pop() {
            Some(ReadFrame::Record(_)) => Ok(()),
            _ => Err(wire("record closed without being open")),
        }
    }

    fn seq_begin(w: &mut XmlWriter, _len: usize) -> Result<(), CodecError> {
        w.begin()
    }

    fn seq_elem(w: &mut XmlWriter, index: usize) -> Result<(), CodecError> {
        w.set_pending(&format!("_{index}"))
    }

    fn seq_end(w: &mut XmlWriter) -> Result<(), CodecError> {
        w.end()
    }

    fn seq_begin_read(r: &mut XmlReader) -> Result<usize, CodecError> {
        let element = r.take()?;
        let len = element.children.len();
        r.frames
            .push(ReadFrame::Seq(element.children.into_iter().collect()));
        Ok(len)
    }

    fn seq_elem_read(r: &mut XmlReader, _index: usize) -> Result<(), CodecError> {
        let child = r.next_child()?;
        r.current = Some(child);
        Ok(())
    }

    fn seq_end_read(r: &mut XmlReader) -> Result<(), CodecError> {
        match r.frames.pop() {
            Some(ReadFrame::Seq(_)) => Ok(()),
            _ => Err(wire("sequence closed without being open")),
        }
    }

    fn map_begin(w: &mut XmlWriter, _len: usize) -> Result<(), CodecError> {
        w.begin()
    }

    fn map_key(w: &mut XmlWriter, key: &str) -> Result<(), CodecError> {
        w.set_pending(key)
    }

    fn map_end(w: &mut XmlWriter) -> Result<(), CodecError> {
        w.end()
    }

    fn map_begin_read(r: &mut XmlReader) -> Result<usize, CodecError> {
        Self::seq_begin_read(r)
    }

    fn map_key_read(r: &mut XmlReader) -> Result<String, CodecError> {
        let child = r.next_child()?;
        let key = child.name.clone();
        r.current = Some(child);
        Ok(key)
    }

    fn map_end_read(r: &mut XmlReader) -> Result<(), CodecError> {
        Self::seq_end_read(r)
    }

    fn entries_begin(
        w: &mut XmlWriter,
        _len: usize,
        _names: &WireNames,
    ) -> Result<(), CodecError> {
        w.begin()
    }

    fn entry_begin(w: &mut XmlWriter, names: &WireNames) -> Result<(), CodecError> {
        w.begin_named(&names.xml_entry)
    }

    fn entry_key(w: &mut XmlWriter, names: &WireNames) -> Result<(), CodecError> {
        w.set_pending(&names.xml_key)
    }

    fn entry_value(w: &mut XmlWriter, names: &WireNames) -> Result<(), CodecError> {
        w.set_pending(&names.xml_value)
    }

    fn entry_end(w: &mut XmlWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.end()
    }

    fn entries_end(w: &mut XmlWriter, _names: &WireNames) -> Result<(), CodecError> {
        w.end()
    }

    fn entries_begin_read(
        r: &mut XmlReader,
        _names: &WireNames,
    ) -> Result<usize, CodecError> {
        Self::seq_begin_read(r)
    }

    fn entry_begin_read(r: &mut XmlReader, _names: &WireNames) -> Result<(), CodecError> {
        let child = r.next_child()?;
        r.frames.push(ReadFrame::Record(
            child.children.into_iter().map(Some).collect(),
        ));
        Ok(())
    }

    fn entry_key_read(r: &mut XmlReader, names: &WireNames) -> Result<(), CodecError> {
        Self::record_field_read(r, &names.xml_key)
    }

    fn entry_value_read(r: &mut XmlReader, names: &WireNames) -> Result<(), CodecError> {
        Self::record_field_read(r, &names.xml_value)
    }

    fn entry_end_read(r: &mut XmlReader, _names: &WireNames) -> Result<(), CodecError> {
        Self::record_end_read(r)
    }

    fn entries_end_read(r: &mut XmlReader, _names: &WireNames) -> Result<(), CodecError> {
        Self::seq_end_read(r)
    }

    fn tag_begin(w: &mut XmlWriter, id: &str, names: &WireNames) -> Result<(), CodecError> {
        w.pending_attrs
            .push((names.xml_type_attr.clone(), id.to_string()));
        Ok(())
    }

    fn tag_end(_w: &mut XmlWriter) -> Result<(), CodecError> {
        Ok(())
    }

    fn tag_read(r: &mut XmlReader, names: &WireNames) -> Result<Option<String>, CodecError> {
        let element = r
            .current
            .as_ref()
            .ok_or_else(|| wire("no element pending"))?;
        Ok(element.attr(&names.xml_type_attr).map(str::to_string))
    }

    fn tag_end_read(_r: &mut XmlReader) -> Result<(), CodecError> {
        Ok(())
    }
}

impl XmlCore {
    /// Encodes a registered value into an element tree rooted at the
    /// configured root element name.
    pub fn to_xml_element<T: std::any::Any + Send + Sync>(
        &self,
        value: &T,
    ) -> Result<Element, CodecError> {
        let mut w = XmlWriter::new(&self.config().names().xml_root);
        self.encode(value, &mut w)?;
        w.finish()
    }

    /// Encodes a registered value into XML text.
    pub fn to_xml_string<T: std::any::Any + Send + Sync>(
        &self,
        value: &T,
    ) -> Result<String, CodecError> {
        self.to_xml_element(value)?.to_xml()
    }

    /// Decodes a registered value from an element tree.
    pub fn from_xml_element<T: std::any::Any + Send + Sync>(
        &self,
        root: Element,
    ) -> Result<T, CodecError> {
        let mut r = XmlReader::new(root);
        self.decode(&mut r)
    }

    /// Decodes a registered value from XML text.
    pub fn from_xml_str<T: std::any::Any + Send + Sync>(
        &self,
        input: &str,
    ) -> Result<T, CodecError> {
        self.from_xml_element(Element::parse(input)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn element_text_round_trips_through_xml() {
        let mut root = Element::new("note");
        root.attrs.push(("kind".to_string(), "memo".to_string()));
        let mut body = Element::new("body");
        body.text = "fish & <chips>".to_string();
        root.children.push(body);
        root.children.push(Element::new("empty"));

        let text = root.to_xml().unwrap();
        assert!(text.contains("&amp;"));
        assert_eq!(Element::parse(&text).unwrap(), root);
    }

    #[test]
    fn parse_rejects_unbalanced_input() {
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(Element::parse("").is_err());
    }

    #[test]
    fn writer_names_values_from_parent_context() {
        let names = WireNames::default();
        let mut w = XmlWriter::new("value");
        Xml::record_begin(&mut w, 2).unwrap();
        Xml::record_field(&mut w, "id").unwrap();
        Xml::write_i32(&mut w, 9).unwrap();
        Xml::record_field(&mut w, "tags").unwrap();
        Xml::seq_begin(&mut w, 2).unwrap();
        Xml::seq_elem(&mut w, 0).unwrap();
        Xml::write_str(&mut w, "a").unwrap();
        Xml::seq_elem(&mut w, 1).unwrap();
        Xml::write_null(&mut w, &names).unwrap();
        Xml::seq_end(&mut w).unwrap();
        Xml::record_end(&mut w).unwrap();

        let root = w.finish().unwrap();
        assert_eq!(root.name, "value");
        assert_eq!(root.children[0].name, "id");
        assert_eq!(root.children[0].text, "9");
        assert_eq!(root.children[1].name, "tags");
        assert_eq!(root.children[1].children[0].name, "_0");
        assert_eq!(
            root.children[1].children[1].attr(&names.xml_null_attr),
            Some("true")
        );
    }

    #[test]
    fn reader_finds_record_children_by_name() {
        let mut root = Element::new("value");
        let mut a = Element::new("a");
        a.text = "1".to_string();
        let mut b = Element::new("b");
        b.text = "2".to_string();
        root.children.push(a);
        root.children.push(b);

        let mut r = XmlReader::new(root);
        Xml::record_begin_read(&mut r).unwrap();
        Xml::record_field_read(&mut r, "b").unwrap();
        assert_eq!(Xml::read_i32(&mut r).unwrap(), 2);
        Xml::record_field_read(&mut r, "a").unwrap();
        assert_eq!(Xml::read_i32(&mut r).unwrap(), 1);
        let missing = Xml::record_field_read(&mut r, "c").unwrap_err();
        assert!(matches!(missing, CodecError::SchemaMismatch { .. }));
    }

    #[test]
    fn tags_ride_on_attributes() {
        let names = WireNames::default();
        let mut w = XmlWriter::new("value");
        Xml::tag_begin(&mut w, "String", &names).unwrap();
        Xml::write_str(&mut w, "hi").unwrap();
        Xml::tag_end(&mut w).unwrap();
        let root = w.finish().unwrap();
        assert_eq!(root.attr(&names.xml_type_attr), Some("String"));

        let mut r = XmlReader::new(root);
        assert_eq!(
            Xml::tag_read(&mut r, &names).unwrap().as_deref(),
            Some("String")
        );
        assert_eq!(Xml::read_string(&mut r).unwrap(), "hi");
    }
}
