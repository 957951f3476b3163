//! One codec per content type.
//!
//! Structured formats (JSON, XML, YAML) are decoded into a JSON tree, edited
//! with the shared primitives and encoded back into their own format. Text
//! bodies only support literal edits. On XML and YAML, RPL is a literal
//! replace over the whole document and DEL is a no-op.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::fmt::Display;

use super::modifier::{modify_json, ModifierAction};
use super::{parse_value, TransformError};
use crate::model::ContentType;

pub trait BodyCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, raw: &[u8]) -> Result<Value, TransformError>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, TransformError>;

    /// Apply one modifier action at `key`. `value` is parsed as JSON-or-literal.
    fn modify(
        &self,
        raw: &[u8],
        action: ModifierAction,
        key: &str,
        value: &str,
    ) -> Result<Vec<u8>, TransformError> {
        modify_tree(self, raw, action, key, value)
    }

    /// Decode, run a tree-to-tree function, encode.
    fn reshape(&self, raw: &[u8], f: &dyn Fn(Value) -> Value) -> Result<Vec<u8>, TransformError> {
        let tree = self.decode(raw)?;
        self.encode(&f(tree))
    }
}

pub fn for_content_type(content_type: ContentType) -> &'static dyn BodyCodec {
    static TEXT: TextCodec = TextCodec;
    static JSON: JsonCodec = JsonCodec;
    static XML: XmlCodec = XmlCodec;
    static YAML: YamlCodec = YamlCodec;

    match content_type {
        ContentType::Text => &TEXT,
        ContentType::Json => &JSON,
        ContentType::Xml => &XML,
        ContentType::Yaml => &YAML,
    }
}

fn modify_tree<C: BodyCodec + ?Sized>(
    codec: &C,
    raw: &[u8],
    action: ModifierAction,
    key: &str,
    value: &str,
) -> Result<Vec<u8>, TransformError> {
    let tree = codec.decode(raw)?;
    let modified = modify_json(tree, action, key, parse_value(value))?;
    codec.encode(&modified)
}

/// RPL and DEL on a non-JSON structured document.
fn modify_literal(raw: &[u8], action: ModifierAction, key: &str, value: &str) -> Vec<u8> {
    match action {
        ModifierAction::Replace if !key.is_empty() => String::from_utf8_lossy(raw)
            .replace(key, value)
            .into_bytes(),
        _ => raw.to_vec(),
    }
}

fn decode_err(content_type: &'static str, e: impl Display) -> TransformError {
    TransformError::Decode {
        content_type,
        message: e.to_string(),
    }
}

fn encode_err(content_type: &'static str, e: impl Display) -> TransformError {
    TransformError::Encode {
        content_type,
        message: e.to_string(),
    }
}

pub struct TextCodec;

impl BodyCodec for TextCodec {
    fn name(&self) -> &'static str {
        "TEXT"
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, TransformError> {
        Ok(Value::String(String::from_utf8_lossy(raw).into_owned()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, TransformError> {
        Ok(match value {
            Value::String(s) => s.clone().into_bytes(),
            Value::Null => Vec::new(),
            other => other.to_string().into_bytes(),
        })
    }

    fn modify(
        &self,
        raw: &[u8],
        action: ModifierAction,
        key: &str,
        value: &str,
    ) -> Result<Vec<u8>, TransformError> {
        let text = String::from_utf8_lossy(raw);
        let modified = match action {
            ModifierAction::Add | ModifierAction::Append => format!("{}{}", text, value),
            ModifierAction::Set => value.to_string(),
            ModifierAction::Replace if !key.is_empty() => text.replace(key, value),
            ModifierAction::Delete if !key.is_empty() => text.replace(key, ""),
            ModifierAction::Replace | ModifierAction::Delete => text.into_owned(),
        };
        Ok(modified.into_bytes())
    }

    fn reshape(&self, raw: &[u8], _f: &dyn Fn(Value) -> Value) -> Result<Vec<u8>, TransformError> {
        Ok(raw.to_vec())
    }
}

pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, TransformError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(raw).map_err(|e| decode_err(self.name(), e))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, TransformError> {
        serde_json::to_vec(value).map_err(|e| encode_err(self.name(), e))
    }
}

pub struct YamlCodec;

impl BodyCodec for YamlCodec {
    fn name(&self) -> &'static str {
        "YAML"
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, TransformError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_yaml::from_slice(raw).map_err(|e| decode_err(self.name(), e))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, TransformError> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| encode_err(self.name(), e))
    }

    fn modify(
        &self,
        raw: &[u8],
        action: ModifierAction,
        key: &str,
        value: &str,
    ) -> Result<Vec<u8>, TransformError> {
        match action {
            ModifierAction::Replace | ModifierAction::Delete => {
                Ok(modify_literal(raw, action, key, value))
            }
            _ => modify_tree(self, raw, action, key, value),
        }
    }
}

/// XML ⇄ JSON tree.
///
/// Attributes become `-name` keys, mixed text content becomes `#text`, and
/// repeated child elements become arrays. Leaf values are strings.
pub struct XmlCodec;

const XML_ROOT: &str = "root";
const XML_ITEM: &str = "item";
const XML_TEXT_KEY: &str = "#text";

struct OpenElement {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn new(name: String, children: Map<String, Value>) -> Self {
        Self {
            name,
            children,
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert(XML_TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

fn xml_attributes(start: &BytesStart) -> Result<Map<String, Value>, TransformError> {
    let mut attributes = Map::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| decode_err("XML", e))?;
        let key = format!("-{}", String::from_utf8_lossy(attribute.key.as_ref()));
        let value = attribute
            .unescape_value()
            .map_err(|e| decode_err("XML", e))?;
        attributes.insert(key, Value::String(value.into_owned()));
    }
    Ok(attributes)
}

/// Element names must start with a letter or underscore.
fn xml_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), TransformError> {
    let name = xml_name(name);
    match value {
        Value::Null => {
            writer
                .write_event(Event::Empty(BytesStart::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(name.as_str());
            for (key, attr) in map.iter().filter(|(k, _)| k.starts_with('-')) {
                start.push_attribute((xml_name(&key[1..]).as_str(), scalar_text(attr).as_str()));
            }
            writer
                .write_event(Event::Start(start))
                .map_err(|e| encode_err("XML", e))?;
            for (key, child) in map.iter().filter(|(k, _)| !k.starts_with('-')) {
                match child {
                    _ if key == XML_TEXT_KEY => {
                        writer
                            .write_event(Event::Text(BytesText::new(&scalar_text(child))))
                            .map_err(|e| encode_err("XML", e))?;
                    }
                    Value::Array(items) => {
                        for item in items {
                            write_element(writer, key, item)?;
                        }
                    }
                    _ => write_element(writer, key, child)?,
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
            for item in items {
                write_element(writer, XML_ITEM, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
        }
        scalar => {
            writer
                .write_event(Event::Start(BytesStart::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
            writer
                .write_event(Event::Text(BytesText::new(&scalar_text(scalar))))
                .map_err(|e| encode_err("XML", e))?;
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(|e| encode_err("XML", e))?;
        }
    }
    Ok(())
}

impl BodyCodec for XmlCodec {
    fn name(&self) -> &'static str {
        "XML"
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, TransformError> {
        let mut reader = Reader::from_reader(raw);
        reader.config_mut().trim_text(true);

        let mut stack = vec![OpenElement::new(String::new(), Map::new())];
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    stack.push(OpenElement::new(name, xml_attributes(&start)?));
                }
                Ok(Event::Empty(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    let (name, value) = OpenElement::new(name, xml_attributes(&start)?).into_value();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.children, name, value);
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| decode_err(self.name(), e))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Ok(Event::End(_)) => {
                    if stack.len() < 2 {
                        return Err(decode_err(self.name(), "unexpected closing tag"));
                    }
                    let (name, value) = match stack.pop() {
                        Some(element) => element.into_value(),
                        None => break,
                    };
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.children, name, value);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(decode_err(self.name(), e)),
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(decode_err(self.name(), "unclosed element"));
        }
        match stack.pop() {
            Some(document) => Ok(document.into_value().1),
            None => Ok(Value::Null),
        }
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, TransformError> {
        encode_xml(value, true)
    }

    fn modify(
        &self,
        raw: &[u8],
        action: ModifierAction,
        key: &str,
        value: &str,
    ) -> Result<Vec<u8>, TransformError> {
        match action {
            ModifierAction::Replace | ModifierAction::Delete => {
                Ok(modify_literal(raw, action, key, value))
            }
            _ => {
                let tree = self.decode(raw)?;
                let modified = modify_json(tree, action, key, parse_value(value))?;
                encode_xml(&modified, has_declaration(raw))
            }
        }
    }

    fn reshape(&self, raw: &[u8], f: &dyn Fn(Value) -> Value) -> Result<Vec<u8>, TransformError> {
        let tree = self.decode(raw)?;
        encode_xml(&f(tree), has_declaration(raw))
    }
}

fn has_declaration(raw: &[u8]) -> bool {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    raw[start..].starts_with(b"<?xml")
}

/// A single element key becomes the document root; anything else is wrapped in `<root>`.
fn encode_xml(value: &Value, declaration: bool) -> Result<Vec<u8>, TransformError> {
    let mut writer = Writer::new(Vec::new());
    if declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| encode_err("XML", e))?;
    }

    match value {
        Value::Object(map) if map.len() == 1 => match map.iter().next() {
            Some((name, inner)) if !name.starts_with('-') && name != XML_TEXT_KEY => {
                write_element(&mut writer, name, inner)?
            }
            _ => write_element(&mut writer, XML_ROOT, value)?,
        },
        other => write_element(&mut writer, XML_ROOT, other)?,
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_literal_edits() {
        let codec = for_content_type(ContentType::Text);

        let added = codec.modify(b"hello", ModifierAction::Add, "", " world").unwrap();
        assert_eq!(added, b"hello world");

        let replaced = codec.modify(b"a-b-a", ModifierAction::Replace, "a", "x").unwrap();
        assert_eq!(replaced, b"x-b-x");

        let deleted = codec.modify(b"secret token", ModifierAction::Delete, "secret ", "").unwrap();
        assert_eq!(deleted, b"token");
    }

    #[test]
    fn test_empty_json_decodes_to_null() {
        let codec = for_content_type(ContentType::Json);
        assert_eq!(codec.decode(b"").unwrap(), Value::Null);
        assert!(codec.decode(b"{broken").is_err());
    }

    #[test]
    fn test_xml_decode_structure() {
        let codec = for_content_type(ContentType::Xml);
        let xml = br#"<?xml version="1.0"?>
            <user id="7"><name>Ana</name><role>admin</role><role>dev</role></user>"#;

        let value = codec.decode(xml).unwrap();
        assert_eq!(
            value,
            json!({"user": {"-id": "7", "name": "Ana", "role": ["admin", "dev"]}})
        );
    }

    #[test]
    fn test_xml_modify_roundtrips_through_tree() {
        let codec = for_content_type(ContentType::Xml);
        let raw = b"<user><name>Ana</name></user>";

        let modified = codec
            .modify(raw, ModifierAction::Set, "user.city", "Lisbon")
            .unwrap();
        let value = codec.decode(&modified).unwrap();
        assert_eq!(value["user"]["city"], "Lisbon");
        assert_eq!(value["user"]["name"], "Ana");
    }

    #[test]
    fn test_xml_replace_is_literal() {
        let codec = for_content_type(ContentType::Xml);

        let replaced = codec
            .modify(b"<a>foo</a>", ModifierAction::Replace, "foo", "bar")
            .unwrap();
        assert_eq!(replaced, b"<a>bar</a>");

        let untouched = codec
            .modify(b"<a>foo</a>", ModifierAction::Delete, "a", "")
            .unwrap();
        assert_eq!(untouched, b"<a>foo</a>");
    }

    #[test]
    fn test_xml_scalar_root_survives_reshape() {
        let codec = for_content_type(ContentType::Xml);

        let same = codec.reshape(b"<a>foo</a>", &|v| v).unwrap();
        assert_eq!(same, b"<a>foo</a>");

        let declared = br#"<?xml version="1.0" encoding="UTF-8"?><a>foo</a>"#;
        let same = codec.reshape(declared, &|v| v).unwrap();
        assert_eq!(same, declared.to_vec());
    }

    #[test]
    fn test_xml_encode_top_level_array() {
        let codec = for_content_type(ContentType::Xml);
        let raw = codec.encode(&json!([1, 2])).unwrap();
        let text = String::from_utf8(raw).unwrap();

        assert!(text.contains("<root><item>1</item><item>2</item></root>"));
    }

    #[test]
    fn test_yaml_replace_is_literal() {
        let codec = for_content_type(ContentType::Yaml);
        let raw = b"name: Ana\nrole: admin\n";

        let replaced = codec.modify(raw, ModifierAction::Replace, "admin", "dev").unwrap();
        assert_eq!(replaced, b"name: Ana\nrole: dev\n");

        let untouched = codec.modify(raw, ModifierAction::Delete, "role", "").unwrap();
        assert_eq!(untouched, raw.to_vec());
    }

    #[test]
    fn test_yaml_roundtrip_through_tree() {
        let codec = for_content_type(ContentType::Yaml);
        let modified = codec
            .modify(b"name: Ana\n", ModifierAction::Set, "age", "30")
            .unwrap();

        assert_eq!(codec.decode(&modified).unwrap(), json!({"name": "Ana", "age": 30}));
    }
}
