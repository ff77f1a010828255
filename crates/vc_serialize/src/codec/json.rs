use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Value};

use crate::codec::{
    CodecError, LoadFilter, MAX_ELEMENT_DEPTH, OBJECT_STREAM_VERSION, STREAM_TAG, check_depth,
    check_version, leaf_text, parse_uuid, type_name,
};
use crate::reflection::uuid_to_string;
use crate::registry::TypeRegistry;
use crate::tree::{DataElementNode, ElementData};

const OBJECTS: &str = "Objects";

/// JSON nesting of a stream whose elements reach [`MAX_ELEMENT_DEPTH`]: the
/// stream object and its array, then an object and an array per element.
const MAX_NESTING: usize = 2 * MAX_ELEMENT_DEPTH + 2;

// -----------------------------------------------------------------------------
// Encoding

pub(super) fn encode(
    registry: &TypeRegistry,
    roots: &[DataElementNode],
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let objects = roots
        .iter()
        .map(|root| to_value(registry, root))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stream = Map::new();
    stream.insert("name".into(), Value::from(STREAM_TAG));
    stream.insert("version".into(), Value::from(OBJECT_STREAM_VERSION));
    stream.insert(OBJECTS.into(), Value::Array(objects));

    serde_json::to_writer_pretty(out, &Value::Object(stream))?;
    Ok(())
}

fn to_value(registry: &TypeRegistry, node: &DataElementNode) -> Result<Value, CodecError> {
    let mut object = Map::new();
    if !node.name().is_empty() {
        object.insert("field".into(), Value::from(node.name()));
    }
    let name = type_name(registry, node);
    if !name.is_empty() {
        object.insert("typeName".into(), Value::from(name));
    }
    object.insert("typeId".into(), Value::from(uuid_to_string(&node.type_id())));
    if node.version() != 0 {
        object.insert("version".into(), Value::from(node.version()));
    }
    if let Some(value) = leaf_text(registry, node)? {
        object.insert("value".into(), Value::from(value.into_owned()));
    }
    if !node.children().is_empty() {
        let children = node
            .children()
            .iter()
            .map(|child| to_value(registry, child))
            .collect::<Result<Vec<_>, _>>()?;
        object.insert(OBJECTS.into(), Value::Array(children));
    }
    Ok(Value::Object(object))
}

// -----------------------------------------------------------------------------
// Decoding

pub(super) fn decode(bytes: &[u8], filter: &LoadFilter) -> Result<Vec<DataElementNode>, CodecError> {
    // The parser recurses per level, so the bound is checked before parsing.
    if nesting_exceeds(bytes, MAX_NESTING) {
        return Err(CodecError::TooDeep {
            max: MAX_ELEMENT_DEPTH,
        });
    }
    let mut reader = serde_json::Deserializer::from_slice(bytes);
    reader.disable_recursion_limit();
    let mut values = reader.into_iter::<Value>();
    let stream = values.next().ok_or_else(|| malformed("empty stream"))??;
    if values.next().is_some() {
        return Err(malformed("data after the stream object"));
    }
    let stream = stream
        .as_object()
        .ok_or_else(|| malformed("stream is not an object"))?;

    let version = stream
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed("stream version missing"))?;
    check_version(u32::try_from(version).unwrap_or(u32::MAX))?;

    let mut roots = Vec::new();
    for object in objects(stream)? {
        if let Some(root) = from_value(object, filter, 1)? {
            roots.push(root);
        }
    }
    Ok(roots)
}

fn objects(object: &Map<String, Value>) -> Result<&[Value], CodecError> {
    match object.get(OBJECTS) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(malformed("`Objects` is not an array")),
    }
}

fn from_value(
    value: &Value,
    filter: &LoadFilter,
    depth: usize,
) -> Result<Option<DataElementNode>, CodecError> {
    check_depth(depth)?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("element is not an object"))?;

    let type_id = object
        .get("typeId")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("element without `typeId`"))?;
    let type_id = parse_uuid(type_id)?;
    if !filter.accepts(&type_id) {
        return Ok(None);
    }

    let name = object.get("field").and_then(Value::as_str).unwrap_or_default();
    let version = match object.get("version") {
        None => 0,
        Some(version) => version
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| malformed("bad element version"))?,
    };

    let mut node = DataElementNode::new(name, type_id, version);
    match object.get("value") {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => node.set_raw_data(ElementData::Text(text.clone())),
        // Hand-written streams may use plain JSON numbers and booleans.
        Some(other) => node.set_raw_data(ElementData::Text(other.to_string())),
    }
    for child in objects(object)? {
        if let Some(child) = from_value(child, filter, depth + 1)? {
            node.add_node(child);
        }
    }
    Ok(Some(node))
}

/// Whether `{`/`[` nesting outside of strings goes past `limit`.
fn nesting_exceeds(bytes: &[u8], limit: usize) -> bool {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in bytes {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn malformed(message: &str) -> CodecError {
    CodecError::Malformed(String::from(message))
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use serde_json::Value;

    use super::{decode, encode};
    use crate::TypeUuid;
    use crate::codec::{CodecError, LoadFilter};
    use crate::fixtures::Foo;
    use crate::reflection::uuid_to_string;
    use crate::registry::TypeRegistry;
    use crate::tree::ElementData;
    use crate::walker::{Diagnostics, save_to_node};

    #[test]
    fn writes_the_documented_keys() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        let node = save_to_node(&registry, &Foo { m_data: 5 }, "", &mut Diagnostics::new()).unwrap();

        let mut bytes = Vec::new();
        encode(&registry, &[node], &mut bytes).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["name"], "ObjectStream");
        assert_eq!(json["version"], 3);
        let foo = &json["Objects"][0];
        assert_eq!(foo["typeName"], "Foo");
        assert_eq!(foo["typeId"], uuid_to_string(&Foo::type_uuid()).as_str());
        assert_eq!(foo["version"], 1);
        assert_eq!(foo["Objects"][0]["field"], "m_data");
        assert_eq!(foo["Objects"][0]["value"], "5");
    }

    #[test]
    fn plain_json_values_become_text() {
        let text = alloc::format!(
            r#"{{"version": 3, "Objects": [{{"typeId": "{}", "value": 12}}]}}"#,
            uuid_to_string(&i32::type_uuid())
        );
        let roots = decode(text.as_bytes(), &LoadFilter::new()).unwrap();
        assert_eq!(roots[0].data(), &ElementData::Text("12".into()));
    }

    #[test]
    fn future_versions_are_rejected() {
        let text = br#"{"name": "ObjectStream", "version": 4294967295, "Objects": []}"#;
        assert!(matches!(
            decode(text, &LoadFilter::new()),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }
}
