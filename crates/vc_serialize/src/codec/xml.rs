use alloc::string::{String, ToString};
use alloc::vec::Vec;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::codec::{
    CodecError, LoadFilter, OBJECT_STREAM_VERSION, STREAM_TAG, check_depth, check_version,
    leaf_text, parse_uuid, type_name,
};
use crate::reflection::uuid_to_string;
use crate::registry::TypeRegistry;
use crate::tree::{DataElementNode, ElementData};

const CLASS_TAG: &str = "Class";

// -----------------------------------------------------------------------------
// Encoding

pub(super) fn encode(
    registry: &TypeRegistry,
    roots: &[DataElementNode],
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let mut writer = Writer::new_with_indent(out, b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let version = OBJECT_STREAM_VERSION.to_string();
    let mut stream = BytesStart::new(STREAM_TAG);
    stream.push_attribute(("version", version.as_str()));
    writer.write_event(Event::Start(stream))?;
    for root in roots {
        write_class(&mut writer, registry, root)?;
    }
    writer.write_event(Event::End(BytesEnd::new(STREAM_TAG)))?;
    Ok(())
}

fn write_class(
    writer: &mut Writer<&mut Vec<u8>>,
    registry: &TypeRegistry,
    node: &DataElementNode,
) -> Result<(), CodecError> {
    let type_id = uuid_to_string(&node.type_id());
    let version = node.version().to_string();
    let value = leaf_text(registry, node)?;

    let mut class = BytesStart::new(CLASS_TAG);
    let name = type_name(registry, node);
    if !name.is_empty() {
        class.push_attribute(("name", name));
    }
    if !node.name().is_empty() {
        class.push_attribute(("field", node.name()));
    }
    class.push_attribute(("type", type_id.as_str()));
    if node.version() != 0 {
        class.push_attribute(("version", version.as_str()));
    }
    if let Some(value) = &value {
        class.push_attribute(("value", value.as_ref()));
    }

    if node.children().is_empty() {
        writer.write_event(Event::Empty(class))?;
        return Ok(());
    }
    writer.write_event(Event::Start(class))?;
    for child in node.children() {
        write_class(writer, registry, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(CLASS_TAG)))?;
    Ok(())
}

// -----------------------------------------------------------------------------
// Decoding

/// A `<Class>` being read, or a skipped one.
enum Open {
    Node(DataElementNode),
    Skipped,
}

pub(super) fn decode(bytes: &[u8], filter: &LoadFilter) -> Result<Vec<DataElementNode>, CodecError> {
    let text = core::str::from_utf8(bytes)
        .map_err(|_| CodecError::Malformed(String::from("stream is not UTF-8")))?;
    let mut reader = Reader::from_str(text);

    let mut roots = Vec::new();
    let mut stack: Vec<Open> = Vec::new();
    let mut in_stream = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) if start.name().as_ref() == STREAM_TAG.as_bytes() => {
                check_version(stream_version(&start)?)?;
                in_stream = true;
            }
            Event::Start(start) if start.name().as_ref() == CLASS_TAG.as_bytes() => {
                check_depth(stack.len() + 1)?;
                let open = open_class(&start, &stack, filter)?;
                stack.push(open);
            }
            Event::Empty(start) if start.name().as_ref() == CLASS_TAG.as_bytes() => {
                check_depth(stack.len() + 1)?;
                let open = open_class(&start, &stack, filter)?;
                close_class(open, &mut stack, &mut roots);
            }
            Event::End(end) if end.name().as_ref() == CLASS_TAG.as_bytes() => {
                let open = stack
                    .pop()
                    .ok_or_else(|| CodecError::Malformed(String::from("unbalanced </Class>")))?;
                close_class(open, &mut stack, &mut roots);
            }
            Event::End(end) if end.name().as_ref() == STREAM_TAG.as_bytes() => break,
            Event::Eof => {
                return Err(if in_stream {
                    CodecError::UnexpectedEnd
                } else {
                    CodecError::Malformed(String::from("no <ObjectStream> element"))
                });
            }
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(CodecError::Malformed(String::from("unclosed <Class>")));
    }
    Ok(roots)
}

fn stream_version(start: &BytesStart<'_>) -> Result<u32, CodecError> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"version" {
            let value = attr.unescape_value()?;
            return value
                .parse()
                .map_err(|_| CodecError::Malformed(alloc::format!("bad stream version `{value}`")));
        }
    }
    Err(CodecError::Malformed(String::from("stream version missing")))
}

fn open_class(
    start: &BytesStart<'_>,
    stack: &[Open],
    filter: &LoadFilter,
) -> Result<Open, CodecError> {
    // Everything below a skipped element is skipped too.
    if matches!(stack.last(), Some(Open::Skipped)) {
        return Ok(Open::Skipped);
    }

    let mut field: Option<String> = None;
    let mut type_id = None;
    let mut version = 0;
    let mut value = None;
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let text = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"field" => field = Some(text.into_owned()),
            b"type" => type_id = Some(parse_uuid(&text)?),
            b"version" => {
                version = text
                    .parse()
                    .map_err(|_| CodecError::Malformed(alloc::format!("bad version `{text}`")))?;
            }
            b"value" => value = Some(text.into_owned()),
            _ => {}
        }
    }

    let type_id =
        type_id.ok_or_else(|| CodecError::Malformed(String::from("<Class> without a type")))?;
    if !filter.accepts(&type_id) {
        return Ok(Open::Skipped);
    }
    let mut node = DataElementNode::new(field.unwrap_or_default(), type_id, version);
    if let Some(value) = value {
        node.set_raw_data(ElementData::Text(value));
    }
    Ok(Open::Node(node))
}

fn close_class(open: Open, stack: &mut [Open], roots: &mut Vec<DataElementNode>) {
    let Open::Node(node) = open else {
        return;
    };
    match stack.last_mut() {
        Some(Open::Node(parent)) => {
            parent.add_node(node);
        }
        Some(Open::Skipped) => {}
        None => roots.push(node),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::{decode, encode};
    use crate::TypeUuid;
    use crate::codec::{CodecError, LoadFilter};
    use crate::fixtures::Foo;
    use crate::registry::TypeRegistry;
    use crate::tree::ElementData;
    use crate::walker::{Diagnostics, save_to_node};

    #[test]
    fn writes_the_documented_attributes() {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Foo>();
        let node = save_to_node(&registry, &Foo { m_data: 5 }, "", &mut Diagnostics::new()).unwrap();

        let mut bytes = Vec::new();
        encode(&registry, &[node], &mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains(r#"<ObjectStream version="3">"#));
        assert!(text.contains(r#"<Class name="Foo" type="{"#));
        assert!(text.contains(r#"version="1">"#));
        assert!(text.contains(r#"<Class name="i32" field="m_data" type="{"#));
        assert!(text.contains(r#"value="5""#));
    }

    #[test]
    fn text_values_are_escaped_and_restored() {
        let registry = TypeRegistry::new();
        let value = String::from(r#"<a & "b">"#);
        let node = crate::tree::DataElementNode::leaf("s", &value);

        let mut bytes = Vec::new();
        encode(&registry, &[node], &mut bytes).unwrap();
        let decoded = decode(&bytes, &LoadFilter::new()).unwrap();
        assert_eq!(decoded[0].data(), &ElementData::Text(value));
        assert_eq!(decoded[0].type_id(), String::type_uuid());
    }

    #[test]
    fn future_versions_are_rejected() {
        let text = br#"<ObjectStream version="4294967295"></ObjectStream>"#;
        assert!(matches!(
            decode(text, &LoadFilter::new()),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }
}
