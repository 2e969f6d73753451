//! Document parsing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{
    AUDIO_MEDIA, CHILDREN, DOCUMENT, FORMAT_VERSION, TEXT_MEDIA, TREE_NODE, XML_ATTRIBUTE,
    XML_PROPERTY,
};
use crate::error::{Error, Result};
use crate::model::{AudioClip, Document, Node, NodeId, QualName, XmlProperty};
use crate::util::{declared_encoding, decode_text, resolve_entity};

/// Parse a document from raw file bytes.
pub fn read_document(bytes: &[u8]) -> Result<Document> {
    let content = decode_text(bytes, declared_encoding(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(false);

    let mut doc: Option<Document> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    let mut in_text = false;
    let mut seen_root_element = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    DOCUMENT => {
                        seen_root_element = true;
                        if let Some(version) = attr(e, b"version")?
                            && version != FORMAT_VERSION
                        {
                            return Err(Error::InvalidDocument(format!(
                                "unsupported format version {version}"
                            )));
                        }
                    }
                    TREE_NODE => {
                        let node = Node {
                            marked: attr(e, b"marked")?.is_some_and(|v| v == "true"),
                            ..Node::default()
                        };
                        let id = if doc.is_none() {
                            doc = Some(Document::with_root(node));
                            NodeId::ROOT
                        } else {
                            let parent = *stack.last().ok_or_else(|| {
                                Error::InvalidDocument("more than one root TreeNode".to_string())
                            })?;
                            let d = doc.as_mut().ok_or_else(|| {
                                Error::InvalidDocument("document has no TreeNode".to_string())
                            })?;
                            let id = d.alloc(node);
                            d.append_child(parent, id);
                            id
                        };
                        if !is_empty {
                            stack.push(id);
                        }
                    }
                    XML_PROPERTY => {
                        let name = qname(e)?;
                        current_node(&mut doc, &stack)?.xml = Some(XmlProperty::new(name));
                    }
                    XML_ATTRIBUTE => {
                        let name = qname(e)?;
                        let value = attr(e, b"value")?.unwrap_or_default();
                        current_node(&mut doc, &stack)?
                            .xml
                            .as_mut()
                            .ok_or_else(|| {
                                Error::InvalidDocument("XmlAttribute outside XmlProperty".to_string())
                            })?
                            .set_attribute_ns(name, value);
                    }
                    TEXT_MEDIA => {
                        current_node(&mut doc, &stack)?.text = Some(String::new());
                        in_text = !is_empty;
                    }
                    AUDIO_MEDIA => {
                        let src = attr(e, b"src")?.ok_or_else(|| {
                            Error::InvalidDocument("ManagedAudioMedia without src".to_string())
                        })?;
                        let clip_begin_ms = parse_ms(attr(e, b"clipBegin")?)?.unwrap_or(0);
                        let clip_end_ms = parse_ms(attr(e, b"clipEnd")?)?;
                        current_node(&mut doc, &stack)?.audio = Some(AudioClip {
                            src,
                            clip_begin_ms,
                            clip_end_ms,
                        });
                    }
                    CHILDREN => {}
                    other => {
                        return Err(Error::InvalidDocument(format!(
                            "unexpected element <{}>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                }
            }
            Event::Text(ref e) if in_text => {
                push_text(&mut doc, &stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Event::CData(ref e) if in_text => {
                push_text(&mut doc, &stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Event::GeneralRef(ref e) if in_text => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let resolved = resolve_entity(&entity).ok_or_else(|| {
                    Error::InvalidDocument(format!("unknown entity &{entity};"))
                })?;
                push_text(&mut doc, &stack, &resolved)?;
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                TREE_NODE => {
                    stack.pop();
                }
                TEXT_MEDIA => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root_element {
        return Err(Error::InvalidDocument("missing <Document> element".to_string()));
    }
    doc.ok_or_else(|| Error::InvalidDocument("document has no TreeNode".to_string()))
}

fn current_node<'a>(doc: &'a mut Option<Document>, stack: &[NodeId]) -> Result<&'a mut Node> {
    let id = *stack
        .last()
        .ok_or_else(|| Error::InvalidDocument("media outside TreeNode".to_string()))?;
    doc.as_mut()
        .and_then(|d| d.node_mut(id))
        .ok_or_else(|| Error::InvalidDocument("media outside TreeNode".to_string()))
}

fn push_text(doc: &mut Option<Document>, stack: &[NodeId], text: &str) -> Result<()> {
    current_node(doc, stack)?
        .text
        .get_or_insert_with(String::new)
        .push_str(text);
    Ok(())
}

/// Unescaped value of an attribute.
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw)
                .map_err(|err| Error::InvalidDocument(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn qname(e: &BytesStart<'_>) -> Result<QualName> {
    let local = attr(e, b"localName")?.ok_or_else(|| {
        Error::InvalidDocument("XML property without localName".to_string())
    })?;
    let namespace = attr(e, b"namespaceUri")?.unwrap_or_default();
    Ok(QualName::with_namespace(local, namespace))
}

fn parse_ms(value: Option<String>) -> Result<Option<u64>> {
    value
        .map(|v| {
            v.parse()
                .map_err(|_| Error::InvalidDocument(format!("invalid clip time {v:?}")))
        })
        .transpose()
}
