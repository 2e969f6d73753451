//! Document serialization.

use quick_xml::escape::escape;

use super::FORMAT_VERSION;
use crate::model::{Document, NodeId, QualName};

/// Serialize a document to XML.
///
/// Text media is written verbatim inside `<TextMedia>`, so indentation
/// never leaks into document content.
pub fn write_document(doc: &Document, pretty: bool) -> String {
    let mut out = String::with_capacity(doc.capacity() * 96);
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    newline(&mut out, pretty, 0);
    out.push_str("<Document version=\"");
    out.push_str(FORMAT_VERSION);
    out.push_str("\">");
    write_node(doc, doc.root(), 1, pretty, &mut out);
    newline(&mut out, pretty, 0);
    out.push_str("</Document>");
    if pretty {
        out.push('\n');
    }
    out
}

fn newline(out: &mut String, pretty: bool, depth: usize) {
    if pretty {
        out.push('\n');
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn push_qname(out: &mut String, name: &QualName) {
    push_attr(out, "localName", &name.local);
    push_attr(out, "namespaceUri", &name.namespace);
}

fn write_node(doc: &Document, id: NodeId, depth: usize, pretty: bool, out: &mut String) {
    let Some(node) = doc.node(id) else {
        return;
    };

    newline(out, pretty, depth);
    out.push_str("<TreeNode");
    if node.marked {
        push_attr(out, "marked", "true");
    }
    out.push('>');

    if let Some(xml) = &node.xml {
        newline(out, pretty, depth + 1);
        out.push_str("<XmlProperty");
        push_qname(out, &xml.name);
        if xml.attributes.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for attr in &xml.attributes {
                newline(out, pretty, depth + 2);
                out.push_str("<XmlAttribute");
                push_qname(out, &attr.name);
                push_attr(out, "value", &attr.value);
                out.push_str("/>");
            }
            newline(out, pretty, depth + 1);
            out.push_str("</XmlProperty>");
        }
    }

    if let Some(text) = &node.text {
        newline(out, pretty, depth + 1);
        out.push_str("<TextMedia>");
        out.push_str(&escape(text));
        out.push_str("</TextMedia>");
    }

    if let Some(audio) = &node.audio {
        newline(out, pretty, depth + 1);
        out.push_str("<ManagedAudioMedia");
        push_attr(out, "src", &audio.src);
        push_attr(out, "clipBegin", &audio.clip_begin_ms.to_string());
        if let Some(end) = audio.clip_end_ms {
            push_attr(out, "clipEnd", &end.to_string());
        }
        out.push_str("/>");
    }

    let children: Vec<_> = doc.children(id).collect();
    if !children.is_empty() {
        newline(out, pretty, depth + 1);
        out.push_str("<Children>");
        for child in children {
            write_node(doc, child, depth + 2, pretty, out);
        }
        newline(out, pretty, depth + 1);
        out.push_str("</Children>");
    }

    newline(out, pretty, depth);
    out.push_str("</TreeNode>");
}
