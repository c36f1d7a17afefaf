// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//§ serializing-html-fragments

use std::io::{self, Write};

use crate::catalog::ElemFlags;
use crate::catalog::TagId;
use crate::dom::{Document, Handle, NodeData};

/// Serialize a node and its subtree as HTML.  A `Document` node
/// serializes its children.
pub fn serialize<Wr: Write>(writer: &mut Wr, node: &Handle) -> io::Result<()> {
    let mut ser = Serializer { writer };
    ser.serialize_node(node, false)
}

/// Serialize a whole document to a string.
pub fn serialize_to_string(document: &Document) -> String {
    let mut bytes = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = serialize(&mut bytes, document.handle());
    String::from_utf8(bytes).unwrap_or_default()
}

struct Serializer<'wr, Wr> {
    writer: &'wr mut Wr,
}

impl<'wr, Wr: Write> Serializer<'wr, Wr> {
    fn write_escaped(&mut self, text: &str, attr_mode: bool) -> io::Result<()> {
        for c in text.chars() {
            match c {
                '&' => self.writer.write_all(b"&amp;")?,
                '\u{00A0}' => self.writer.write_all(b"&nbsp;")?,
                '"' if attr_mode => self.writer.write_all(b"&quot;")?,
                '<' if !attr_mode => self.writer.write_all(b"&lt;")?,
                '>' if !attr_mode => self.writer.write_all(b"&gt;")?,
                c => write!(self.writer, "{c}")?,
            }
        }
        Ok(())
    }

    fn serialize_node(&mut self, node: &Handle, raw_text: bool) -> io::Result<()> {
        match node.data {
            NodeData::Document => {
                for child in node.children().iter() {
                    self.serialize_node(child, false)?;
                }
                Ok(())
            },

            NodeData::Doctype {
                ref name,
                ref public_id,
                ref system_id,
                ..
            } => {
                write!(self.writer, "<!DOCTYPE {name}")?;
                match (public_id, system_id) {
                    (Some(public_id), Some(system_id)) => {
                        write!(self.writer, " PUBLIC \"{public_id}\" \"{system_id}\"")?;
                    },
                    (Some(public_id), None) => {
                        write!(self.writer, " PUBLIC \"{public_id}\"")?;
                    },
                    (None, Some(system_id)) => {
                        write!(self.writer, " SYSTEM \"{system_id}\"")?;
                    },
                    (None, None) => {},
                }
                self.writer.write_all(b">")
            },

            NodeData::Text(ref text) => {
                if raw_text {
                    self.writer.write_all(text.borrow().as_bytes())
                } else {
                    self.write_escaped(&text.borrow(), false)
                }
            },

            NodeData::Comment(ref text) => {
                write!(self.writer, "<!--{text}-->")
            },

            NodeData::Element(ref element) => {
                let name = element.name();
                write!(self.writer, "<{name}")?;
                for attr in element.attributes().iter() {
                    write!(self.writer, " {}=\"", attr.name)?;
                    self.write_escaped(&attr.value, true)?;
                    self.writer.write_all(b"\"")?;
                }
                self.writer.write_all(b">")?;

                if element.flags().contains(ElemFlags::VOID) {
                    return Ok(());
                }

                // Raw-text contents are written back verbatim.
                let children_raw = element.flags().contains(ElemFlags::RAW_TEXT)
                    || name.is(TagId::Script)
                    || name.is(TagId::Plaintext);
                for child in node.children().iter() {
                    self.serialize_node(child, children_raw)?;
                }

                write!(self.writer, "</{name}>")
            },
        }
    }
}
