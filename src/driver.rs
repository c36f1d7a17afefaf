// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! High-level interface to the parser.

use std::io::{ErrorKind, Read};
use std::rc::Rc;

use crate::dom::Document;
use crate::error::{Error, ErrorSink, NullSink};
use crate::tree_builder::TreeBuilder;

/// An incremental parser: feed byte chunks as they arrive, then call
/// [`Parser::finish`] to get the document.
pub struct Parser {
    builder: TreeBuilder,
}

impl Parser {
    pub fn new() -> Parser {
        Parser::with_error_sink(Rc::new(NullSink))
    }

    pub fn with_error_sink(errors: Rc<dyn ErrorSink>) -> Parser {
        Parser {
            builder: TreeBuilder::new(errors),
        }
    }

    /// Feed a chunk.  Everything that can be parsed is parsed before
    /// this returns; the rest waits for more input.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.builder.feed(bytes)
    }

    /// Declare the input complete and return the document.
    pub fn finish(self) -> Result<Document, Error> {
        self.builder.finish()
    }
}

impl Default for Parser {
    fn default() -> Parser {
        Parser::new()
    }
}

/// Parse a document from a byte source.
///
/// I/O errors (including `WouldBlock` from a non-blocking source) are
/// returned verbatim; parse errors go to `errors` and never fail the
/// parse.  Pass `None` to discard them.
pub fn parse<R: Read>(mut source: R, errors: Option<Rc<dyn ErrorSink>>) -> Result<Document, Error> {
    let mut parser = match errors {
        Some(errors) => Parser::with_error_sink(errors),
        None => Parser::new(),
    };
    let mut buf = [0u8; 1024];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => parser.feed(&buf[..n])?,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    parser.finish()
}

/// Parse a complete in-memory document.
pub fn parse_str(input: &str, errors: Option<Rc<dyn ErrorSink>>) -> Result<Document, Error> {
    parse(input.as_bytes(), errors)
}
