// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An HTML5 tokenizer and DOM tree constructor.
//!
//! Bytes go in (UTF-8 or UTF-16, detected by byte order mark), a
//! [`Document`] comes out.  Malformed markup never fails the parse:
//! every recovery in the tokenization and tree-construction state
//! machines is implemented, and the anomalies are reported to an
//! [`ErrorSink`] with their source positions.
//!
//! ```
//! let doc = htmldom::parse_str("<html dir=\"ltr\">v</html>", None).unwrap();
//! let root = doc.root().unwrap();
//! assert_eq!(root.as_element().unwrap().name().as_str(), "html");
//! assert_eq!(&*root.as_element().unwrap().attribute("dir").unwrap(), "ltr");
//! ```
//!
//! The pieces are usable on their own: [`Tokenizer`] is an incremental
//! pull tokenizer (`feed` bytes, `next_token` until it reports that it
//! needs more), and [`serialize`] writes a DOM subtree back out as
//! HTML.

/// Re-export the tendril crate.
pub use tendril;

mod macros;

mod util {
    pub mod str;
}

pub mod catalog;
pub mod dom;
pub mod error;
pub mod input;
pub mod serialize;
pub mod tokenizer;

mod driver;
mod tree_builder;

pub use crate::catalog::{ElemFlags, TagId, TagName};
pub use crate::dom::{Document, Handle, NodeData, TraversalOrder};
pub use crate::driver::{parse, parse_str, Parser};
pub use crate::error::{CollectSink, Error, ErrorSink, NullSink, ParseErrorKind, Position};
pub use crate::serialize::{serialize, serialize_to_string};
pub use crate::tokenizer::{Token, TokenData, Tokenizer, TokenizerResult};
