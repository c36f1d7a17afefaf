// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parse-error reporting and the crate's hard-error type.
//!
//! Parse errors are recoverable by definition: they are delivered to an
//! [`ErrorSink`] together with the source position and parsing continues.
//! Only I/O failures and internal invariant violations surface as
//! [`Error`] values.

use std::cell::RefCell;
use std::error;
use std::fmt;
use std::io;

/// A source position: `(row, col)`, both 1-based.  Column counts code
/// points after newline normalization.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub fn new(row: u32, col: u32) -> Position {
        Position { row, col }
    }
}

impl Default for Position {
    fn default() -> Position {
        Position { row: 1, col: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

macro_rules! parse_error_kinds {
    ($( $variant:ident => $name:expr, )+) => {
        /// The named parse errors of the HTML tokenization and tree
        /// construction stages, plus the input-stream conditions this
        /// crate reports itself.
        #[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
        pub enum ParseErrorKind {
            $( $variant, )+
        }

        impl ParseErrorKind {
            /// The hyphenated name of this error kind.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( ParseErrorKind::$variant => $name, )+
                }
            }
        }
    };
}

parse_error_kinds! {
    // Input stream.
    ControlCharacterInInputStream => "control-character-in-input-stream",
    NoncharacterInInputStream => "noncharacter-in-input-stream",
    SurrogateInInputStream => "surrogate-in-input-stream",
    InvalidByteSequence => "invalid-byte-sequence",

    // Tags.
    UnexpectedNullCharacter => "unexpected-null-character",
    UnexpectedQuestionMarkInsteadOfTagName => "unexpected-question-mark-instead-of-tag-name",
    InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
    MissingEndTagName => "missing-end-tag-name",
    EofBeforeTagName => "eof-before-tag-name",
    EofInTag => "eof-in-tag",
    DuplicateAttribute => "duplicate-attribute",
    UnexpectedCharacterInAttributeName => "unexpected-character-in-attribute-name",
    UnexpectedEqualsSignBeforeAttributeName => "unexpected-equals-sign-before-attribute-name",
    UnexpectedCharacterInUnquotedAttributeValue => "unexpected-character-in-unquoted-attribute-value",
    MissingAttributeValue => "missing-attribute-value",
    MissingWhitespaceBetweenAttributes => "missing-whitespace-between-attributes",
    UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
    EndTagWithAttributes => "end-tag-with-attributes",
    EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",

    // Comments.
    AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
    NestedComment => "nested-comment",
    IncorrectlyOpenedComment => "incorrectly-opened-comment",
    IncorrectlyClosedComment => "incorrectly-closed-comment",
    EofInComment => "eof-in-comment",

    // DOCTYPE.
    MissingWhitespaceBeforeDoctypeName => "missing-whitespace-before-doctype-name",
    MissingDoctypeName => "missing-doctype-name",
    InvalidCharacterSequenceAfterDoctypeName => "invalid-character-sequence-after-doctype-name",
    MissingWhitespaceAfterDoctypePublicKeyword => "missing-whitespace-after-doctype-public-keyword",
    MissingWhitespaceAfterDoctypeSystemKeyword => "missing-whitespace-after-doctype-system-keyword",
    MissingQuoteBeforeDoctypePublicIdentifier => "missing-quote-before-doctype-public-identifier",
    MissingQuoteBeforeDoctypeSystemIdentifier => "missing-quote-before-doctype-system-identifier",
    MissingDoctypePublicIdentifier => "missing-doctype-public-identifier",
    MissingDoctypeSystemIdentifier => "missing-doctype-system-identifier",
    AbruptDoctypePublicIdentifier => "abrupt-doctype-public-identifier",
    AbruptDoctypeSystemIdentifier => "abrupt-doctype-system-identifier",
    MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers =>
        "missing-whitespace-between-doctype-public-and-system-identifiers",
    UnexpectedCharacterAfterDoctypeSystemIdentifier =>
        "unexpected-character-after-doctype-system-identifier",
    EofInDoctype => "eof-in-doctype",

    // Raw text, script data, CDATA.
    EofInScriptHtmlCommentLikeText => "eof-in-script-html-comment-like-text",
    CdataInHtmlContent => "cdata-in-html-content",
    EofInCdata => "eof-in-cdata",

    // Character references.
    MissingSemicolonAfterCharacterReference => "missing-semicolon-after-character-reference",
    UnknownNamedCharacterReference => "unknown-named-character-reference",
    AbsenceOfDigitsInNumericCharacterReference =>
        "absence-of-digits-in-numeric-character-reference",
    NullCharacterReference => "null-character-reference",
    CharacterReferenceOutsideUnicodeRange => "character-reference-outside-unicode-range",
    SurrogateCharacterReference => "surrogate-character-reference",
    NoncharacterCharacterReference => "noncharacter-character-reference",
    ControlCharacterReference => "control-character-reference",

    // Tree construction.
    StrayDoctype => "stray-doctype",
    StrayStartTag => "stray-start-tag",
    StrayEndTag => "stray-end-tag",
    MisnestedEndTag => "misnested-end-tag",
    NonVoidHtmlElementStartTagWithTrailingSolidus =>
        "non-void-html-element-start-tag-with-trailing-solidus",
    UnexpectedEof => "unexpected-eof",
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives parse-error reports.  Purely observational: implementations
/// must not fail back into the parser, hence `&self` receivers; use
/// interior mutability to accumulate.
pub trait ErrorSink {
    fn report(&self, kind: ParseErrorKind, pos: Position);
}

/// Discards every report.  The default sink.
pub struct NullSink;

impl ErrorSink for NullSink {
    fn report(&self, _kind: ParseErrorKind, _pos: Position) {}
}

/// Collects reports in order, for callers that want to inspect them
/// after the parse.
#[derive(Default)]
pub struct CollectSink {
    pub errors: RefCell<Vec<(ParseErrorKind, Position)>>,
}

impl CollectSink {
    pub fn new() -> CollectSink {
        CollectSink::default()
    }

    pub fn len(&self) -> usize {
        self.errors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }
}

impl ErrorSink for CollectSink {
    fn report(&self, kind: ParseErrorKind, pos: Position) {
        self.errors.borrow_mut().push((kind, pos));
    }
}

/// A hard failure.  Malformed markup never produces one of these; only a
/// failing byte source or a bug in the parser itself does.
#[derive(Debug)]
pub enum Error {
    /// Propagated verbatim from the byte source.
    Io(io::Error),
    /// An internal invariant did not hold.  The parse cannot continue.
    Invariant(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "input error: {e}"),
            Error::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Invariant(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}
