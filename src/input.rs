// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The input stream.
//!
//! Bytes go in, code points come out.  The stream sniffs a byte order
//! mark to pick UTF-8 or UTF-16 (either endianness), decodes with U+FFFD
//! replacement, collapses CR and CRLF to a single LF, and tracks the
//! `(row, col)` of every code point handed to the tokenizer.  Exhausted
//! input yields the [`CodePoint::Eof`] sentinel indefinitely.

use std::collections::VecDeque;
use std::rc::Rc;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{ErrorSink, ParseErrorKind, Position};

/// A decoded unit of input: a Unicode scalar value, or end of stream.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum CodePoint {
    Char(char),
    Eof,
}

const BOMS: [&[u8]; 3] = [b"\xef\xbb\xbf", b"\xfe\xff", b"\xff\xfe"];

fn could_be_bom_prefix(bytes: &[u8]) -> bool {
    BOMS.iter().any(|bom| bom.starts_with(bytes))
}

fn advance(pos: Position, c: char) -> Position {
    if c == '\n' {
        Position::new(pos.row + 1, 1)
    } else {
        Position::new(pos.row, pos.col + 1)
    }
}

pub struct InputStream {
    /// Decoded code points, newline-normalized, ready for the tokenizer.
    chars: VecDeque<char>,

    /// Bytes received but not yet decoded.  Stays small: at most an
    /// incomplete trailing sequence, or up to three bytes while the BOM
    /// is still undecided.
    raw: Vec<u8>,

    /// Chosen after BOM sniffing; `None` until then.
    decoder: Option<Decoder>,

    /// Whether the sniffed encoding is UTF-16.  The only malformation
    /// a UTF-16 decoder can report is an unpaired surrogate, which the
    /// error taxonomy distinguishes from byte-level garbage.
    decoding_utf16: bool,

    eof: bool,
    last_was_cr: bool,

    /// One-level push-back slot.  A reconsumed code point skips the
    /// preprocessing checks on its second trip.
    pushback: Option<char>,

    /// Most recently consumed code point.
    current: char,

    /// Position of the most recently consumed code point.
    last_pos: Position,

    /// Position the next code point will have.
    next_pos: Position,

    errors: Rc<dyn ErrorSink>,
}

impl InputStream {
    pub fn new(errors: Rc<dyn ErrorSink>) -> InputStream {
        InputStream {
            chars: VecDeque::new(),
            raw: Vec::new(),
            decoder: None,
            decoding_utf16: false,
            eof: false,
            last_was_cr: false,
            pushback: None,
            current: '\0',
            last_pos: Position::default(),
            next_pos: Position::new(1, 1),
            errors,
        }
    }

    /// Append raw bytes to the stream.
    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);
        self.ensure_decoder();
        self.decode_pending(false);
    }

    /// Declare the byte source exhausted.  Flushes any incomplete
    /// sequence held by the decoder as a replacement character.
    /// Idempotent.
    pub fn mark_eof(&mut self) {
        if self.eof {
            return;
        }
        self.eof = true;
        self.ensure_decoder();
        self.decode_pending(true);
    }

    fn ensure_decoder(&mut self) {
        if self.decoder.is_some() {
            return;
        }
        // Wait for enough bytes to rule a BOM in or out.
        if !self.eof && self.raw.len() < 3 && could_be_bom_prefix(&self.raw) {
            return;
        }
        let encoding = match Encoding::for_bom(&self.raw) {
            Some((encoding, bom_len)) => {
                self.raw.drain(..bom_len);
                encoding
            },
            None => UTF_8,
        };
        self.decoding_utf16 = encoding == UTF_16LE || encoding == UTF_16BE;
        self.decoder = Some(encoding.new_decoder_without_bom_handling());
    }

    fn decode_pending(&mut self, last: bool) {
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        if self.raw.is_empty() && !last {
            return;
        }

        let mut out = String::with_capacity(self.raw.len() + 16);
        let mut read_total = 0;
        let mut had_errors = false;
        loop {
            let (result, read, errors) =
                decoder.decode_to_string(&self.raw[read_total..], &mut out, last);
            read_total += read;
            had_errors |= errors;
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => {
                    out.reserve(self.raw.len() - read_total + 16);
                },
            }
        }
        self.raw.drain(..read_total);

        if had_errors {
            let kind = if self.decoding_utf16 {
                ParseErrorKind::SurrogateInInputStream
            } else {
                ParseErrorKind::InvalidByteSequence
            };
            self.errors.report(kind, self.next_pos);
        }

        for c in out.chars() {
            self.push_normalized(c);
        }
    }

    fn push_normalized(&mut self, c: char) {
        if self.last_was_cr && c == '\n' {
            self.last_was_cr = false;
            return;
        }
        self.last_was_cr = c == '\r';
        self.chars.push_back(if c == '\r' { '\n' } else { c });
    }

    fn source_exhausted(&self) -> bool {
        self.eof && self.raw.is_empty()
    }

    /// True once every buffered code point has been consumed and no more
    /// can arrive.
    pub fn at_eof(&self) -> bool {
        self.source_exhausted() && self.chars.is_empty() && self.pushback.is_none()
    }

    /// Position of the most recently consumed code point.
    pub fn pos(&self) -> Position {
        self.last_pos
    }

    /// Look at the next code point without consuming it.  `None` means
    /// more bytes are needed.
    pub fn peek(&self) -> Option<CodePoint> {
        if let Some(c) = self.pushback {
            return Some(CodePoint::Char(c));
        }
        match self.chars.front() {
            Some(&c) => Some(CodePoint::Char(c)),
            None if self.source_exhausted() => Some(CodePoint::Eof),
            None => None,
        }
    }

    /// Consume and return the next code point.  `None` means more bytes
    /// are needed.
    pub fn consume(&mut self) -> Option<CodePoint> {
        let (c, reconsumed) = match self.pushback.take() {
            Some(c) => (c, true),
            None => match self.chars.pop_front() {
                Some(c) => (c, false),
                None if self.source_exhausted() => return Some(CodePoint::Eof),
                None => return None,
            },
        };

        self.last_pos = self.next_pos;
        self.next_pos = advance(self.last_pos, c);

        let c = if reconsumed { c } else { self.preprocess(c) };
        self.current = c;
        Some(CodePoint::Char(c))
    }

    /// Make the most recently consumed code point the next one returned.
    /// Only one level of push-back is supported.
    pub fn reconsume(&mut self) {
        debug_assert!(self.pushback.is_none(), "double reconsume");
        self.pushback = Some(self.current);
        self.next_pos = self.last_pos;
    }

    /// Return a run of already-consumed characters to the front of the
    /// stream.  Used to un-consume a failed character-reference match;
    /// the run never contains a newline.
    pub fn push_front(&mut self, s: &str) {
        if let Some(c) = self.pushback.take() {
            self.chars.push_front(c);
        }
        let mut n = 0u32;
        for c in s.chars().rev() {
            self.chars.push_front(c);
            n += 1;
        }
        self.next_pos.col = self.next_pos.col.saturating_sub(n).max(1);
    }

    /// If the next code points match `pat` (which must be ASCII),
    /// consume them and return `Some(true)`; on a definite mismatch
    /// return `Some(false)`; return `None` if more input is needed to
    /// decide.
    pub fn eat(&mut self, pat: &str, ignore_ascii_case: bool) -> Option<bool> {
        debug_assert!(pat.is_ascii() && !pat.is_empty());
        for (i, pc) in pat.chars().enumerate() {
            let c = match self.nth_char(i) {
                Some(c) => c,
                None if self.source_exhausted() => return Some(false),
                None => return None,
            };
            let matched = if ignore_ascii_case {
                c.eq_ignore_ascii_case(&pc)
            } else {
                c == pc
            };
            if !matched {
                return Some(false);
            }
        }
        for _ in 0..pat.len() {
            self.consume();
        }
        Some(true)
    }

    fn nth_char(&self, i: usize) -> Option<char> {
        match self.pushback {
            Some(c) if i == 0 => Some(c),
            Some(_) => self.chars.get(i - 1).copied(),
            None => self.chars.get(i).copied(),
        }
    }

    //§ preprocessing-the-input-stream
    fn preprocess(&mut self, c: char) -> char {
        let n = c as u32;
        if (0xFDD0..=0xFDEF).contains(&n) || (n & 0xFFFE) == 0xFFFE {
            self.errors
                .report(ParseErrorKind::NoncharacterInInputStream, self.last_pos);
            return '\u{fffd}';
        }
        if matches!(n, 0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F..=0x9F) {
            self.errors
                .report(ParseErrorKind::ControlCharacterInInputStream, self.last_pos);
        }
        c
    }
}
