// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character-reference tokenization.
//!
//! Runs as a sub-tokenizer: the main state machine hands over control
//! after consuming `&` and gets back either a decoded character or
//! nothing (in which case the `&` stands for itself and any consumed
//! name characters are returned to the input).

use log::debug;
use phf::{phf_map, phf_set};

use super::Tokenizer;
use crate::error::ParseErrorKind;
use crate::input::CodePoint;
use crate::tendril::StrTendril;

/// Longest name we will attempt to match.
const MAX_NAME_LEN: usize = 32;

pub(super) enum Status {
    /// Waiting for more input.
    Stuck,
    /// Made progress; call `step` again.
    Progress,
    /// Finished: `Some` decoded character, or `None` meaning the
    /// ampersand was literal.
    Done(Option<char>),
}

#[derive(Debug)]
enum State {
    Begin,
    Octothorpe,
    Numeric(u32), // base
    NumericSemicolon,
    Named,
}

pub(super) struct CharRefTokenizer {
    state: State,
    is_consumed_in_attribute: bool,

    num: u32,
    num_too_big: bool,
    seen_digit: bool,
    hex_marker: Option<char>,

    name_buf: StrTendril,
}

impl CharRefTokenizer {
    pub(super) fn new(is_consumed_in_attribute: bool) -> CharRefTokenizer {
        CharRefTokenizer {
            state: State::Begin,
            is_consumed_in_attribute,
            num: 0,
            num_too_big: false,
            seen_digit: false,
            hex_marker: None,
            name_buf: StrTendril::new(),
        }
    }

    pub(super) fn step(&mut self, tokenizer: &mut Tokenizer) -> Status {
        debug!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            State::Begin => self.do_begin(tokenizer),
            State::Octothorpe => self.do_octothorpe(tokenizer),
            State::Numeric(base) => self.do_numeric(tokenizer, base),
            State::NumericSemicolon => self.do_numeric_semicolon(tokenizer),
            State::Named => self.do_named(tokenizer),
        }
    }

    fn do_begin(&mut self, tokenizer: &mut Tokenizer) -> Status {
        match tokenizer.input.peek() {
            Some(CodePoint::Char(c)) if c.is_ascii_alphanumeric() => {
                self.state = State::Named;
                Status::Progress
            },
            Some(CodePoint::Char('#')) => {
                tokenizer.input.consume();
                self.state = State::Octothorpe;
                Status::Progress
            },
            Some(_) => Status::Done(None),
            None => Status::Stuck,
        }
    }

    fn do_octothorpe(&mut self, tokenizer: &mut Tokenizer) -> Status {
        match tokenizer.input.peek() {
            Some(CodePoint::Char(c @ ('x' | 'X'))) => {
                tokenizer.input.consume();
                self.hex_marker = Some(c);
                self.state = State::Numeric(16);
                Status::Progress
            },
            Some(CodePoint::Char(_)) => {
                self.hex_marker = None;
                self.state = State::Numeric(10);
                Status::Progress
            },
            Some(CodePoint::Eof) => self.unconsume_numeric(tokenizer),
            None => Status::Stuck,
        }
    }

    fn do_numeric(&mut self, tokenizer: &mut Tokenizer, base: u32) -> Status {
        let c = match tokenizer.input.peek() {
            Some(CodePoint::Char(c)) => c,
            Some(CodePoint::Eof) => {
                return if self.seen_digit {
                    tokenizer.error(ParseErrorKind::MissingSemicolonAfterCharacterReference);
                    self.finish_numeric(tokenizer)
                } else {
                    self.unconsume_numeric(tokenizer)
                };
            },
            None => return Status::Stuck,
        };
        match c.to_digit(base) {
            Some(n) => {
                tokenizer.input.consume();
                self.num = self.num.wrapping_mul(base);
                if self.num > 0x10FFFF {
                    // Invalid regardless of further digits; keep
                    // consuming them but ignore the value.
                    self.num_too_big = true;
                }
                self.num = self.num.wrapping_add(n);
                self.seen_digit = true;
                Status::Progress
            },

            None if !self.seen_digit => self.unconsume_numeric(tokenizer),

            None => {
                self.state = State::NumericSemicolon;
                Status::Progress
            },
        }
    }

    fn do_numeric_semicolon(&mut self, tokenizer: &mut Tokenizer) -> Status {
        match tokenizer.input.peek() {
            Some(CodePoint::Char(';')) => {
                tokenizer.input.consume();
            },
            Some(_) => {
                tokenizer.error(ParseErrorKind::MissingSemicolonAfterCharacterReference);
            },
            None => return Status::Stuck,
        }
        self.finish_numeric(tokenizer)
    }

    fn unconsume_numeric(&mut self, tokenizer: &mut Tokenizer) -> Status {
        let mut unconsume = StrTendril::from_char('#');
        if let Some(c) = self.hex_marker {
            unconsume.push_char(c);
        }
        tokenizer.input.push_front(&unconsume);
        tokenizer.error(ParseErrorKind::AbsenceOfDigitsInNumericCharacterReference);
        Status::Done(None)
    }

    fn finish_numeric(&mut self, tokenizer: &mut Tokenizer) -> Status {
        fn conv(n: u32) -> char {
            char::from_u32(n).unwrap_or('\u{fffd}')
        }

        let (c, error) = match self.num {
            n if (n > 0x10FFFF) || self.num_too_big => (
                '\u{fffd}',
                Some(ParseErrorKind::CharacterReferenceOutsideUnicodeRange),
            ),
            0x00 => ('\u{fffd}', Some(ParseErrorKind::NullCharacterReference)),
            0xD800..=0xDFFF => ('\u{fffd}', Some(ParseErrorKind::SurrogateCharacterReference)),

            0x80..=0x9F => {
                let c = match C1_REPLACEMENTS[(self.num - 0x80) as usize] {
                    Some(c) => c,
                    None => conv(self.num),
                };
                (c, Some(ParseErrorKind::ControlCharacterReference))
            },

            n if (0xFDD0..=0xFDEF).contains(&n) || (n & 0xFFFE) == 0xFFFE => (
                conv(n),
                Some(ParseErrorKind::NoncharacterCharacterReference),
            ),

            0x01..=0x08 | 0x0B | 0x0D..=0x1F | 0x7F => {
                (conv(self.num), Some(ParseErrorKind::ControlCharacterReference))
            },

            n => (conv(n), None),
        };

        if let Some(kind) = error {
            tokenizer.error(kind);
        }

        Status::Done(Some(c))
    }

    fn do_named(&mut self, tokenizer: &mut Tokenizer) -> Status {
        match tokenizer.input.peek() {
            Some(CodePoint::Char(c))
                if c.is_ascii_alphanumeric() && self.name_buf.len() < MAX_NAME_LEN =>
            {
                tokenizer.input.consume();
                self.name_buf.push_char(c);
                Status::Progress
            },
            Some(CodePoint::Char(c)) => self.finish_named(tokenizer, Some(c)),
            Some(CodePoint::Eof) => self.finish_named(tokenizer, None),
            None => Status::Stuck,
        }
    }

    /// `next` is the terminator, not yet consumed (`None` at end of
    /// stream).
    fn finish_named(&mut self, tokenizer: &mut Tokenizer, next: Option<char>) -> Status {
        if next == Some(';') {
            if let Some(&c) = NAMED_REFERENCES.get(&self.name_buf[..]) {
                tokenizer.input.consume();
                return Status::Done(Some(c));
            }
        }

        // Without a terminating semicolon only the legacy names
        // resolve, by longest match; anything after the match is
        // returned to the input.
        let buf = &self.name_buf[..];
        for len in (1..=buf.len()).rev() {
            let prefix = &buf[..len];
            if !LEGACY_NAMED_REFERENCES.contains(prefix) {
                continue;
            }
            let Some(&c) = NAMED_REFERENCES.get(prefix) else {
                continue;
            };
            let next_after = buf[len..].chars().next().or(next);

            // In an attribute value, a name followed by `=` or an
            // alphanumeric stays literal, for compatibility with
            // un-escaped query strings.
            if self.is_consumed_in_attribute
                && matches!(next_after, Some(c) if c.is_ascii_alphanumeric() || c == '=')
            {
                tokenizer.input.push_front(&self.name_buf);
                return Status::Done(None);
            }

            tokenizer.error(ParseErrorKind::MissingSemicolonAfterCharacterReference);
            tokenizer.input.push_front(&buf[len..]);
            return Status::Done(Some(c));
        }

        if next == Some(';') && !buf.is_empty() {
            tokenizer.error(ParseErrorKind::UnknownNamedCharacterReference);
        }
        tokenizer.input.push_front(&self.name_buf);
        Status::Done(None)
    }
}

/// Replacements for the numeric references 0x80–0x9F, per the
/// windows-1252 mapping.
static C1_REPLACEMENTS: [Option<char>; 32] = [
    Some('\u{20ac}'), None,             Some('\u{201a}'), Some('\u{0192}'),
    Some('\u{201e}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02c6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None,             Some('\u{017d}'), None,
    None,             Some('\u{2018}'), Some('\u{2019}'), Some('\u{201c}'),
    Some('\u{201d}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02dc}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203a}'),
    Some('\u{0153}'), None,             Some('\u{017e}'), Some('\u{0178}'),
];

/// The named references the tokenizer acknowledges, keyed without the
/// terminating semicolon.
static NAMED_REFERENCES: phf::Map<&'static str, char> = phf_map! {
    "AMP" => '&', "amp" => '&',
    "GT" => '>', "gt" => '>',
    "LT" => '<', "lt" => '<',
    "QUOT" => '"', "quot" => '"',
    "apos" => '\'',
    "COPY" => '\u{a9}', "copy" => '\u{a9}',
    "REG" => '\u{ae}', "reg" => '\u{ae}',
    "TRADE" => '\u{2122}', "trade" => '\u{2122}',
    "nbsp" => '\u{a0}',
    "shy" => '\u{ad}',
    "iexcl" => '\u{a1}', "cent" => '\u{a2}', "pound" => '\u{a3}',
    "curren" => '\u{a4}', "yen" => '\u{a5}', "brvbar" => '\u{a6}',
    "sect" => '\u{a7}', "uml" => '\u{a8}', "ordf" => '\u{aa}',
    "laquo" => '\u{ab}', "not" => '\u{ac}', "macr" => '\u{af}',
    "deg" => '\u{b0}', "plusmn" => '\u{b1}', "sup2" => '\u{b2}',
    "sup3" => '\u{b3}', "acute" => '\u{b4}', "micro" => '\u{b5}',
    "para" => '\u{b6}', "middot" => '\u{b7}', "cedil" => '\u{b8}',
    "sup1" => '\u{b9}', "ordm" => '\u{ba}', "raquo" => '\u{bb}',
    "frac14" => '\u{bc}', "frac12" => '\u{bd}', "frac34" => '\u{be}',
    "iquest" => '\u{bf}', "times" => '\u{d7}', "divide" => '\u{f7}',
    "Agrave" => '\u{c0}', "Aacute" => '\u{c1}', "Acirc" => '\u{c2}',
    "Atilde" => '\u{c3}', "Auml" => '\u{c4}', "Aring" => '\u{c5}',
    "AElig" => '\u{c6}', "Ccedil" => '\u{c7}', "Egrave" => '\u{c8}',
    "Eacute" => '\u{c9}', "Ecirc" => '\u{ca}', "Euml" => '\u{cb}',
    "Igrave" => '\u{cc}', "Iacute" => '\u{cd}', "Icirc" => '\u{ce}',
    "Iuml" => '\u{cf}', "ETH" => '\u{d0}', "Ntilde" => '\u{d1}',
    "Ograve" => '\u{d2}', "Oacute" => '\u{d3}', "Ocirc" => '\u{d4}',
    "Otilde" => '\u{d5}', "Ouml" => '\u{d6}', "Oslash" => '\u{d8}',
    "Ugrave" => '\u{d9}', "Uacute" => '\u{da}', "Ucirc" => '\u{db}',
    "Uuml" => '\u{dc}', "Yacute" => '\u{dd}', "THORN" => '\u{de}',
    "szlig" => '\u{df}',
    "agrave" => '\u{e0}', "aacute" => '\u{e1}', "acirc" => '\u{e2}',
    "atilde" => '\u{e3}', "auml" => '\u{e4}', "aring" => '\u{e5}',
    "aelig" => '\u{e6}', "ccedil" => '\u{e7}', "egrave" => '\u{e8}',
    "eacute" => '\u{e9}', "ecirc" => '\u{ea}', "euml" => '\u{eb}',
    "igrave" => '\u{ec}', "iacute" => '\u{ed}', "icirc" => '\u{ee}',
    "iuml" => '\u{ef}', "eth" => '\u{f0}', "ntilde" => '\u{f1}',
    "ograve" => '\u{f2}', "oacute" => '\u{f3}', "ocirc" => '\u{f4}',
    "otilde" => '\u{f5}', "ouml" => '\u{f6}', "oslash" => '\u{f8}',
    "ugrave" => '\u{f9}', "uacute" => '\u{fa}', "ucirc" => '\u{fb}',
    "uuml" => '\u{fc}', "yacute" => '\u{fd}', "thorn" => '\u{fe}',
    "yuml" => '\u{ff}',
    "OElig" => '\u{152}', "oelig" => '\u{153}',
    "Scaron" => '\u{160}', "scaron" => '\u{161}',
    "Yuml" => '\u{178}', "fnof" => '\u{192}',
    "circ" => '\u{2c6}', "tilde" => '\u{2dc}',
    "ensp" => '\u{2002}', "emsp" => '\u{2003}', "thinsp" => '\u{2009}',
    "zwnj" => '\u{200c}', "zwj" => '\u{200d}',
    "lrm" => '\u{200e}', "rlm" => '\u{200f}',
    "ndash" => '\u{2013}', "mdash" => '\u{2014}',
    "lsquo" => '\u{2018}', "rsquo" => '\u{2019}', "sbquo" => '\u{201a}',
    "ldquo" => '\u{201c}', "rdquo" => '\u{201d}', "bdquo" => '\u{201e}',
    "dagger" => '\u{2020}', "Dagger" => '\u{2021}', "bull" => '\u{2022}',
    "hellip" => '\u{2026}', "permil" => '\u{2030}',
    "prime" => '\u{2032}', "Prime" => '\u{2033}',
    "lsaquo" => '\u{2039}', "rsaquo" => '\u{203a}',
    "oline" => '\u{203e}', "frasl" => '\u{2044}', "euro" => '\u{20ac}',
    "larr" => '\u{2190}', "uarr" => '\u{2191}', "rarr" => '\u{2192}',
    "darr" => '\u{2193}', "harr" => '\u{2194}',
    "minus" => '\u{2212}', "lowast" => '\u{2217}', "radic" => '\u{221a}',
    "prop" => '\u{221d}', "infin" => '\u{221e}', "ang" => '\u{2220}',
    "and" => '\u{2227}', "or" => '\u{2228}', "cap" => '\u{2229}',
    "cup" => '\u{222a}', "int" => '\u{222b}', "there4" => '\u{2234}',
    "sim" => '\u{223c}', "cong" => '\u{2245}', "asymp" => '\u{2248}',
    "ne" => '\u{2260}', "equiv" => '\u{2261}', "le" => '\u{2264}',
    "ge" => '\u{2265}', "oplus" => '\u{2295}', "otimes" => '\u{2297}',
    "perp" => '\u{22a5}', "sdot" => '\u{22c5}',
    "alpha" => '\u{3b1}', "beta" => '\u{3b2}', "gamma" => '\u{3b3}',
    "delta" => '\u{3b4}', "epsilon" => '\u{3b5}', "zeta" => '\u{3b6}',
    "eta" => '\u{3b7}', "theta" => '\u{3b8}', "iota" => '\u{3b9}',
    "kappa" => '\u{3ba}', "lambda" => '\u{3bb}', "mu" => '\u{3bc}',
    "nu" => '\u{3bd}', "xi" => '\u{3be}', "omicron" => '\u{3bf}',
    "pi" => '\u{3c0}', "rho" => '\u{3c1}', "sigmaf" => '\u{3c2}',
    "sigma" => '\u{3c3}', "tau" => '\u{3c4}', "upsilon" => '\u{3c5}',
    "phi" => '\u{3c6}', "chi" => '\u{3c7}', "psi" => '\u{3c8}',
    "omega" => '\u{3c9}',
};

/// Names that resolve even without a terminating semicolon.
static LEGACY_NAMED_REFERENCES: phf::Set<&'static str> = phf_set! {
    "AMP", "amp", "GT", "gt", "LT", "lt", "QUOT", "quot",
    "COPY", "copy", "REG", "reg", "nbsp", "shy",
    "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml",
    "ordf", "laquo", "not", "macr", "deg", "plusmn", "sup2", "sup3",
    "acute", "micro", "para", "middot", "cedil", "sup1", "ordm", "raquo",
    "frac14", "frac12", "frac34", "iquest", "times", "divide",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig",
    "Ccedil", "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute",
    "Icirc", "Iuml", "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc",
    "Otilde", "Ouml", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig",
    "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute",
    "icirc", "iuml", "eth", "ntilde", "ograve", "oacute", "ocirc",
    "otilde", "ouml", "oslash", "ugrave", "uacute", "ucirc", "uuml",
    "yacute", "thorn", "yuml",
};
