// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tokenizer.
//!
//! A pull interface over the tokenization state machine: feed bytes in,
//! call [`Tokenizer::next_token`] to take tokens out.  The machine
//! suspends losslessly when input runs dry and resumes on the next
//! feed.  Exactly one `EofToken` is produced, after `end` has been
//! called and the remaining input is exhausted.

pub use self::interface::{Attribute, Doctype, Tag, TagKind, Token, TokenData, TokenizerResult};
pub use self::interface::{CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken};
pub use self::interface::{EndTag, StartTag};

use self::char_ref::{CharRefTokenizer, Status};
use self::states::{DoctypeIdKind, Public, System};
use self::states::{DoubleEscaped, Escaped};
use self::states::{DoubleQuoted, SingleQuoted, Unquoted};
use self::states::{Rawtext, Rcdata, ScriptData, ScriptDataEscaped};

use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, trace};

use crate::catalog::TagName;
use crate::error::{ErrorSink, NullSink, ParseErrorKind, Position};
use crate::input::{CodePoint, InputStream};
use crate::macros::unwrap_or_return;
use crate::tendril::StrTendril;
use crate::util::str::lower_ascii_letter;

mod char_ref;
mod interface;
pub mod states;

/// What one step of the state machine did.
enum ProcessResult {
    Continue,
    Suspend,
}

fn option_push(opt_str: &mut Option<StrTendril>, c: char) {
    match *opt_str {
        Some(ref mut s) => s.push_char(c),
        None => *opt_str = Some(StrTendril::from_char(c)),
    }
}

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone, Default)]
pub struct TokenizerOpts {
    /// Initial state override, for driving the tokenizer standalone in
    /// a raw-text or RCDATA context.
    pub initial_state: Option<states::State>,

    /// Last start tag seen, for end-tag matching when `initial_state`
    /// puts the machine in a raw-text context.
    pub last_start_tag_name: Option<String>,
}

/// The HTML tokenizer.
pub struct Tokenizer {
    /// Decoded input; owned by the tokenizer, fed through it.
    pub(crate) input: InputStream,

    /// The abstract machine state.
    state: states::State,

    /// Tokens emitted but not yet pulled.
    pending: VecDeque<Token>,

    /// Tokenizer for character references, if one is running.
    char_ref_tokenizer: Option<Box<CharRefTokenizer>>,

    /// Position of the `&` that opened the running character reference.
    char_ref_pos: Position,

    /// Position of the first character of the token under construction.
    token_start: Position,

    /// Set once the EOF token has been emitted.
    done: bool,

    /// `<![CDATA[` is only honored inside foreign content; the tree
    /// constructor keeps this in sync with the open-elements stack.
    in_foreign_content: bool,

    current_tag_kind: TagKind,
    current_tag_name: StrTendril,
    current_tag_self_closing: bool,
    current_tag_attrs: Vec<Attribute>,
    current_attr_name: StrTendril,
    current_attr_value: StrTendril,
    current_comment: StrTendril,
    current_doctype: Doctype,

    /// Last start tag name, for "appropriate end tag" checks.
    last_start_tag_name: Option<StrTendril>,

    /// The temporary buffer for raw-text end-tag matching.
    temp_buf: StrTendril,

    errors: Rc<dyn ErrorSink>,
}

impl Tokenizer {
    pub fn new(errors: Rc<dyn ErrorSink>) -> Tokenizer {
        Tokenizer::with_opts(TokenizerOpts::default(), errors)
    }

    pub fn with_opts(opts: TokenizerOpts, errors: Rc<dyn ErrorSink>) -> Tokenizer {
        let state = opts.initial_state.unwrap_or(states::Data);
        let last_start_tag_name = opts
            .last_start_tag_name
            .map(|name| StrTendril::from_slice(&name));
        Tokenizer {
            input: InputStream::new(errors.clone()),
            state,
            pending: VecDeque::new(),
            char_ref_tokenizer: None,
            char_ref_pos: Position::default(),
            token_start: Position::default(),
            done: false,
            in_foreign_content: false,
            current_tag_kind: StartTag,
            current_tag_name: StrTendril::new(),
            current_tag_self_closing: false,
            current_tag_attrs: vec![],
            current_attr_name: StrTendril::new(),
            current_attr_value: StrTendril::new(),
            current_comment: StrTendril::new(),
            current_doctype: Doctype::default(),
            last_start_tag_name,
            temp_buf: StrTendril::new(),
            errors,
        }
    }

    /// A tokenizer that reports nowhere.
    pub fn new_silent() -> Tokenizer {
        Tokenizer::new(Rc::new(NullSink))
    }

    /// Feed raw bytes into the tokenizer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.feed_bytes(bytes);
    }

    /// Declare the input complete.  The tokenizer will finish whatever
    /// construct is open and emit the EOF token.
    pub fn end(&mut self) {
        self.input.mark_eof();
    }

    /// Pull the next token.  Returns `NeedMore` when the machine cannot
    /// proceed without more input (or, after the EOF token, forever).
    pub fn next_token(&mut self) -> TokenizerResult {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return TokenizerResult::Token(token);
            }
            if self.done {
                return TokenizerResult::NeedMore;
            }
            if let ProcessResult::Suspend = self.step() {
                return match self.pending.pop_front() {
                    Some(token) => TokenizerResult::Token(token),
                    None => TokenizerResult::NeedMore,
                };
            }
        }
    }

    /// Override the machine state.  The tree constructor calls this
    /// after a start tag whose element takes raw text, RCDATA, script
    /// data or plaintext.
    pub fn set_state(&mut self, state: states::State) {
        self.state = state;
    }

    /// Gate for `<![CDATA[` sections.
    pub fn set_foreign_content(&mut self, in_foreign_content: bool) {
        self.in_foreign_content = in_foreign_content;
    }

    //§ tokenization
    fn get_char(&mut self) -> Option<char> {
        match self.input.consume() {
            Some(CodePoint::Char(c)) => {
                trace!("got character {c:?}");
                Some(c)
            },
            Some(CodePoint::Eof) | None => None,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        match self.input.peek() {
            Some(CodePoint::Char(c)) => Some(c),
            Some(CodePoint::Eof) | None => None,
        }
    }

    fn error(&mut self, kind: ParseErrorKind) {
        self.errors.report(kind, self.input.pos());
    }

    fn error_at(&mut self, kind: ParseErrorKind, pos: Position) {
        self.errors.report(kind, pos);
    }

    fn emit(&mut self, pos: Position, data: TokenData) {
        self.pending.push_back(Token::new(pos, data));
    }

    fn emit_char(&mut self, c: char) {
        let pos = self.input.pos();
        self.emit(pos, CharacterToken(c));
    }

    fn emit_char_at(&mut self, pos: Position, c: char) {
        self.emit(pos, CharacterToken(c));
    }

    /// Replay the temporary buffer as character tokens, attributed to
    /// the position where the construct began.
    fn emit_temp_buf(&mut self) {
        let buf = std::mem::take(&mut self.temp_buf);
        for c in buf.chars() {
            self.emit(self.token_start, CharacterToken(c));
        }
    }

    fn clear_temp_buf(&mut self) {
        self.temp_buf.clear();
    }

    fn emit_eof(&mut self) {
        let pos = self.input.pos();
        self.emit(pos, EofToken);
        self.done = true;
    }

    fn create_tag(&mut self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_name.push_char(c);
        self.current_tag_kind = kind;
    }

    fn discard_tag(&mut self) {
        self.current_tag_name.clear();
        self.current_tag_self_closing = false;
        self.current_tag_attrs = vec![];
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name.as_ref() {
            Some(last) => self.current_tag_kind == EndTag && *self.current_tag_name == **last,
            None => false,
        }
    }

    fn create_attribute(&mut self, c: char) {
        self.finish_attribute();
        self.current_attr_name.push_char(c);
    }

    fn finish_attribute(&mut self) {
        if self.current_attr_name.is_empty() {
            return;
        }

        // First occurrence wins; later duplicates are dropped whole.
        let dup = {
            let name = &self.current_attr_name;
            self.current_tag_attrs.iter().any(|a| a.name == *name)
        };

        if dup {
            self.error(ParseErrorKind::DuplicateAttribute);
            self.current_attr_name.clear();
            self.current_attr_value.clear();
        } else {
            let name = std::mem::take(&mut self.current_attr_name);
            let value = std::mem::take(&mut self.current_attr_value);
            self.current_tag_attrs.push(Attribute { name, value });
        }
    }

    fn emit_current_tag(&mut self) {
        self.finish_attribute();

        let name = TagName::from_str(&self.current_tag_name);

        match self.current_tag_kind {
            StartTag => {
                self.last_start_tag_name = Some(self.current_tag_name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.is_empty() {
                    self.error_at(ParseErrorKind::EndTagWithAttributes, self.token_start);
                    self.current_tag_attrs.clear();
                }
                if self.current_tag_self_closing {
                    self.error_at(ParseErrorKind::EndTagWithTrailingSolidus, self.token_start);
                }
            },
        }
        self.current_tag_name.clear();

        let tag = Tag {
            kind: self.current_tag_kind,
            name,
            self_closing: self.current_tag_self_closing,
            attrs: std::mem::take(&mut self.current_tag_attrs),
        };
        self.emit(self.token_start, TagToken(tag));
    }

    fn emit_current_comment(&mut self) {
        let comment = std::mem::take(&mut self.current_comment);
        self.emit(self.token_start, CommentToken(comment));
    }

    fn emit_current_doctype(&mut self) {
        let doctype = std::mem::take(&mut self.current_doctype);
        self.emit(self.token_start, DoctypeToken(doctype));
    }

    fn doctype_id(&mut self, kind: DoctypeIdKind) -> &mut Option<StrTendril> {
        match kind {
            Public => &mut self.current_doctype.public_id,
            System => &mut self.current_doctype.system_id,
        }
    }

    fn clear_doctype_id(&mut self, kind: DoctypeIdKind) {
        let id = self.doctype_id(kind);
        match id {
            Some(s) => s.clear(),
            None => *id = Some(StrTendril::new()),
        }
    }

    fn consume_char_ref(&mut self) {
        let in_attr = matches!(self.state, states::AttributeValue(_));
        self.char_ref_pos = self.input.pos();
        self.char_ref_tokenizer = Some(Box::new(CharRefTokenizer::new(in_attr)));
    }
}

// Shorthand for common state machine behaviors.
macro_rules! shorthand (
    ( $me:ident : emit $c:expr                     ) => ( $me.emit_char($c)                             );
    ( $me:ident : emit_at $c:expr                  ) => ( $me.emit_char_at($me.token_start, $c)         );
    ( $me:ident : create_tag $kind:ident $c:expr   ) => ( $me.create_tag($kind, $c)                     );
    ( $me:ident : push_tag $c:expr                 ) => ( $me.current_tag_name.push_char($c)            );
    ( $me:ident : discard_tag                      ) => ( $me.discard_tag()                             );
    ( $me:ident : push_temp $c:expr                ) => ( $me.temp_buf.push_char($c)                    );
    ( $me:ident : clear_temp                       ) => ( $me.clear_temp_buf()                          );
    ( $me:ident : create_attr $c:expr              ) => ( $me.create_attribute($c)                      );
    ( $me:ident : push_name $c:expr                ) => ( $me.current_attr_name.push_char($c)           );
    ( $me:ident : push_value $c:expr               ) => ( $me.current_attr_value.push_char($c)          );
    ( $me:ident : push_comment $c:expr             ) => ( $me.current_comment.push_char($c)             );
    ( $me:ident : append_comment $c:expr           ) => ( $me.current_comment.push_slice($c)            );
    ( $me:ident : emit_comment                     ) => ( $me.emit_current_comment()                    );
    ( $me:ident : clear_comment                    ) => ( $me.current_comment.clear()                   );
    ( $me:ident : create_doctype                   ) => ( $me.current_doctype = Doctype::default()      );
    ( $me:ident : push_doctype_name $c:expr        ) => ( option_push(&mut $me.current_doctype.name, $c) );
    ( $me:ident : push_doctype_id $k:ident $c:expr ) => ( option_push($me.doctype_id($k), $c)           );
    ( $me:ident : clear_doctype_id $k:ident        ) => ( $me.clear_doctype_id($k)                      );
    ( $me:ident : force_quirks                     ) => ( $me.current_doctype.force_quirks = true       );
    ( $me:ident : emit_doctype                     ) => ( $me.emit_current_doctype()                    );
    ( $me:ident : error $kind:ident                ) => ( $me.error(ParseErrorKind::$kind)              );
    ( $me:ident : mark_start                       ) => ( $me.token_start = $me.input.pos()             );
);

// A little DSL for sequencing shorthand actions.
macro_rules! go (
    // A pattern like $($cmd:tt)* ; $($rest:tt)* causes parse ambiguity.
    // We have to tell the parser how much lookahead we need.

    ( $me:ident : $a:tt                   ; $($rest:tt)* ) => ({ shorthand!($me: $a);          go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt             ; $($rest:tt)* ) => ({ shorthand!($me: $a $b);       go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt       ; $($rest:tt)* ) => ({ shorthand!($me: $a $b $c);    go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt $d:tt ; $($rest:tt)* ) => ({ shorthand!($me: $a $b $c $d); go!($me: $($rest)*); });

    // These can only come at the end.

    ( $me:ident : to $s:ident                    ) => ({ $me.state = states::$s; return ProcessResult::Continue;           });
    ( $me:ident : to $s:ident $k1:expr           ) => ({ $me.state = states::$s($k1); return ProcessResult::Continue;      });
    ( $me:ident : to $s:ident $k1:ident $k2:expr ) => ({ $me.state = states::$s($k1($k2)); return ProcessResult::Continue; });

    ( $me:ident : reconsume $s:ident                    ) => ({ $me.input.reconsume(); go!($me: to $s);         });
    ( $me:ident : reconsume $s:ident $k1:expr           ) => ({ $me.input.reconsume(); go!($me: to $s $k1);     });
    ( $me:ident : reconsume $s:ident $k1:ident $k2:expr ) => ({ $me.input.reconsume(); go!($me: to $s $k1 $k2); });

    ( $me:ident : consume_char_ref ) => ({ $me.consume_char_ref(); return ProcessResult::Continue; });

    ( $me:ident : emit_tag $s:ident ) => ({
        $me.state = states::$s;
        $me.emit_current_tag();
        return ProcessResult::Continue;
    });

    ( $me:ident : eof ) => ({ $me.emit_eof(); return ProcessResult::Suspend; });

    // If nothing else matched, it's a single command
    ( $me:ident : $($cmd:tt)+ ) => ( shorthand!($me: $($cmd)+) );

    // or nothing.
    ( $me:ident : ) => (());
);

// These are macros because they can cause early return
// from the function where they are used.
macro_rules! get_char ( ($me:expr) => (
    unwrap_or_return!($me.get_char(), ProcessResult::Suspend)
));

macro_rules! peek ( ($me:expr) => (
    unwrap_or_return!($me.peek_char(), ProcessResult::Suspend)
));

macro_rules! eat ( ($me:expr, $pat:expr) => (
    unwrap_or_return!($me.input.eat($pat, true), ProcessResult::Suspend)
));

macro_rules! eat_exact ( ($me:expr, $pat:expr) => (
    unwrap_or_return!($me.input.eat($pat, false), ProcessResult::Suspend)
));

impl Tokenizer {
    // Run the state machine until it emits something or runs dry.
    fn step(&mut self) -> ProcessResult {
        if self.char_ref_tokenizer.is_some() {
            return self.step_char_ref_tokenizer();
        }

        if self.input.at_eof() {
            return self.eof_step();
        }

        trace!("processing in state {:?}", self.state);
        match self.state {
            //§ data-state
            states::Data => loop {
                match get_char!(self) {
                    '&' => go!(self: consume_char_ref),
                    '<' => go!(self: mark_start; to TagOpen),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                    },
                    c => go!(self: emit c),
                }
            },

            //§ rcdata-state
            states::RawData(Rcdata) => loop {
                match get_char!(self) {
                    '&' => go!(self: consume_char_ref),
                    '<' => go!(self: mark_start; to RawLessThanSign Rcdata),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                    },
                    c => go!(self: emit c),
                }
            },

            //§ rawtext-state script-data-state
            states::RawData(kind @ (Rawtext | ScriptData)) => loop {
                match get_char!(self) {
                    '<' => go!(self: mark_start; to RawLessThanSign kind),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                    },
                    c => go!(self: emit c),
                }
            },

            //§ script-data-escaped-state script-data-double-escaped-state
            states::RawData(ScriptDataEscaped(kind)) => loop {
                match get_char!(self) {
                    '-' => {
                        go!(self: emit '-');
                        go!(self: to ScriptDataEscapedDash kind);
                    },
                    '<' => {
                        if kind == DoubleEscaped {
                            go!(self: emit '<');
                        } else {
                            go!(self: mark_start);
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                    },
                    c => go!(self: emit c),
                }
            },

            //§ plaintext-state
            states::Plaintext => loop {
                match get_char!(self) {
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                    },
                    c => go!(self: emit c),
                }
            },

            //§ tag-open-state
            states::TagOpen => loop {
                match get_char!(self) {
                    '!' => go!(self: to MarkupDeclarationOpen),
                    '/' => go!(self: to EndTagOpen),
                    '?' => {
                        go!(self: error UnexpectedQuestionMarkInsteadOfTagName);
                        go!(self: clear_comment; reconsume BogusComment);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag StartTag cl; to TagName),
                        None => {
                            go!(self: error InvalidFirstCharacterOfTagName);
                            go!(self: emit_at '<');
                            go!(self: reconsume Data);
                        },
                    },
                }
            },

            //§ end-tag-open-state
            states::EndTagOpen => loop {
                match get_char!(self) {
                    '>' => {
                        go!(self: error MissingEndTagName);
                        go!(self: to Data);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag EndTag cl; to TagName),
                        None => {
                            go!(self: error InvalidFirstCharacterOfTagName);
                            go!(self: clear_comment; reconsume BogusComment);
                        },
                    },
                }
            },

            //§ tag-name-state
            states::TagName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_tag '\u{fffd}');
                    },
                    c => go!(self: push_tag (c.to_ascii_lowercase())),
                }
            },

            //§ script-data-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(Escaped)) => loop {
                match get_char!(self) {
                    '/' => go!(self: clear_temp; to RawEndTagOpen ScriptDataEscaped Escaped),
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: clear_temp; push_temp cl);
                            go!(self: emit_at '<'; emit c);
                            go!(self: to ScriptDataEscapeStart DoubleEscaped);
                        },
                        None => {
                            go!(self: emit_at '<');
                            go!(self: reconsume RawData ScriptDataEscaped Escaped);
                        },
                    },
                }
            },

            //§ script-data-double-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => loop {
                match get_char!(self) {
                    '/' => {
                        go!(self: clear_temp);
                        go!(self: emit '/');
                        go!(self: to ScriptDataDoubleEscapeEnd);
                    },
                    _ => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
                }
            },

            //§ rcdata-less-than-sign-state rawtext-less-than-sign-state script-data-less-than-sign-state
            states::RawLessThanSign(kind) => loop {
                match get_char!(self) {
                    '/' => go!(self: clear_temp; to RawEndTagOpen kind),
                    '!' if kind == ScriptData => {
                        go!(self: emit_at '<'; emit '!');
                        go!(self: to ScriptDataEscapeStart Escaped);
                    },
                    _ => {
                        go!(self: emit_at '<');
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ rcdata-end-tag-open-state rawtext-end-tag-open-state script-data-end-tag-open-state script-data-escaped-end-tag-open-state
            states::RawEndTagOpen(kind) => loop {
                let c = get_char!(self);
                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: create_tag EndTag cl; push_temp c; to RawEndTagName kind),
                    None => {
                        go!(self: emit_at '<'; emit_at '/');
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ rcdata-end-tag-name-state rawtext-end-tag-name-state script-data-end-tag-name-state script-data-escaped-end-tag-name-state
            states::RawEndTagName(kind) => loop {
                let c = get_char!(self);
                if self.have_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => {
                            go!(self: clear_temp; to BeforeAttributeName)
                        },
                        '/' => go!(self: clear_temp; to SelfClosingStartTag),
                        '>' => go!(self: clear_temp; emit_tag Data),
                        _ => (),
                    }
                }

                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: push_tag cl; push_temp c),
                    None => {
                        go!(self: discard_tag);
                        go!(self: emit_at '<'; emit_at '/');
                        self.emit_temp_buf();
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ script-data-double-escape-start-state
            states::ScriptDataEscapeStart(DoubleEscaped) => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            DoubleEscaped
                        } else {
                            Escaped
                        };
                        go!(self: emit c);
                        go!(self: to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            go!(self: emit c);
                        },
                        None => go!(self: reconsume RawData ScriptDataEscaped Escaped),
                    },
                }
            },

            //§ script-data-escape-start-state
            states::ScriptDataEscapeStart(Escaped) => loop {
                match get_char!(self) {
                    '-' => {
                        go!(self: emit '-');
                        go!(self: to ScriptDataEscapeStartDash);
                    },
                    _ => go!(self: reconsume RawData ScriptData),
                }
            },

            //§ script-data-escape-start-dash-state
            states::ScriptDataEscapeStartDash => loop {
                match get_char!(self) {
                    '-' => {
                        go!(self: emit '-');
                        go!(self: to ScriptDataEscapedDashDash Escaped);
                    },
                    _ => go!(self: reconsume RawData ScriptData),
                }
            },

            //§ script-data-escaped-dash-state script-data-double-escaped-dash-state
            states::ScriptDataEscapedDash(kind) => loop {
                match get_char!(self) {
                    '-' => {
                        go!(self: emit '-');
                        go!(self: to ScriptDataEscapedDashDash kind);
                    },
                    '<' => {
                        if kind == DoubleEscaped {
                            go!(self: emit '<');
                        } else {
                            go!(self: mark_start);
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                    c => {
                        go!(self: emit c);
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                }
            },

            //§ script-data-escaped-dash-dash-state script-data-double-escaped-dash-dash-state
            states::ScriptDataEscapedDashDash(kind) => loop {
                match get_char!(self) {
                    '-' => go!(self: emit '-'),
                    '<' => {
                        if kind == DoubleEscaped {
                            go!(self: emit '<');
                        } else {
                            go!(self: mark_start);
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '>' => {
                        go!(self: emit '>');
                        go!(self: to RawData ScriptData);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: emit '\u{fffd}');
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                    c => {
                        go!(self: emit c);
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                }
            },

            //§ script-data-double-escape-end-state
            states::ScriptDataDoubleEscapeEnd => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            Escaped
                        } else {
                            DoubleEscaped
                        };
                        go!(self: emit c);
                        go!(self: to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            go!(self: emit c);
                        },
                        None => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
                    },
                }
            },

            //§ before-attribute-name-state
            states::BeforeAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    '=' => {
                        go!(self: error UnexpectedEqualsSignBeforeAttributeName);
                        go!(self: create_attr '='; to AttributeName);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_attr '\u{fffd}'; to AttributeName);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: create_attr c; to AttributeName);
                        },
                    },
                }
            },

            //§ attribute-name-state
            states::AttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to AfterAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_name '\u{fffd}');
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: push_name cl),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: push_name c);
                        },
                    },
                }
            },

            //§ after-attribute-name-state
            states::AfterAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_attr '\u{fffd}'; to AttributeName);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: create_attr c; to AttributeName);
                        },
                    },
                }
            },

            //§ before-attribute-value-state
            // Peek so the unquoted case can reprocess its first character.
            states::BeforeAttributeValue => loop {
                match peek!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        self.input.consume();
                    },
                    '"' => {
                        self.input.consume();
                        go!(self: to AttributeValue DoubleQuoted);
                    },
                    '\'' => {
                        self.input.consume();
                        go!(self: to AttributeValue SingleQuoted);
                    },
                    '>' => {
                        self.input.consume();
                        go!(self: error MissingAttributeValue);
                        go!(self: emit_tag Data);
                    },
                    _ => go!(self: to AttributeValue Unquoted),
                }
            },

            //§ attribute-value-(double-quoted)-state
            states::AttributeValue(DoubleQuoted) => loop {
                match get_char!(self) {
                    '"' => go!(self: to AfterAttributeValueQuoted),
                    '&' => go!(self: consume_char_ref),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_value '\u{fffd}');
                    },
                    c => go!(self: push_value c),
                }
            },

            //§ attribute-value-(single-quoted)-state
            states::AttributeValue(SingleQuoted) => loop {
                match get_char!(self) {
                    '\'' => go!(self: to AfterAttributeValueQuoted),
                    '&' => go!(self: consume_char_ref),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_value '\u{fffd}');
                    },
                    c => go!(self: push_value c),
                }
            },

            //§ attribute-value-(unquoted)-state
            states::AttributeValue(Unquoted) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                    '&' => go!(self: consume_char_ref),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_value '\u{fffd}');
                    },
                    c => {
                        if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            go!(self: error UnexpectedCharacterInUnquotedAttributeValue);
                        }
                        go!(self: push_value c);
                    },
                }
            },

            //§ after-attribute-value-(quoted)-state
            states::AfterAttributeValueQuoted => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    _ => {
                        go!(self: error MissingWhitespaceBetweenAttributes);
                        go!(self: reconsume BeforeAttributeName);
                    },
                }
            },

            //§ self-closing-start-tag-state
            states::SelfClosingStartTag => loop {
                match get_char!(self) {
                    '>' => {
                        self.current_tag_self_closing = true;
                        go!(self: emit_tag Data);
                    },
                    _ => {
                        go!(self: error UnexpectedSolidusInTag);
                        go!(self: reconsume BeforeAttributeName);
                    },
                }
            },

            //§ bogus-comment-state
            states::BogusComment => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_comment '\u{fffd}');
                    },
                    c => go!(self: push_comment c),
                }
            },

            //§ markup-declaration-open-state
            states::MarkupDeclarationOpen => loop {
                if eat_exact!(self, "--") {
                    go!(self: clear_comment; to CommentStart);
                } else if eat!(self, "doctype") {
                    go!(self: to Doctype);
                } else if self.in_foreign_content && eat_exact!(self, "[CDATA[") {
                    go!(self: to CdataSection);
                } else {
                    if !self.in_foreign_content && eat_exact!(self, "[CDATA[") {
                        go!(self: error CdataInHtmlContent);
                        go!(self: clear_comment; append_comment "[CDATA[");
                        go!(self: to BogusComment);
                    }
                    go!(self: error IncorrectlyOpenedComment);
                    go!(self: clear_comment; to BogusComment);
                }
            },

            //§ comment-start-state
            states::CommentStart => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentStartDash),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_comment '\u{fffd}'; to Comment);
                    },
                    '>' => {
                        go!(self: error AbruptClosingOfEmptyComment);
                        go!(self: emit_comment; to Data);
                    },
                    c => go!(self: push_comment c; to Comment),
                }
            },

            //§ comment-start-dash-state
            states::CommentStartDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentEnd),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: append_comment "-\u{fffd}"; to Comment);
                    },
                    '>' => {
                        go!(self: error AbruptClosingOfEmptyComment);
                        go!(self: emit_comment; to Data);
                    },
                    c => go!(self: push_comment '-'; push_comment c; to Comment),
                }
            },

            //§ comment-state
            states::Comment => loop {
                match get_char!(self) {
                    c @ '<' => go!(self: push_comment c; to CommentLessThanSign),
                    '-' => go!(self: to CommentEndDash),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_comment '\u{fffd}');
                    },
                    c => go!(self: push_comment c),
                }
            },

            //§ comment-less-than-sign-state
            states::CommentLessThanSign => loop {
                match get_char!(self) {
                    c @ '!' => go!(self: push_comment c; to CommentLessThanSignBang),
                    c @ '<' => go!(self: push_comment c),
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-less-than-sign-bang
            states::CommentLessThanSignBang => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentLessThanSignBangDash),
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-less-than-sign-bang-dash
            states::CommentLessThanSignBangDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentLessThanSignBangDashDash),
                    _ => go!(self: reconsume CommentEndDash),
                }
            },

            //§ comment-less-than-sign-bang-dash-dash
            states::CommentLessThanSignBangDashDash => loop {
                match get_char!(self) {
                    '>' => go!(self: reconsume CommentEnd),
                    _ => {
                        go!(self: error NestedComment);
                        go!(self: reconsume CommentEnd);
                    },
                }
            },

            //§ comment-end-dash-state
            states::CommentEndDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentEnd),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: append_comment "-\u{fffd}"; to Comment);
                    },
                    c => go!(self: push_comment '-'; push_comment c; to Comment),
                }
            },

            //§ comment-end-state
            states::CommentEnd => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '!' => go!(self: to CommentEndBang),
                    '-' => go!(self: push_comment '-'),
                    _ => go!(self: append_comment "--"; reconsume Comment),
                }
            },

            //§ comment-end-bang-state
            states::CommentEndBang => loop {
                match get_char!(self) {
                    '-' => go!(self: append_comment "--!"; to CommentEndDash),
                    '>' => {
                        go!(self: error IncorrectlyClosedComment);
                        go!(self: emit_comment; to Data);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: append_comment "--!\u{fffd}"; to Comment);
                    },
                    c => go!(self: append_comment "--!"; push_comment c; to Comment),
                }
            },

            //§ doctype-state
            states::Doctype => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeName),
                    '>' => go!(self: reconsume BeforeDoctypeName),
                    _ => {
                        go!(self: error MissingWhitespaceBeforeDoctypeName);
                        go!(self: reconsume BeforeDoctypeName);
                    },
                }
            },

            //§ before-doctype-name-state
            states::BeforeDoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_doctype; push_doctype_name '\u{fffd}'; to DoctypeName);
                    },
                    '>' => {
                        go!(self: error MissingDoctypeName);
                        go!(self: create_doctype; force_quirks; emit_doctype; to Data);
                    },
                    c => go!(self: create_doctype; push_doctype_name (c.to_ascii_lowercase());
                                  to DoctypeName),
                }
            },

            //§ doctype-name-state
            states::DoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to AfterDoctypeName),
                    '>' => go!(self: emit_doctype; to Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_doctype_name '\u{fffd}');
                    },
                    c => go!(self: push_doctype_name (c.to_ascii_lowercase())),
                }
            },

            //§ after-doctype-name-state
            states::AfterDoctypeName => loop {
                if eat!(self, "public") {
                    go!(self: to AfterDoctypeKeyword Public);
                } else if eat!(self, "system") {
                    go!(self: to AfterDoctypeKeyword System);
                } else {
                    match get_char!(self) {
                        '\t' | '\n' | '\x0C' | ' ' => (),
                        '>' => go!(self: emit_doctype; to Data),
                        _ => {
                            go!(self: error InvalidCharacterSequenceAfterDoctypeName);
                            go!(self: force_quirks; reconsume BogusDoctype);
                        },
                    }
                }
            },

            //§ after-doctype-public-keyword-state after-doctype-system-keyword-state
            states::AfterDoctypeKeyword(kind) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeIdentifier kind),
                    '"' => {
                        self.error(missing_whitespace_after_keyword(kind));
                        go!(self: clear_doctype_id kind; to DoctypeIdentifierDoubleQuoted kind);
                    },
                    '\'' => {
                        self.error(missing_whitespace_after_keyword(kind));
                        go!(self: clear_doctype_id kind; to DoctypeIdentifierSingleQuoted kind);
                    },
                    '>' => {
                        self.error(missing_identifier(kind));
                        go!(self: force_quirks; emit_doctype; to Data);
                    },
                    _ => {
                        self.error(missing_quote_before_identifier(kind));
                        go!(self: force_quirks; reconsume BogusDoctype);
                    },
                }
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            states::BeforeDoctypeIdentifier(kind) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => go!(self: clear_doctype_id kind; to DoctypeIdentifierDoubleQuoted kind),
                    '\'' => go!(self: clear_doctype_id kind; to DoctypeIdentifierSingleQuoted kind),
                    '>' => {
                        self.error(missing_identifier(kind));
                        go!(self: force_quirks; emit_doctype; to Data);
                    },
                    _ => {
                        self.error(missing_quote_before_identifier(kind));
                        go!(self: force_quirks; reconsume BogusDoctype);
                    },
                }
            },

            //§ doctype-public-identifier-(double-quoted)-state doctype-system-identifier-(double-quoted)-state
            states::DoctypeIdentifierDoubleQuoted(kind) => loop {
                match get_char!(self) {
                    '"' => go!(self: to AfterDoctypeIdentifier kind),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_doctype_id kind '\u{fffd}');
                    },
                    '>' => {
                        self.error(abrupt_identifier(kind));
                        go!(self: force_quirks; emit_doctype; to Data);
                    },
                    c => go!(self: push_doctype_id kind c),
                }
            },

            //§ doctype-public-identifier-(single-quoted)-state doctype-system-identifier-(single-quoted)-state
            states::DoctypeIdentifierSingleQuoted(kind) => loop {
                match get_char!(self) {
                    '\'' => go!(self: to AfterDoctypeIdentifier kind),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: push_doctype_id kind '\u{fffd}');
                    },
                    '>' => {
                        self.error(abrupt_identifier(kind));
                        go!(self: force_quirks; emit_doctype; to Data);
                    },
                    c => go!(self: push_doctype_id kind c),
                }
            },

            //§ after-doctype-public-identifier-state
            states::AfterDoctypeIdentifier(Public) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        go!(self: to BetweenDoctypePublicAndSystemIdentifiers)
                    },
                    '>' => go!(self: emit_doctype; to Data),
                    '"' => {
                        go!(self: error MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                        go!(self: clear_doctype_id System; to DoctypeIdentifierDoubleQuoted System);
                    },
                    '\'' => {
                        go!(self: error MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                        go!(self: clear_doctype_id System; to DoctypeIdentifierSingleQuoted System);
                    },
                    _ => {
                        go!(self: error MissingQuoteBeforeDoctypeSystemIdentifier);
                        go!(self: force_quirks; reconsume BogusDoctype);
                    },
                }
            },

            //§ after-doctype-system-identifier-state
            states::AfterDoctypeIdentifier(System) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    _ => {
                        go!(self: error UnexpectedCharacterAfterDoctypeSystemIdentifier);
                        go!(self: reconsume BogusDoctype);
                    },
                }
            },

            //§ between-doctype-public-and-system-identifiers-state
            states::BetweenDoctypePublicAndSystemIdentifiers => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    '"' => {
                        go!(self: clear_doctype_id System; to DoctypeIdentifierDoubleQuoted System)
                    },
                    '\'' => {
                        go!(self: clear_doctype_id System; to DoctypeIdentifierSingleQuoted System)
                    },
                    _ => {
                        go!(self: error MissingQuoteBeforeDoctypeSystemIdentifier);
                        go!(self: force_quirks; reconsume BogusDoctype);
                    },
                }
            },

            //§ bogus-doctype-state
            states::BogusDoctype => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_doctype; to Data),
                    '\0' => go!(self: error UnexpectedNullCharacter),
                    _ => (),
                }
            },

            //§ cdata-section-state
            states::CdataSection => loop {
                match get_char!(self) {
                    ']' => go!(self: to CdataSectionBracket),
                    c => go!(self: emit c),
                }
            },

            //§ cdata-section-bracket
            states::CdataSectionBracket => loop {
                match get_char!(self) {
                    ']' => go!(self: to CdataSectionEnd),
                    _ => {
                        go!(self: emit ']');
                        go!(self: reconsume CdataSection);
                    },
                }
            },

            //§ cdata-section-end
            states::CdataSectionEnd => loop {
                match get_char!(self) {
                    ']' => go!(self: emit ']'),
                    '>' => go!(self: to Data),
                    _ => {
                        go!(self: emit ']'; emit ']');
                        go!(self: reconsume CdataSection);
                    },
                }
            },
            //§ END
        }
    }

    fn step_char_ref_tokenizer(&mut self) -> ProcessResult {
        // Take the sub-tokenizer out so it can borrow us mutably.
        let mut tok = unwrap_or_return!(self.char_ref_tokenizer.take(), ProcessResult::Continue);
        let outcome = tok.step(self);

        match outcome {
            Status::Done(result) => {
                self.process_char_ref(result);
                ProcessResult::Continue
            },
            Status::Stuck => {
                self.char_ref_tokenizer = Some(tok);
                ProcessResult::Suspend
            },
            Status::Progress => {
                self.char_ref_tokenizer = Some(tok);
                ProcessResult::Continue
            },
        }
    }

    fn process_char_ref(&mut self, result: Option<char>) {
        let c = result.unwrap_or('&');
        match self.state {
            states::AttributeValue(_) => self.current_attr_value.push_char(c),
            _ => {
                let pos = self.char_ref_pos;
                self.emit_char_at(pos, c);
            },
        }
    }

    fn eof_step(&mut self) -> ProcessResult {
        debug!("processing EOF in state {:?}", self.state);
        match self.state {
            states::Data
            | states::RawData(Rcdata)
            | states::RawData(Rawtext)
            | states::RawData(ScriptData)
            | states::Plaintext => go!(self: eof),

            states::TagName
            | states::BeforeAttributeName
            | states::AttributeName
            | states::AfterAttributeName
            | states::AttributeValue(_)
            | states::AfterAttributeValueQuoted
            | states::SelfClosingStartTag => {
                go!(self: error EofInTag);
                go!(self: discard_tag; to Data);
            },

            states::RawData(ScriptDataEscaped(_))
            | states::ScriptDataEscapedDash(_)
            | states::ScriptDataEscapedDashDash(_) => {
                go!(self: error EofInScriptHtmlCommentLikeText);
                go!(self: to Data);
            },

            states::BeforeAttributeValue => go!(self: to AttributeValue Unquoted),

            states::TagOpen => {
                go!(self: error EofBeforeTagName);
                go!(self: emit_at '<');
                go!(self: to Data);
            },

            states::EndTagOpen => {
                go!(self: error EofBeforeTagName);
                go!(self: emit_at '<'; emit_at '/');
                go!(self: to Data);
            },

            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::RawLessThanSign(kind) => {
                go!(self: emit_at '<');
                go!(self: to RawData kind);
            },

            states::RawEndTagOpen(kind) => {
                go!(self: emit_at '<'; emit_at '/');
                go!(self: to RawData kind);
            },

            states::RawEndTagName(kind) => {
                go!(self: emit_at '<'; emit_at '/');
                self.emit_temp_buf();
                go!(self: to RawData kind);
            },

            states::ScriptDataEscapeStart(kind) => go!(self: to RawData ScriptDataEscaped kind),

            states::ScriptDataEscapeStartDash => go!(self: to RawData ScriptData),

            states::ScriptDataDoubleEscapeEnd => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::CommentStart
            | states::CommentStartDash
            | states::Comment
            | states::CommentEndDash
            | states::CommentEnd
            | states::CommentEndBang => {
                go!(self: error EofInComment);
                go!(self: emit_comment; to Data);
            },

            states::CommentLessThanSign | states::CommentLessThanSignBang => {
                go!(self: to Comment)
            },

            states::CommentLessThanSignBangDash => go!(self: to CommentEndDash),

            states::CommentLessThanSignBangDashDash => go!(self: to CommentEnd),

            states::Doctype | states::BeforeDoctypeName => {
                go!(self: error EofInDoctype);
                go!(self: create_doctype; force_quirks; emit_doctype; to Data);
            },

            states::DoctypeName
            | states::AfterDoctypeName
            | states::AfterDoctypeKeyword(_)
            | states::BeforeDoctypeIdentifier(_)
            | states::DoctypeIdentifierDoubleQuoted(_)
            | states::DoctypeIdentifierSingleQuoted(_)
            | states::AfterDoctypeIdentifier(_)
            | states::BetweenDoctypePublicAndSystemIdentifiers => {
                go!(self: error EofInDoctype);
                go!(self: force_quirks; emit_doctype; to Data);
            },

            states::BogusDoctype => go!(self: emit_doctype; to Data),

            states::BogusComment => go!(self: emit_comment; to Data),

            states::MarkupDeclarationOpen => {
                go!(self: error IncorrectlyOpenedComment);
                go!(self: clear_comment; to BogusComment);
            },

            states::CdataSection => {
                go!(self: error EofInCdata);
                go!(self: to Data);
            },

            states::CdataSectionBracket => {
                go!(self: emit ']');
                go!(self: to CdataSection);
            },

            states::CdataSectionEnd => {
                go!(self: emit ']'; emit ']');
                go!(self: to CdataSection);
            },
        }
    }
}

fn missing_whitespace_after_keyword(kind: DoctypeIdKind) -> ParseErrorKind {
    match kind {
        Public => ParseErrorKind::MissingWhitespaceAfterDoctypePublicKeyword,
        System => ParseErrorKind::MissingWhitespaceAfterDoctypeSystemKeyword,
    }
}

fn missing_identifier(kind: DoctypeIdKind) -> ParseErrorKind {
    match kind {
        Public => ParseErrorKind::MissingDoctypePublicIdentifier,
        System => ParseErrorKind::MissingDoctypeSystemIdentifier,
    }
}

fn missing_quote_before_identifier(kind: DoctypeIdKind) -> ParseErrorKind {
    match kind {
        Public => ParseErrorKind::MissingQuoteBeforeDoctypePublicIdentifier,
        System => ParseErrorKind::MissingQuoteBeforeDoctypeSystemIdentifier,
    }
}

fn abrupt_identifier(kind: DoctypeIdKind) -> ParseErrorKind {
    match kind {
        Public => ParseErrorKind::AbruptDoctypePublicIdentifier,
        System => ParseErrorKind::AbruptDoctypeSystemIdentifier,
    }
}

#[cfg(test)]
mod test {
    use super::states;
    use super::{
        CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken, Token, TokenData,
        Tokenizer, TokenizerOpts, TokenizerResult,
    };
    use crate::catalog::{TagId, TagName};
    use crate::error::{CollectSink, ParseErrorKind, Position};
    use crate::tendril::StrTendril;
    use std::rc::Rc;

    fn tokenize_with(input: &str, opts: TokenizerOpts) -> (Vec<Token>, Rc<CollectSink>) {
        let sink = Rc::new(CollectSink::new());
        let mut tok = Tokenizer::with_opts(opts, sink.clone());
        tok.feed(input.as_bytes());
        tok.end();
        let mut tokens = vec![];
        while let TokenizerResult::Token(token) = tok.next_token() {
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                break;
            }
        }
        (tokens, sink)
    }

    fn tokenize(input: &str) -> (Vec<Token>, Rc<CollectSink>) {
        tokenize_with(input, TokenizerOpts::default())
    }

    fn data(tokens: &[Token]) -> Vec<TokenData> {
        tokens.iter().map(|t| t.data.clone()).collect()
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t.data {
                CharacterToken(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn start_tag(tokens: &[Token]) -> &super::Tag {
        for t in tokens {
            if let TagToken(tag) = &t.data {
                return tag;
            }
        }
        panic!("no tag token");
    }

    #[test]
    fn simple_tags_and_text() {
        let (tokens, errors) = tokenize("<a>x</a>");
        assert!(errors.is_empty());
        let expected = [
            (
                Position::new(1, 1),
                TagToken(super::Tag {
                    kind: super::StartTag,
                    name: TagName::Known(TagId::A),
                    self_closing: false,
                    attrs: vec![],
                }),
            ),
            (Position::new(1, 4), CharacterToken('x')),
            (
                Position::new(1, 5),
                TagToken(super::Tag {
                    kind: super::EndTag,
                    name: TagName::Known(TagId::A),
                    self_closing: false,
                    attrs: vec![],
                }),
            ),
            (Position::new(1, 8), EofToken),
        ];
        for (token, (pos, data)) in tokens.iter().zip(expected) {
            assert_eq!(token.pos, pos);
            assert_eq!(token.data, data);
        }
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn exactly_one_eof_and_it_is_last() {
        let (tokens, _) = tokenize("<p>hello");
        let eofs = tokens.iter().filter(|t| t.is_eof()).count();
        assert_eq!(eofs, 1);
        assert!(tokens.last().unwrap().is_eof());
    }

    #[test]
    fn tag_names_are_lowercased() {
        let (tokens, _) = tokenize("<DIV></dIv>");
        let names: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.data {
                TagToken(tag) => Some(tag.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![TagName::Known(TagId::Div), TagName::Known(TagId::Div)]
        );
    }

    #[test]
    fn unknown_tag_passes_through() {
        let (tokens, _) = tokenize("<blink>");
        assert_eq!(
            start_tag(&tokens).name,
            TagName::Unknown(StrTendril::from_slice("blink"))
        );
    }

    #[test]
    fn attributes_ordered_names_lowered_values_kept() {
        let (tokens, errors) = tokenize("<div ID=\"Main\" class='x y' checked data-A=b>");
        assert!(errors.is_empty());
        let tag = start_tag(&tokens);
        let attrs: Vec<(&str, &str)> = tag
            .attrs
            .iter()
            .map(|a| (&*a.name, &*a.value))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("id", "Main"),
                ("class", "x y"),
                ("checked", ""),
                ("data-a", "b"),
            ]
        );
    }

    #[test]
    fn duplicate_attribute_first_wins() {
        let (tokens, errors) = tokenize("<a href=\"1\" href=\"2\">");
        let tag = start_tag(&tokens);
        assert_eq!(tag.attrs.len(), 1);
        assert_eq!(&*tag.attrs[0].value, "1");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::DuplicateAttribute
        );
    }

    #[test]
    fn self_closing_flag() {
        let (tokens, errors) = tokenize("<br/>");
        assert!(errors.is_empty());
        assert!(start_tag(&tokens).self_closing);
    }

    #[test]
    fn end_tag_with_attributes_is_an_error() {
        let (tokens, errors) = tokenize("</a b=\"c\">");
        let tag = start_tag(&tokens);
        assert_eq!(tag.kind, super::EndTag);
        assert!(tag.attrs.is_empty());
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::EndTagWithAttributes
        );
    }

    #[test]
    fn comment_keeps_interior_text() {
        let (tokens, errors) = tokenize("<!-- hi -->");
        assert!(errors.is_empty());
        assert_eq!(
            data(&tokens)[0],
            CommentToken(StrTendril::from_slice(" hi "))
        );
    }

    #[test]
    fn comment_dash_edge_cases() {
        let (tokens, _) = tokenize("<!--a--b-->");
        assert_eq!(
            data(&tokens)[0],
            CommentToken(StrTendril::from_slice("a--b"))
        );

        let (tokens, errors) = tokenize("<!-->");
        assert_eq!(data(&tokens)[0], CommentToken(StrTendril::new()));
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::AbruptClosingOfEmptyComment
        );
    }

    #[test]
    fn bogus_comment_from_question_mark() {
        let (tokens, errors) = tokenize("<?php?>");
        assert_eq!(
            data(&tokens)[0],
            CommentToken(StrTendril::from_slice("?php?"))
        );
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::UnexpectedQuestionMarkInsteadOfTagName
        );
    }

    #[test]
    fn doctype_simple() {
        let (tokens, errors) = tokenize("<!DOCTYPE html>");
        assert!(errors.is_empty());
        match &tokens[0].data {
            DoctypeToken(dt) => {
                assert_eq!(dt.name.as_deref(), Some("html"));
                assert_eq!(dt.public_id, None);
                assert_eq!(dt.system_id, None);
                assert!(!dt.force_quirks);
            },
            other => panic!("expected doctype, got {other:?}"),
        }
    }

    #[test]
    fn doctype_with_public_and_system_ids() {
        let (tokens, errors) = tokenize(
            "<!doctype HTML PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \
             \"http://www.w3.org/TR/html4/strict.dtd\">",
        );
        assert!(errors.is_empty());
        match &tokens[0].data {
            DoctypeToken(dt) => {
                assert_eq!(dt.name.as_deref(), Some("html"));
                assert_eq!(dt.public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(
                    dt.system_id.as_deref(),
                    Some("http://www.w3.org/TR/html4/strict.dtd")
                );
                assert!(!dt.force_quirks);
            },
            other => panic!("expected doctype, got {other:?}"),
        }
    }

    #[test]
    fn doctype_missing_name_forces_quirks() {
        let (tokens, errors) = tokenize("<!DOCTYPE>");
        match &tokens[0].data {
            DoctypeToken(dt) => assert!(dt.force_quirks),
            other => panic!("expected doctype, got {other:?}"),
        }
        assert!(errors
            .errors
            .borrow()
            .iter()
            .any(|(k, _)| *k == ParseErrorKind::MissingDoctypeName));
    }

    #[test]
    fn named_character_references() {
        let (tokens, errors) = tokenize("a&amp;b");
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "a&b");

        let (tokens, errors) = tokenize("x&ampy");
        assert_eq!(text_of(&tokens), "x&y");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::MissingSemicolonAfterCharacterReference
        );

        let (tokens, errors) = tokenize("&nosuch;");
        assert_eq!(text_of(&tokens), "&nosuch;");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::UnknownNamedCharacterReference
        );
    }

    #[test]
    fn named_reference_longest_match() {
        // `&notit;` resolves the legacy `not` and returns the rest.
        let (tokens, _) = tokenize("&notit;");
        assert_eq!(text_of(&tokens), "\u{ac}it;");
    }

    #[test]
    fn numeric_character_references() {
        let (tokens, errors) = tokenize("&#65;&#x42;&#X63;");
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "ABc");

        let (tokens, errors) = tokenize("&#0;");
        assert_eq!(text_of(&tokens), "\u{fffd}");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::NullCharacterReference
        );

        let (tokens, errors) = tokenize("&#x110000;");
        assert_eq!(text_of(&tokens), "\u{fffd}");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::CharacterReferenceOutsideUnicodeRange
        );

        // 0x80 remaps to the euro sign.
        let (tokens, errors) = tokenize("&#x80;");
        assert_eq!(text_of(&tokens), "\u{20ac}");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::ControlCharacterReference
        );
    }

    #[test]
    fn character_reference_in_attribute() {
        let (tokens, errors) = tokenize("<a href=\"?x=1&amp;y=2\">");
        assert!(errors.is_empty());
        assert_eq!(
            start_tag(&tokens).attribute("href").map(|v| &**v),
            Some("?x=1&y=2")
        );

        // `&copy` followed by `=`: kept literal in attributes.
        let (tokens, errors) = tokenize("<a href=\"?x&copy=1\">");
        assert!(errors.is_empty());
        assert_eq!(
            start_tag(&tokens).attribute("href").map(|v| &**v),
            Some("?x&copy=1")
        );

        // But at the end of the value the legacy rule applies.
        let (tokens, _) = tokenize("<a href=\"&copy\">");
        assert_eq!(
            start_tag(&tokens).attribute("href").map(|v| &**v),
            Some("\u{a9}")
        );
    }

    #[test]
    fn ampersand_alone_is_literal() {
        let (tokens, errors) = tokenize("a & b");
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "a & b");
    }

    fn raw_opts(tag: &str, state: states::State) -> TokenizerOpts {
        TokenizerOpts {
            initial_state: Some(state),
            last_start_tag_name: Some(tag.to_string()),
        }
    }

    #[test]
    fn rawtext_runs_to_matching_end_tag() {
        let opts = raw_opts("style", states::RawData(states::Rawtext));
        let (tokens, errors) = tokenize_with("a<b>c</other></style>d", opts);
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "a<b>c</other>d");
        let names: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.data {
                TagToken(tag) => Some(tag.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec![TagName::Known(TagId::Style)]);
    }

    #[test]
    fn rcdata_decodes_character_references() {
        let opts = raw_opts("title", states::RawData(states::Rcdata));
        let (tokens, _) = tokenize_with("a&amp;b</title>", opts);
        assert_eq!(text_of(&tokens), "a&b");
    }

    #[test]
    fn script_data_less_than_is_text() {
        let opts = raw_opts("script", states::RawData(states::ScriptData));
        let (tokens, errors) = tokenize_with("a<b>c</script>d", opts);
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "a<b>cd");
    }

    #[test]
    fn script_data_escaped_comment_like() {
        let opts = raw_opts("script", states::RawData(states::ScriptData));
        let (tokens, _) = tokenize_with("<!--x--></script>", opts);
        assert_eq!(text_of(&tokens), "<!--x-->");
    }

    #[test]
    fn plaintext_swallows_everything() {
        let opts = TokenizerOpts {
            initial_state: Some(states::Plaintext),
            last_start_tag_name: None,
        };
        let (tokens, _) = tokenize_with("a</plaintext>b", opts);
        assert_eq!(text_of(&tokens), "a</plaintext>b");
    }

    #[test]
    fn unterminated_tag_reports_eof_in_tag_and_emits_nothing() {
        let (tokens, errors) = tokenize("<div class=\"x");
        assert_eq!(data(&tokens), vec![EofToken]);
        assert!(errors
            .errors
            .borrow()
            .iter()
            .any(|(k, _)| *k == ParseErrorKind::EofInTag));
    }

    #[test]
    fn eof_before_tag_name_keeps_lt_as_text() {
        let (tokens, errors) = tokenize("a<");
        assert_eq!(text_of(&tokens), "a<");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::EofBeforeTagName
        );
    }

    #[test]
    fn null_character_in_data_is_replaced() {
        let (tokens, errors) = tokenize("a\0b");
        assert_eq!(text_of(&tokens), "a\u{fffd}b");
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::UnexpectedNullCharacter
        );
    }

    #[test]
    fn crlf_positions_count_rows() {
        let (tokens, _) = tokenize("<a>\r\n<b>\r\n</b>\r\n</a>\r\n");
        let tags: Vec<Position> = tokens
            .iter()
            .filter_map(|t| match &t.data {
                TagToken(_) => Some(t.pos),
                _ => None,
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                Position::new(1, 1),
                Position::new(2, 1),
                Position::new(3, 1),
                Position::new(4, 1),
            ]
        );
    }

    #[test]
    fn incremental_feeding_resumes_mid_tag() {
        let sink = Rc::new(CollectSink::new());
        let mut tok = Tokenizer::new(sink);
        tok.feed(b"<di");
        assert_eq!(tok.next_token(), TokenizerResult::NeedMore);
        tok.feed(b"v cl");
        assert_eq!(tok.next_token(), TokenizerResult::NeedMore);
        tok.feed(b"ass=x>");
        match tok.next_token() {
            TokenizerResult::Token(token) => match token.data {
                TokenData::TagToken(tag) => {
                    assert_eq!(tag.name, TagName::Known(TagId::Div));
                    assert_eq!(&*tag.attrs[0].name, "class");
                    assert_eq!(&*tag.attrs[0].value, "x");
                },
                other => panic!("expected tag, got {other:?}"),
            },
            other => panic!("expected token, got {other:?}"),
        }
        tok.end();
        match tok.next_token() {
            TokenizerResult::Token(token) => assert!(token.is_eof()),
            other => panic!("expected eof, got {other:?}"),
        }
        assert_eq!(tok.next_token(), TokenizerResult::NeedMore);
    }

    #[test]
    fn cdata_outside_foreign_content_is_bogus_comment() {
        let (tokens, errors) = tokenize("<![CDATA[x]]>");
        assert_eq!(
            data(&tokens)[0],
            CommentToken(StrTendril::from_slice("[CDATA[x]]"))
        );
        assert_eq!(
            errors.errors.borrow()[0].0,
            ParseErrorKind::CdataInHtmlContent
        );
    }

    #[test]
    fn cdata_inside_foreign_content_is_text() {
        let sink = Rc::new(CollectSink::new());
        let mut tok = Tokenizer::new(sink.clone());
        tok.set_foreign_content(true);
        tok.feed(b"<![CDATA[a<b]]>");
        tok.end();
        let mut text = String::new();
        while let TokenizerResult::Token(token) = tok.next_token() {
            match token.data {
                CharacterToken(c) => text.push(c),
                EofToken => break,
                other => panic!("unexpected token {other:?}"),
            }
        }
        assert_eq!(text, "a<b");
        assert!(sink.is_empty());
    }

    #[test]
    fn whitespace_only_input() {
        let (tokens, errors) = tokenize("   \n  ");
        assert!(errors.is_empty());
        assert_eq!(text_of(&tokens), "   \n  ");
    }

    #[test]
    fn empty_input_is_just_eof() {
        let (tokens, errors) = tokenize("");
        assert_eq!(data(&tokens), vec![EofToken]);
        assert!(errors.is_empty());
    }
}
