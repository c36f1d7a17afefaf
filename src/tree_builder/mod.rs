// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tree constructor.
//!
//! Pulls tokens from the tokenizer under an insertion-mode state
//! machine and mutates the DOM.  Keeps the stack of open elements,
//! applies implicit opens and closes, and re-injects the tokenization
//! mode after raw-text start tags.

use std::rc::Rc;

use crate::catalog::{ElemFlags, TagName, TokenizerMode};
use crate::dom::{new_comment, new_doctype, new_element_with_attrs, Document, Handle};
use crate::error::{Error, ErrorSink, ParseErrorKind, Position};
use crate::tendril::StrTendril;
use crate::tokenizer::{states, Doctype, Tag, Tokenizer, TokenizerOpts, TokenizerResult};

use self::types::{InsertionMode, ProcessResult};

mod rules;
mod types;

/// The tree constructor.  Owns the tokenizer and the document under
/// construction.
pub(crate) struct TreeBuilder {
    tokenizer: Tokenizer,

    /// The document being built.
    doc: Document,

    /// Insertion mode.
    mode: InsertionMode,

    /// Original insertion mode, held while in `Text` mode.
    orig_mode: Option<InsertionMode>,

    /// Stack of open elements, most recently opened last.
    open_elems: Vec<Handle>,

    errors: Rc<dyn ErrorSink>,
}

impl TreeBuilder {
    pub(crate) fn new(errors: Rc<dyn ErrorSink>) -> TreeBuilder {
        TreeBuilder {
            tokenizer: Tokenizer::with_opts(TokenizerOpts::default(), errors.clone()),
            doc: Document::new(),
            mode: InsertionMode::Initial,
            orig_mode: None,
            open_elems: Vec::new(),
            errors,
        }
    }

    /// Feed bytes and process every token they complete.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.tokenizer.feed(bytes);
        self.drain()
    }

    /// Declare the input finished and return the document.
    pub(crate) fn finish(mut self) -> Result<Document, Error> {
        self.tokenizer.end();
        self.drain()?;
        Ok(self.doc)
    }

    fn drain(&mut self) -> Result<(), Error> {
        loop {
            match self.tokenizer.next_token() {
                TokenizerResult::Token(token) => {
                    let eof = token.is_eof();
                    self.process_token(&token)?;
                    if eof {
                        return Ok(());
                    }
                },
                TokenizerResult::NeedMore => return Ok(()),
            }
        }
    }

    fn process_token(&mut self, token: &crate::tokenizer::Token) -> Result<(), Error> {
        // A token can legitimately be reprocessed a few times while the
        // mode settles; more than that is a bug in the transition table.
        let mut fuel = 16u8;
        loop {
            match self.step(self.mode, token)? {
                ProcessResult::Done => return Ok(()),
                ProcessResult::Reprocess(mode) => {
                    self.mode = mode;
                    fuel = fuel
                        .checked_sub(1)
                        .ok_or(Error::Invariant("token reprocessed endlessly"))?;
                },
            }
        }
    }

    fn set_mode(&mut self, mode: InsertionMode) {
        self.mode = mode;
    }

    fn take_orig_mode(&mut self) -> InsertionMode {
        self.orig_mode.take().unwrap_or(InsertionMode::InBody)
    }

    fn report(&self, kind: ParseErrorKind, pos: Position) {
        self.errors.report(kind, pos);
    }

    /// Where new nodes go: the current open element, or the document
    /// itself when nothing is open.
    fn insertion_parent(&self) -> Handle {
        match self.open_elems.last() {
            Some(handle) => handle.clone(),
            None => self.doc.handle().clone(),
        }
    }

    fn current_node(&self) -> Option<&Handle> {
        self.open_elems.last()
    }

    fn pop(&mut self) -> Result<Handle, Error> {
        let handle = self
            .open_elems
            .pop()
            .ok_or(Error::Invariant("no current element"))?;
        self.sync_foreign();
        Ok(handle)
    }

    fn sync_foreign(&mut self) {
        let foreign = self
            .open_elems
            .iter()
            .any(|e| e.as_element().is_some_and(|e| e.flags().contains(ElemFlags::FOREIGN)));
        self.tokenizer.set_foreign_content(foreign);
    }

    fn insert_element(&mut self, tag: &Tag) -> Handle {
        let element = new_element_with_attrs(tag.name.clone(), tag.attrs.clone());
        self.insertion_parent().append_child(element.clone());
        element
    }

    /// Insert an element for a start tag and update the insertion mode
    /// and, for raw-text elements, the tokenizer state.
    fn insert_start_tag(
        &mut self,
        tag: &Tag,
        pos: Position,
        next_mode: InsertionMode,
    ) -> Result<(), Error> {
        let flags = tag.name.flags();

        if flags.contains(ElemFlags::VOID) {
            // Opened and immediately closed; never on the stack.
            self.insert_element(tag);
            self.set_mode(next_mode);
            return Ok(());
        }

        if tag.self_closing {
            self.report(
                ParseErrorKind::NonVoidHtmlElementStartTagWithTrailingSolidus,
                pos,
            );
        }

        let element = self.insert_element(tag);
        self.open_elems.push(element);
        if flags.contains(ElemFlags::FOREIGN) {
            self.sync_foreign();
        }

        match crate::catalog::tokenizer_mode_after_start(&tag.name) {
            TokenizerMode::Data => self.set_mode(next_mode),
            raw => {
                self.orig_mode = Some(next_mode);
                self.set_mode(InsertionMode::Text);
                self.tokenizer.set_state(match raw {
                    TokenizerMode::Rcdata => states::RawData(states::Rcdata),
                    TokenizerMode::Rawtext => states::RawData(states::Rawtext),
                    TokenizerMode::ScriptData => states::RawData(states::ScriptData),
                    _ => states::Plaintext,
                });
            },
        }
        Ok(())
    }

    fn insert_text(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insertion_parent().append_text(c.encode_utf8(&mut buf));
    }

    fn insert_comment(&mut self, text: StrTendril) {
        self.insertion_parent().append_child(new_comment(text));
    }

    fn append_comment_to_document(&mut self, text: StrTendril) {
        self.doc.handle().append_child(new_comment(text));
    }

    fn append_doctype(&mut self, doctype: &Doctype) {
        let node = new_doctype(
            doctype.name.clone().unwrap_or_default(),
            doctype.public_id.clone(),
            doctype.system_id.clone(),
            doctype.force_quirks,
        );
        self.doc.handle().append_child(node);
    }

    /// Does the current node have the same name as `name` and an
    /// omissible end tag?  Such elements close when their own start tag
    /// repeats.
    fn current_same_name_omit_end(&self, name: &TagName) -> bool {
        self.current_node()
            .and_then(|handle| handle.as_element())
            .is_some_and(|element| {
                element.flags().contains(ElemFlags::OMIT_END) && element.name() == name
            })
    }

    /// Pop down to and including `target_index`.  Elements above the
    /// target whose end tags are not omissible each get a parse error.
    fn close_stack_to(&mut self, target_index: usize, pos: Position) -> Result<(), Error> {
        while self.open_elems.len() > target_index + 1 {
            let popped = self.pop()?;
            let omissible = popped
                .as_element()
                .is_some_and(|e| e.flags().contains(ElemFlags::OMIT_END));
            if !omissible {
                self.report(ParseErrorKind::MisnestedEndTag, pos);
            }
        }
        if self.open_elems.len() > target_index {
            self.pop()?;
        }
        Ok(())
    }

    fn has_open_element(&self, name: &TagName) -> bool {
        self.open_elems
            .iter()
            .any(|handle| handle.as_element().is_some_and(|e| e.name() == name))
    }

    /// Implicitly close the head element, and anything left open inside
    /// it.
    fn close_head(&mut self, pos: Position) -> Result<(), Error> {
        let index = self.open_elems.iter().rposition(|handle| {
            handle
                .as_element()
                .is_some_and(|e| e.name().is(crate::catalog::TagId::Head))
        });
        match index {
            Some(index) => self.close_stack_to(index, pos),
            None => Ok(()),
        }
    }

    fn close_p_if_open(&mut self, pos: Position) -> Result<(), Error> {
        let p_index = self
            .open_elems
            .iter()
            .rposition(|handle| handle.as_element().is_some_and(|e| e.name().is(crate::catalog::TagId::P)));
        match p_index {
            Some(index) => self.close_stack_to(index, pos),
            None => Ok(()),
        }
    }

    /// An end tag: close the matching element, implicitly closing
    /// anything opened after it; ignore the tag if nothing matches.
    fn process_end_tag(&mut self, tag: &Tag, pos: Position) -> Result<(), Error> {
        let index = self
            .open_elems
            .iter()
            .rposition(|handle| {
                handle
                    .as_element()
                    .is_some_and(|element| element.name() == &tag.name)
            });
        let Some(index) = index else {
            self.report(ParseErrorKind::StrayEndTag, pos);
            return Ok(());
        };
        self.close_stack_to(index, pos)?;
        if self.open_elems.is_empty() {
            self.set_mode(InsertionMode::AfterBody);
        }
        Ok(())
    }

    /// End of input: whatever is still open closes implicitly.  One
    /// error covers all elements that needed an end tag.
    fn finish_eof(&mut self, pos: Position) -> Result<(), Error> {
        let mut reported = false;
        while !self.open_elems.is_empty() {
            let popped = self.pop()?;
            let omissible = popped
                .as_element()
                .is_some_and(|e| e.flags().contains(ElemFlags::OMIT_END));
            if !omissible && !reported {
                self.report(ParseErrorKind::UnexpectedEof, pos);
                reported = true;
            }
        }
        Ok(())
    }
}
