// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tree constructor rules.
//!
//! Mode changes are data, not control flow: `TRANSITIONS` is the
//! (mode, token class) → mode table and `MODE_ROUTES` folds the
//! unimplemented table-section modes onto `InBody`.  The `step_*`
//! methods perform tree mutations and consult the tables for every
//! mode switch.

use log::debug;

use super::types::{InsertionMode, ProcessResult};
use super::TreeBuilder;
use crate::catalog::TagId;
use crate::error::{Error, ParseErrorKind};
use crate::tokenizer::{EndTag, StartTag, Token};
use crate::tokenizer::{CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken};
use crate::util::str::is_parser_whitespace;

use self::InsertionMode::*;

/// A class of tokens, for transition lookup.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum On {
    Doctype,
    StartTag(TagId),
    AnyOtherStartTag,
    EndTag(TagId),
    AnythingElse,
}

/// Mode transitions driven by tokens.  First match wins; classes not
/// listed for a mode leave the mode unchanged.
pub(crate) static TRANSITIONS: &[(InsertionMode, On, InsertionMode)] = &[
    (Initial, On::Doctype, BeforeHtml),
    (Initial, On::AnythingElse, BeforeHtml),
    (BeforeHtml, On::StartTag(TagId::Html), BeforeHead),
    (BeforeHtml, On::AnyOtherStartTag, InBody),
    (BeforeHtml, On::AnythingElse, InBody),
    (BeforeHead, On::StartTag(TagId::Head), InHead),
    (BeforeHead, On::StartTag(TagId::Body), InBody),
    (BeforeHead, On::AnyOtherStartTag, InBody),
    (BeforeHead, On::EndTag(TagId::Html), AfterBody),
    (BeforeHead, On::AnythingElse, InBody),
    (InHead, On::EndTag(TagId::Head), AfterHead),
    (InHead, On::AnyOtherStartTag, AfterHead),
    (InHead, On::AnythingElse, AfterHead),
    (AfterHead, On::StartTag(TagId::Body), InBody),
    (AfterHead, On::AnyOtherStartTag, InBody),
    (AfterHead, On::EndTag(TagId::Html), AfterBody),
    (AfterHead, On::AnythingElse, InBody),
    (AfterBody, On::AnyOtherStartTag, InBody),
];

/// Insertion modes without a dedicated implementation, and where they
/// route.
pub(crate) static MODE_ROUTES: &[(InsertionMode, InsertionMode)] = &[
    (InTable, InBody),
    (InTableText, InBody),
    (InCaption, InBody),
    (InColumnGroup, InBody),
    (InTableBody, InBody),
    (InRow, InBody),
    (InCell, InBody),
    (InSelect, InBody),
    (AfterAfterBody, AfterBody),
];

pub(crate) fn routed_mode(mode: InsertionMode) -> InsertionMode {
    MODE_ROUTES
        .iter()
        .find(|&&(from, _)| from == mode)
        .map_or(mode, |&(_, to)| to)
}

fn lookup(mode: InsertionMode, on: On) -> Option<InsertionMode> {
    TRANSITIONS
        .iter()
        .find(|&&(from, class, _)| from == mode && class == on)
        .map(|&(_, _, to)| to)
}

/// Mode after a start tag: the specific entry if there is one, then
/// the generic one, then stay.
pub(crate) fn mode_after_start_tag(mode: InsertionMode, id: Option<TagId>) -> InsertionMode {
    id.and_then(|id| lookup(mode, On::StartTag(id)))
        .or_else(|| lookup(mode, On::AnyOtherStartTag))
        .unwrap_or(mode)
}

pub(crate) fn mode_after_end_tag(mode: InsertionMode, id: Option<TagId>) -> Option<InsertionMode> {
    id.and_then(|id| lookup(mode, On::EndTag(id)))
}

pub(crate) fn mode_after_doctype(mode: InsertionMode) -> InsertionMode {
    lookup(mode, On::Doctype).unwrap_or(mode)
}

/// Reprocessing target for tokens a mode does not handle itself.
pub(crate) fn anything_else(mode: InsertionMode) -> InsertionMode {
    lookup(mode, On::AnythingElse).unwrap_or(mode)
}

/// Start tags that implicitly close an open `p` element.
pub(crate) fn closes_p(id: TagId) -> bool {
    matches!(
        id,
        TagId::Address
            | TagId::Article
            | TagId::Aside
            | TagId::Blockquote
            | TagId::Dd
            | TagId::Details
            | TagId::Dialog
            | TagId::Div
            | TagId::Dl
            | TagId::Dt
            | TagId::Fieldset
            | TagId::Figcaption
            | TagId::Figure
            | TagId::Footer
            | TagId::Form
            | TagId::H1
            | TagId::H2
            | TagId::H3
            | TagId::H4
            | TagId::H5
            | TagId::H6
            | TagId::Header
            | TagId::Hgroup
            | TagId::Hr
            | TagId::Li
            | TagId::Main
            | TagId::Menu
            | TagId::Nav
            | TagId::Ol
            | TagId::P
            | TagId::Plaintext
            | TagId::Pre
            | TagId::Section
            | TagId::Summary
            | TagId::Table
            | TagId::Ul
            | TagId::Xmp
    )
}

/// Start tags handled inside `head` without closing it.
fn belongs_in_head(id: TagId) -> bool {
    matches!(
        id,
        TagId::Base
            | TagId::Link
            | TagId::Meta
            | TagId::Title
            | TagId::Style
            | TagId::Script
            | TagId::Noscript
            | TagId::Noframes
            | TagId::Template
    )
}

impl TreeBuilder {
    pub(crate) fn step(&mut self, mode: InsertionMode, token: &Token) -> Result<ProcessResult, Error> {
        let mode = routed_mode(mode);
        debug!("processing {:?} in insertion mode {mode:?}", token.data);
        match mode {
            Initial => self.step_initial(token),
            BeforeHtml => self.step_before_html(token),
            BeforeHead => self.step_before_head(token),
            InHead => self.step_in_head(token),
            AfterHead => self.step_after_head(token),
            InBody => self.step_in_body(token),
            Text => self.step_text(token),
            AfterBody => self.step_after_body(token),
            // Routed above.
            _ => self.step_in_body(token),
        }
    }

    //§ the-initial-insertion-mode
    fn step_initial(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) if is_parser_whitespace(c) => Ok(ProcessResult::Done),
            CommentToken(ref text) => {
                self.append_comment_to_document(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(ref doctype) => {
                self.append_doctype(doctype);
                self.set_mode(mode_after_doctype(Initial));
                Ok(ProcessResult::Done)
            },
            EofToken => Ok(ProcessResult::Done),
            _ => Ok(ProcessResult::Reprocess(anything_else(Initial))),
        }
    }

    //§ the-before-html-insertion-mode
    fn step_before_html(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) if is_parser_whitespace(c) => Ok(ProcessResult::Done),
            CommentToken(ref text) => {
                self.append_comment_to_document(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => {
                let next = mode_after_start_tag(BeforeHtml, tag.name.id());
                self.insert_start_tag(tag, token.pos, next)?;
                Ok(ProcessResult::Done)
            },
            TagToken(_) => {
                self.report(ParseErrorKind::StrayEndTag, token.pos);
                Ok(ProcessResult::Done)
            },
            EofToken => Ok(ProcessResult::Done),
            CharacterToken(_) => Ok(ProcessResult::Reprocess(anything_else(BeforeHtml))),
        }
    }

    //§ the-before-head-insertion-mode
    fn step_before_head(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) if is_parser_whitespace(c) => Ok(ProcessResult::Done),
            CommentToken(ref text) => {
                self.insert_comment(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => match tag.name.id() {
                Some(TagId::Html) => {
                    self.report(ParseErrorKind::StrayStartTag, token.pos);
                    Ok(ProcessResult::Done)
                },
                Some(id @ (TagId::Head | TagId::Body)) => {
                    let next = mode_after_start_tag(BeforeHead, Some(id));
                    self.insert_start_tag(tag, token.pos, next)?;
                    Ok(ProcessResult::Done)
                },
                _ => Ok(ProcessResult::Reprocess(mode_after_start_tag(
                    BeforeHead,
                    None,
                ))),
            },
            TagToken(ref tag) => match mode_after_end_tag(BeforeHead, tag.name.id()) {
                Some(next) => {
                    // </html>: close everything that is open.
                    self.close_stack_to(0, token.pos)?;
                    self.set_mode(next);
                    Ok(ProcessResult::Done)
                },
                None => {
                    self.report(ParseErrorKind::StrayEndTag, token.pos);
                    Ok(ProcessResult::Done)
                },
            },
            EofToken => {
                self.finish_eof(token.pos)?;
                Ok(ProcessResult::Done)
            },
            CharacterToken(_) => Ok(ProcessResult::Reprocess(anything_else(BeforeHead))),
        }
    }

    //§ parsing-main-inhead
    fn step_in_head(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) if is_parser_whitespace(c) => {
                self.insert_text(c);
                Ok(ProcessResult::Done)
            },
            CommentToken(ref text) => {
                self.insert_comment(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => match tag.name.id() {
                Some(TagId::Html | TagId::Head) => {
                    self.report(ParseErrorKind::StrayStartTag, token.pos);
                    Ok(ProcessResult::Done)
                },
                Some(id) if belongs_in_head(id) => {
                    self.insert_start_tag(tag, token.pos, InHead)?;
                    Ok(ProcessResult::Done)
                },
                _ => {
                    // The head closes implicitly.
                    self.close_head(token.pos)?;
                    Ok(ProcessResult::Reprocess(mode_after_start_tag(InHead, None)))
                },
            },
            TagToken(ref tag) => match mode_after_end_tag(InHead, tag.name.id()) {
                Some(next) => {
                    self.process_end_tag(tag, token.pos)?;
                    self.set_mode(next);
                    Ok(ProcessResult::Done)
                },
                None if tag.name.is(TagId::Html) => {
                    self.close_head(token.pos)?;
                    Ok(ProcessResult::Reprocess(anything_else(InHead)))
                },
                None if self.has_open_element(&tag.name) => {
                    // e.g. </template>
                    self.process_end_tag(tag, token.pos)?;
                    Ok(ProcessResult::Done)
                },
                None => {
                    self.report(ParseErrorKind::StrayEndTag, token.pos);
                    Ok(ProcessResult::Done)
                },
            },
            EofToken => {
                self.finish_eof(token.pos)?;
                Ok(ProcessResult::Done)
            },
            CharacterToken(_) => {
                self.close_head(token.pos)?;
                Ok(ProcessResult::Reprocess(anything_else(InHead)))
            },
        }
    }

    //§ the-after-head-insertion-mode
    fn step_after_head(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) if is_parser_whitespace(c) => {
                self.insert_text(c);
                Ok(ProcessResult::Done)
            },
            CommentToken(ref text) => {
                self.insert_comment(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => match tag.name.id() {
                Some(TagId::Html | TagId::Head) => {
                    self.report(ParseErrorKind::StrayStartTag, token.pos);
                    Ok(ProcessResult::Done)
                },
                Some(TagId::Body) => {
                    let next = mode_after_start_tag(AfterHead, Some(TagId::Body));
                    self.insert_start_tag(tag, token.pos, next)?;
                    Ok(ProcessResult::Done)
                },
                _ => Ok(ProcessResult::Reprocess(mode_after_start_tag(
                    AfterHead, None,
                ))),
            },
            TagToken(ref tag) => match mode_after_end_tag(AfterHead, tag.name.id()) {
                Some(next) => {
                    self.close_stack_to(0, token.pos)?;
                    self.set_mode(next);
                    Ok(ProcessResult::Done)
                },
                None => {
                    self.report(ParseErrorKind::StrayEndTag, token.pos);
                    Ok(ProcessResult::Done)
                },
            },
            EofToken => {
                self.finish_eof(token.pos)?;
                Ok(ProcessResult::Done)
            },
            CharacterToken(_) => Ok(ProcessResult::Reprocess(anything_else(AfterHead))),
        }
    }

    //§ parsing-main-inbody
    fn step_in_body(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) => {
                self.insert_text(c);
                Ok(ProcessResult::Done)
            },
            CommentToken(ref text) => {
                self.insert_comment(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => {
                if tag.name.is(TagId::Html) {
                    self.report(ParseErrorKind::StrayStartTag, token.pos);
                    return Ok(ProcessResult::Done);
                }
                if let Some(id) = tag.name.id() {
                    if closes_p(id) {
                        self.close_p_if_open(token.pos)?;
                    }
                }
                if self.current_same_name_omit_end(&tag.name) {
                    self.pop()?;
                }
                self.insert_start_tag(tag, token.pos, InBody)?;
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) => {
                self.process_end_tag(tag, token.pos)?;
                Ok(ProcessResult::Done)
            },
            EofToken => {
                self.finish_eof(token.pos)?;
                Ok(ProcessResult::Done)
            },
        }
    }

    //§ parsing-main-incdata
    fn step_text(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) => {
                self.insert_text(c);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == EndTag => {
                self.pop()?;
                let next = self.take_orig_mode();
                self.set_mode(next);
                Ok(ProcessResult::Done)
            },
            EofToken => {
                // The matching end tag never came.
                self.report(ParseErrorKind::UnexpectedEof, token.pos);
                self.pop()?;
                let next = self.take_orig_mode();
                self.set_mode(next);
                Ok(ProcessResult::Reprocess(next))
            },
            _ => {
                let next = self.take_orig_mode();
                Ok(ProcessResult::Reprocess(next))
            },
        }
    }

    //§ parsing-main-afterbody
    fn step_after_body(&mut self, token: &Token) -> Result<ProcessResult, Error> {
        match token.data {
            CharacterToken(c) => {
                self.insert_text(c);
                Ok(ProcessResult::Done)
            },
            CommentToken(ref text) => {
                self.append_comment_to_document(text.clone());
                Ok(ProcessResult::Done)
            },
            DoctypeToken(_) => {
                self.report(ParseErrorKind::StrayDoctype, token.pos);
                Ok(ProcessResult::Done)
            },
            TagToken(ref tag) if tag.kind == StartTag => {
                Ok(ProcessResult::Reprocess(mode_after_start_tag(
                    AfterBody,
                    tag.name.id(),
                )))
            },
            TagToken(_) => {
                self.report(ParseErrorKind::StrayEndTag, token.pos);
                Ok(ProcessResult::Done)
            },
            EofToken => Ok(ProcessResult::Done),
        }
    }
}
