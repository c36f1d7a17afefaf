// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The element catalog.
//!
//! A process-wide, read-only table of per-element metadata: the
//! canonical lowercase name, an enum discriminant for known tags, and
//! the content-model flags the tokenizer and tree constructor consult.
//! Names not in the table pass through as opaque strings and behave as
//! ordinary container elements.

use std::fmt;

use phf::phf_map;

use crate::tendril::StrTendril;

/// Content-model flags, stored as a bitset.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug, Default)]
pub struct ElemFlags(u8);

impl ElemFlags {
    pub const NONE: ElemFlags = ElemFlags(0);
    /// No children, no end tag.
    pub const VOID: ElemFlags = ElemFlags(1);
    /// Contents tokenized as literal text until the matching end tag.
    pub const RAW_TEXT: ElemFlags = ElemFlags(1 << 1);
    /// Like raw text, but character references still apply.
    pub const ESCAPABLE_RAW_TEXT: ElemFlags = ElemFlags(1 << 2);
    pub const TEMPLATE: ElemFlags = ElemFlags(1 << 3);
    /// Root of an embedded foreign (SVG/MathML) subtree.
    pub const FOREIGN: ElemFlags = ElemFlags(1 << 4);
    /// The end tag may be omitted; the element closes implicitly.
    pub const OMIT_END: ElemFlags = ElemFlags(1 << 5);

    pub const fn union(self, other: ElemFlags) -> ElemFlags {
        ElemFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: ElemFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

macro_rules! tag_ids {
    ($( $id:ident => $name:expr, )+) => {
        /// Discriminants for the known HTML tags.
        #[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
        pub enum TagId {
            $( $id, )+
        }

        impl TagId {
            /// The canonical lowercase tag name.
            pub fn name(self) -> &'static str {
                match self {
                    $( TagId::$id => $name, )+
                }
            }
        }
    };
}

tag_ids! {
    A => "a", Abbr => "abbr", Address => "address", Area => "area",
    Article => "article", Aside => "aside", Audio => "audio", B => "b",
    Base => "base", Bdi => "bdi", Bdo => "bdo", Blockquote => "blockquote",
    Body => "body", Br => "br", Button => "button", Canvas => "canvas",
    Caption => "caption", Cite => "cite", Code => "code", Col => "col",
    Colgroup => "colgroup", Data => "data", Datalist => "datalist",
    Dd => "dd", Del => "del", Details => "details", Dfn => "dfn",
    Dialog => "dialog", Div => "div", Dl => "dl", Dt => "dt", Em => "em",
    Embed => "embed", Fieldset => "fieldset", Figcaption => "figcaption",
    Figure => "figure", Footer => "footer", Form => "form", H1 => "h1",
    H2 => "h2", H3 => "h3", H4 => "h4", H5 => "h5", H6 => "h6",
    Head => "head", Header => "header", Hgroup => "hgroup", Hr => "hr",
    Html => "html", I => "i", Iframe => "iframe", Img => "img",
    Input => "input", Ins => "ins", Kbd => "kbd", Label => "label",
    Legend => "legend", Li => "li", Link => "link", Main => "main",
    Map => "map", Mark => "mark", Math => "math", Menu => "menu",
    Meta => "meta", Meter => "meter", Nav => "nav", Noembed => "noembed",
    Noframes => "noframes", Noscript => "noscript", Object => "object",
    Ol => "ol", Optgroup => "optgroup", Option => "option",
    Output => "output", P => "p", Picture => "picture",
    Plaintext => "plaintext", Pre => "pre", Progress => "progress",
    Q => "q", Rp => "rp", Rt => "rt", Ruby => "ruby", S => "s",
    Samp => "samp", Script => "script", Section => "section",
    Select => "select", Small => "small", Source => "source",
    Span => "span", Strong => "strong", Style => "style", Sub => "sub",
    Summary => "summary", Sup => "sup", Svg => "svg", Table => "table",
    Tbody => "tbody", Td => "td", Template => "template",
    Textarea => "textarea", Tfoot => "tfoot", Th => "th",
    Thead => "thead", Time => "time", Title => "title", Tr => "tr",
    Track => "track", U => "u", Ul => "ul", Var => "var",
    Video => "video", Wbr => "wbr", Xmp => "xmp",
}

/// One catalog entry.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct TagData {
    pub id: TagId,
    pub flags: ElemFlags,
}

const fn entry(id: TagId, flags: ElemFlags) -> TagData {
    TagData { id, flags }
}

const N: ElemFlags = ElemFlags::NONE;
const V: ElemFlags = ElemFlags::VOID;
const R: ElemFlags = ElemFlags::RAW_TEXT;
const E: ElemFlags = ElemFlags::ESCAPABLE_RAW_TEXT;
const O: ElemFlags = ElemFlags::OMIT_END;
const F: ElemFlags = ElemFlags::FOREIGN;

static TAGS: phf::Map<&'static str, TagData> = phf_map! {
    "a" => entry(TagId::A, N),
    "abbr" => entry(TagId::Abbr, N),
    "address" => entry(TagId::Address, N),
    "area" => entry(TagId::Area, V),
    "article" => entry(TagId::Article, N),
    "aside" => entry(TagId::Aside, N),
    "audio" => entry(TagId::Audio, N),
    "b" => entry(TagId::B, N),
    "base" => entry(TagId::Base, V),
    "bdi" => entry(TagId::Bdi, N),
    "bdo" => entry(TagId::Bdo, N),
    "blockquote" => entry(TagId::Blockquote, N),
    "body" => entry(TagId::Body, O),
    "br" => entry(TagId::Br, V),
    "button" => entry(TagId::Button, N),
    "canvas" => entry(TagId::Canvas, N),
    "caption" => entry(TagId::Caption, O),
    "cite" => entry(TagId::Cite, N),
    "code" => entry(TagId::Code, N),
    "col" => entry(TagId::Col, V),
    "colgroup" => entry(TagId::Colgroup, O),
    "data" => entry(TagId::Data, N),
    "datalist" => entry(TagId::Datalist, N),
    "dd" => entry(TagId::Dd, O),
    "del" => entry(TagId::Del, N),
    "details" => entry(TagId::Details, N),
    "dfn" => entry(TagId::Dfn, N),
    "dialog" => entry(TagId::Dialog, N),
    "div" => entry(TagId::Div, N),
    "dl" => entry(TagId::Dl, N),
    "dt" => entry(TagId::Dt, O),
    "em" => entry(TagId::Em, N),
    "embed" => entry(TagId::Embed, V),
    "fieldset" => entry(TagId::Fieldset, N),
    "figcaption" => entry(TagId::Figcaption, N),
    "figure" => entry(TagId::Figure, N),
    "footer" => entry(TagId::Footer, N),
    "form" => entry(TagId::Form, N),
    "h1" => entry(TagId::H1, N),
    "h2" => entry(TagId::H2, N),
    "h3" => entry(TagId::H3, N),
    "h4" => entry(TagId::H4, N),
    "h5" => entry(TagId::H5, N),
    "h6" => entry(TagId::H6, N),
    "head" => entry(TagId::Head, O),
    "header" => entry(TagId::Header, N),
    "hgroup" => entry(TagId::Hgroup, N),
    "hr" => entry(TagId::Hr, V),
    "html" => entry(TagId::Html, O),
    "i" => entry(TagId::I, N),
    "iframe" => entry(TagId::Iframe, R),
    "img" => entry(TagId::Img, V),
    "input" => entry(TagId::Input, V),
    "ins" => entry(TagId::Ins, N),
    "kbd" => entry(TagId::Kbd, N),
    "label" => entry(TagId::Label, N),
    "legend" => entry(TagId::Legend, N),
    "li" => entry(TagId::Li, O),
    "link" => entry(TagId::Link, V),
    "main" => entry(TagId::Main, N),
    "map" => entry(TagId::Map, N),
    "mark" => entry(TagId::Mark, N),
    "math" => entry(TagId::Math, F),
    "menu" => entry(TagId::Menu, N),
    "meta" => entry(TagId::Meta, V),
    "meter" => entry(TagId::Meter, N),
    "nav" => entry(TagId::Nav, N),
    "noembed" => entry(TagId::Noembed, R),
    "noframes" => entry(TagId::Noframes, R),
    "noscript" => entry(TagId::Noscript, R),
    "object" => entry(TagId::Object, N),
    "ol" => entry(TagId::Ol, N),
    "optgroup" => entry(TagId::Optgroup, O),
    "option" => entry(TagId::Option, O),
    "output" => entry(TagId::Output, N),
    "p" => entry(TagId::P, O),
    "picture" => entry(TagId::Picture, N),
    "plaintext" => entry(TagId::Plaintext, N),
    "pre" => entry(TagId::Pre, N),
    "progress" => entry(TagId::Progress, N),
    "q" => entry(TagId::Q, N),
    "rp" => entry(TagId::Rp, O),
    "rt" => entry(TagId::Rt, O),
    "ruby" => entry(TagId::Ruby, N),
    "s" => entry(TagId::S, N),
    "samp" => entry(TagId::Samp, N),
    "script" => entry(TagId::Script, N),
    "section" => entry(TagId::Section, N),
    "select" => entry(TagId::Select, N),
    "small" => entry(TagId::Small, N),
    "source" => entry(TagId::Source, V),
    "span" => entry(TagId::Span, N),
    "strong" => entry(TagId::Strong, N),
    "style" => entry(TagId::Style, R),
    "sub" => entry(TagId::Sub, N),
    "summary" => entry(TagId::Summary, N),
    "sup" => entry(TagId::Sup, N),
    "svg" => entry(TagId::Svg, F),
    "table" => entry(TagId::Table, N),
    "tbody" => entry(TagId::Tbody, O),
    "td" => entry(TagId::Td, O),
    "template" => entry(TagId::Template, ElemFlags::TEMPLATE),
    "textarea" => entry(TagId::Textarea, E),
    "tfoot" => entry(TagId::Tfoot, O),
    "th" => entry(TagId::Th, O),
    "thead" => entry(TagId::Thead, O),
    "time" => entry(TagId::Time, N),
    "title" => entry(TagId::Title, E),
    "tr" => entry(TagId::Tr, O),
    "track" => entry(TagId::Track, V),
    "u" => entry(TagId::U, N),
    "ul" => entry(TagId::Ul, N),
    "var" => entry(TagId::Var, N),
    "video" => entry(TagId::Video, N),
    "wbr" => entry(TagId::Wbr, V),
    "xmp" => entry(TagId::Xmp, R),
};

/// Look a lowercase tag name up in the catalog.
pub fn lookup(name: &str) -> Option<TagData> {
    TAGS.get(name).copied()
}

/// Is `name` one of the void elements?
pub fn is_void(name: &str) -> bool {
    lookup(name).is_some_and(|data| data.flags.contains(ElemFlags::VOID))
}

impl TagId {
    pub fn flags(self) -> ElemFlags {
        match TAGS.get(self.name()) {
            Some(data) => data.flags,
            None => ElemFlags::NONE,
        }
    }
}

/// A tag name: a catalog discriminant for known tags, an opaque
/// lowercase string otherwise.
#[derive(PartialEq, Eq, Clone, Hash, Debug)]
pub enum TagName {
    Known(TagId),
    Unknown(StrTendril),
}

impl TagName {
    pub fn from_str(name: &str) -> TagName {
        match lookup(name) {
            Some(data) => TagName::Known(data.id),
            None => TagName::Unknown(StrTendril::from_slice(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TagName::Known(id) => id.name(),
            TagName::Unknown(name) => name,
        }
    }

    pub fn id(&self) -> Option<TagId> {
        match self {
            TagName::Known(id) => Some(*id),
            TagName::Unknown(_) => None,
        }
    }

    pub fn flags(&self) -> ElemFlags {
        match self {
            TagName::Known(id) => id.flags(),
            TagName::Unknown(_) => ElemFlags::NONE,
        }
    }

    pub fn is(&self, id: TagId) -> bool {
        self.id() == Some(id)
    }
}

impl From<TagId> for TagName {
    fn from(id: TagId) -> TagName {
        TagName::Known(id)
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tokenization mode the tree constructor re-injects after certain
/// start tags.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TokenizerMode {
    Data,
    Rcdata,
    Rawtext,
    ScriptData,
    Plaintext,
}

pub fn tokenizer_mode_after_start(name: &TagName) -> TokenizerMode {
    match name.id() {
        Some(TagId::Script) => TokenizerMode::ScriptData,
        Some(TagId::Plaintext) => TokenizerMode::Plaintext,
        _ => {
            let flags = name.flags();
            if flags.contains(ElemFlags::RAW_TEXT) {
                TokenizerMode::Rawtext
            } else if flags.contains(ElemFlags::ESCAPABLE_RAW_TEXT) {
                TokenizerMode::Rcdata
            } else {
                TokenizerMode::Data
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_id_bijection() {
        for (name, data) in TAGS.entries() {
            assert_eq!(data.id.name(), *name);
            assert_eq!(lookup(data.id.name()).map(|d| d.id), Some(data.id));
        }
    }

    #[test]
    fn void_set_is_fixed() {
        let void = [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
            "track", "wbr",
        ];
        for name in void {
            assert!(is_void(name), "{name} should be void");
        }
        let not_void = TAGS
            .entries()
            .filter(|(name, _)| !void.contains(name))
            .count();
        assert_eq!(not_void + void.len(), TAGS.len());
        assert!(!is_void("div"));
        assert!(!is_void("blink"));
    }

    #[test]
    fn tokenizer_modes() {
        let mode = |name: &str| tokenizer_mode_after_start(&TagName::from_str(name));
        for name in ["style", "xmp", "iframe", "noembed", "noframes", "noscript"] {
            assert_eq!(mode(name), TokenizerMode::Rawtext, "{name}");
        }
        for name in ["textarea", "title"] {
            assert_eq!(mode(name), TokenizerMode::Rcdata, "{name}");
        }
        assert_eq!(mode("script"), TokenizerMode::ScriptData);
        assert_eq!(mode("plaintext"), TokenizerMode::Plaintext);
        assert_eq!(mode("div"), TokenizerMode::Data);
        assert_eq!(mode("blink"), TokenizerMode::Data);
    }

    #[test]
    fn unknown_names_pass_through() {
        let name = TagName::from_str("blink");
        assert_eq!(name.id(), None);
        assert_eq!(name.as_str(), "blink");
        assert_eq!(name.flags(), ElemFlags::NONE);
        assert_eq!(name, TagName::from_str("blink"));
        assert_ne!(name, TagName::from_str("marquee"));
    }

    #[test]
    fn omitted_end_tags() {
        for name in ["p", "li", "dt", "dd", "option", "tr", "td", "th", "html", "body"] {
            assert!(TagName::from_str(name).flags().contains(ElemFlags::OMIT_END));
        }
        assert!(!TagName::from_str("div").flags().contains(ElemFlags::OMIT_END));
    }
}
