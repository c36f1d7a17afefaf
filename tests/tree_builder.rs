// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::rc::Rc;

use htmldom::{
    parse, parse_str, CollectSink, Document, ErrorSink, Handle, NodeData, ParseErrorKind, Parser,
    Position, TraversalOrder,
};

fn parse_collect(input: &str) -> (Document, Rc<CollectSink>) {
    let sink = Rc::new(CollectSink::new());
    let errors = sink.clone() as Rc<dyn ErrorSink>;
    let doc = parse_str(input, Some(errors)).unwrap();
    (doc, sink)
}

fn tag_name(handle: &Handle) -> String {
    handle.as_element().expect("not an element").name().to_string()
}

fn child_tags(handle: &Handle) -> Vec<String> {
    handle
        .traverse(TraversalOrder::ChildrenOnly)
        .filter(|c| c.as_element().is_some())
        .map(|c| tag_name(&c))
        .collect()
}

fn text_content(handle: &Handle) -> String {
    handle
        .traverse(TraversalOrder::Preorder)
        .filter_map(|node| node.text().map(|t| t.to_string()))
        .collect()
}

fn error_kinds(sink: &CollectSink) -> Vec<ParseErrorKind> {
    sink.errors.borrow().iter().map(|&(k, _)| k).collect()
}

#[test]
fn empty_html_element() {
    let (doc, sink) = parse_collect("<html></html>");
    let root = doc.root().unwrap();
    assert_eq!(tag_name(&root), "html");
    assert_eq!(root.children().len(), 0);
    assert!(sink.is_empty());
}

#[test]
fn lone_void_element_is_the_root() {
    let (doc, sink) = parse_collect("<br>");
    let root = doc.root().unwrap();
    assert_eq!(tag_name(&root), "br");
    assert!(root.as_element().unwrap().is_void());
    assert_eq!(root.children().len(), 0);
    assert!(sink.is_empty());
}

#[test]
fn attribute_and_text_child() {
    let (doc, sink) = parse_collect("<html dir=\"ltr\">v</html>");
    let root = doc.root().unwrap();
    assert_eq!(tag_name(&root), "html");
    assert_eq!(
        root.as_element().unwrap().attribute("dir").as_deref(),
        Some("ltr")
    );
    assert_eq!(root.children().len(), 1);
    assert_eq!(text_content(&root), "v");
    assert!(sink.is_empty());
}

#[test]
fn top_level_comment() {
    let (doc, sink) = parse_collect("<!-- hi -->");
    assert!(doc.root().is_none());
    let children = doc.handle().children();
    assert_eq!(children.len(), 1);
    match children[0].data {
        NodeData::Comment(ref text) => assert_eq!(&**text, " hi "),
        _ => panic!("expected comment"),
    }
    assert!(sink.is_empty());
}

#[test]
fn sibling_paragraphs_with_omitted_end_tags() {
    let (doc, sink) = parse_collect("<p>a<p>b");
    let children: Vec<Handle> = doc.handle().traverse(TraversalOrder::ChildrenOnly).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(tag_name(&children[0]), "p");
    assert_eq!(tag_name(&children[1]), "p");
    assert_eq!(text_content(&children[0]), "a");
    assert_eq!(text_content(&children[1]), "b");
    assert!(sink.is_empty(), "got {:?}", error_kinds(&sink));
}

#[test]
fn script_contents_are_raw_text() {
    let (doc, sink) = parse_collect("<script>a<b>c</script>d");
    let children: Vec<Handle> = doc.handle().traverse(TraversalOrder::ChildrenOnly).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(tag_name(&children[0]), "script");
    assert_eq!(text_content(&children[0]), "a<b>c");
    match children[1].data {
        NodeData::Text(ref text) => assert_eq!(&**text.borrow(), "d"),
        _ => panic!("expected text sibling of script"),
    }
    assert!(sink.is_empty());
}

#[test]
fn empty_input() {
    let (doc, sink) = parse_collect("");
    assert!(doc.root().is_none());
    assert_eq!(doc.handle().children().len(), 0);
    assert!(sink.is_empty());
}

#[test]
fn whitespace_only_input_is_discarded() {
    let (doc, sink) = parse_collect("  \n\t  ");
    assert!(doc.root().is_none());
    assert_eq!(doc.handle().children().len(), 0);
    assert!(sink.is_empty());
}

#[test]
fn unterminated_tag_at_eof() {
    let (doc, sink) = parse_collect("<div class=\"x");
    assert!(doc.root().is_none());
    assert!(error_kinds(&sink).contains(&ParseErrorKind::EofInTag));
}

#[test]
fn mismatched_end_tag_at_top_level_is_ignored() {
    let (doc, sink) = parse_collect("</p>");
    assert!(doc.root().is_none());
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::StrayEndTag]);
}

#[test]
fn full_document_skeleton() {
    let (doc, sink) = parse_collect(
        "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>",
    );
    let doctype = doc.doctype().unwrap();
    match doctype.data {
        NodeData::Doctype { ref name, .. } => assert_eq!(&**name, "html"),
        _ => unreachable!(),
    }
    let root = doc.root().unwrap();
    assert_eq!(child_tags(&root), vec!["head", "body"]);
    let head = doc.find_first("head", None).unwrap();
    assert_eq!(child_tags(&head), vec!["title"]);
    let title = doc.find_first("title", None).unwrap();
    assert_eq!(text_content(&title), "T");
    let body = doc.find_first("body", None).unwrap();
    assert_eq!(child_tags(&body), vec!["p"]);
    assert!(sink.is_empty(), "got {:?}", error_kinds(&sink));
}

#[test]
fn implicit_close_reports_each_unclosed_element() {
    let (doc, sink) = parse_collect("<div><span>a</div>");
    let div = doc.find_first("div", None).unwrap();
    assert_eq!(child_tags(&div), vec!["span"]);
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::MisnestedEndTag]);
}

#[test]
fn misnested_end_tag_error_has_token_position() {
    let (_, sink) = parse_collect("<div><em>x</div>");
    let errors = sink.errors.borrow();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0],
        (ParseErrorKind::MisnestedEndTag, Position::new(1, 11))
    );
}

#[test]
fn stray_end_tag_in_body_is_ignored() {
    let (doc, sink) = parse_collect("<div></span>x</div>");
    let div = doc.find_first("div", None).unwrap();
    assert_eq!(text_content(&div), "x");
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::StrayEndTag]);
}

#[test]
fn self_closing_non_void_is_a_normal_start_tag() {
    let (doc, sink) = parse_collect("<div/>x");
    let div = doc.find_first("div", None).unwrap();
    assert_eq!(text_content(&div), "x");
    // The div stays open, so the end of input also reports it.
    assert_eq!(
        error_kinds(&sink),
        vec![
            ParseErrorKind::NonVoidHtmlElementStartTagWithTrailingSolidus,
            ParseErrorKind::UnexpectedEof,
        ]
    );
}

#[test]
fn end_tag_for_void_element_is_stray() {
    let (doc, sink) = parse_collect("<br></br>");
    assert_eq!(doc.root().unwrap().children().len(), 0);
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::StrayEndTag]);
}

#[test]
fn list_items_close_implicitly() {
    let (doc, sink) = parse_collect("<ul><li>a<li>b</ul>");
    let ul = doc.find_first("ul", None).unwrap();
    assert_eq!(child_tags(&ul), vec!["li", "li"]);
    let items: Vec<Handle> = ul.traverse(TraversalOrder::ChildrenOnly).collect();
    assert_eq!(text_content(&items[0]), "a");
    assert_eq!(text_content(&items[1]), "b");
    assert!(sink.is_empty());
}

#[test]
fn paragraph_closed_by_block_element() {
    let (doc, sink) = parse_collect("<div><p>a<ul><li>b</ul></div>");
    let div = doc.find_first("div", None).unwrap();
    assert_eq!(child_tags(&div), vec!["p", "ul"]);
    assert!(sink.is_empty());
}

#[test]
fn head_closes_implicitly_before_body_content() {
    let (doc, sink) = parse_collect("<html><head><meta></head><p>x</p></html>");
    let root = doc.root().unwrap();
    assert_eq!(child_tags(&root), vec!["head", "p"]);
    assert!(sink.is_empty());

    // And without the explicit </head>.
    let (doc, _) = parse_collect("<html><head><p>x");
    let root = doc.root().unwrap();
    assert_eq!(child_tags(&root), vec!["head", "p"]);
}

#[test]
fn style_in_head_is_raw_text() {
    let (doc, sink) = parse_collect("<html><head><style>a < b</style></head></html>");
    let style = doc.find_first("style", None).unwrap();
    assert_eq!(text_content(&style), "a < b");
    assert!(sink.is_empty());
}

#[test]
fn textarea_is_escapable_raw_text() {
    let (doc, sink) = parse_collect("<textarea>&amp;<x</textarea>");
    let textarea = doc.find_first("textarea", None).unwrap();
    assert_eq!(text_content(&textarea), "&<x");
    assert!(sink.is_empty());
}

#[test]
fn plaintext_runs_to_eof() {
    let (doc, sink) = parse_collect("<plaintext></anything>rest");
    let plaintext = doc.find_first("plaintext", None).unwrap();
    assert_eq!(text_content(&plaintext), "</anything>rest");
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::UnexpectedEof]);
}

#[test]
fn comment_inside_body() {
    let (doc, sink) = parse_collect("<div><!--c--></div>");
    let div = doc.find_first("div", None).unwrap();
    let children = div.children();
    assert_eq!(children.len(), 1);
    match children[0].data {
        NodeData::Comment(ref text) => assert_eq!(&**text, "c"),
        _ => panic!("expected comment"),
    }
    assert!(sink.is_empty());
}

#[test]
fn comment_after_root_is_document_child() {
    let (doc, sink) = parse_collect("<html></html><!--t-->");
    let children = doc.handle().children();
    assert_eq!(children.len(), 2);
    assert!(matches!(children[1].data, NodeData::Comment(_)));
    assert!(sink.is_empty());
}

#[test]
fn doctype_identifiers_are_stored() {
    let (doc, sink) = parse_collect(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \
         \"http://www.w3.org/TR/html4/strict.dtd\"><html></html>",
    );
    let doctype = doc.doctype().unwrap();
    match doctype.data {
        NodeData::Doctype {
            ref name,
            ref public_id,
            ref system_id,
            force_quirks,
        } => {
            assert_eq!(&**name, "html");
            assert_eq!(public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
            assert_eq!(
                system_id.as_deref(),
                Some("http://www.w3.org/TR/html4/strict.dtd")
            );
            assert!(!force_quirks);
        },
        _ => unreachable!(),
    }
    assert!(sink.is_empty());
}

#[test]
fn doctype_force_quirks_is_stored() {
    let (doc, sink) = parse_collect("<!DOCTYPE><html></html>");
    let doctype = doc.doctype().unwrap();
    match doctype.data {
        NodeData::Doctype { force_quirks, .. } => assert!(force_quirks),
        _ => unreachable!(),
    }
    assert!(error_kinds(&sink).contains(&ParseErrorKind::MissingDoctypeName));

    let (doc, sink) = parse_collect("<!DOCTYPE html><html></html>");
    let doctype = doc.doctype().unwrap();
    match doctype.data {
        NodeData::Doctype { force_quirks, .. } => assert!(!force_quirks),
        _ => unreachable!(),
    }
    assert!(sink.is_empty());
}

#[test]
fn doctype_after_content_is_stray() {
    let (doc, sink) = parse_collect("<div></div><!DOCTYPE html>");
    assert!(doc.doctype().is_none());
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::StrayDoctype]);
}

#[test]
fn duplicate_attribute_reaches_dom_once() {
    let (doc, sink) = parse_collect("<a id=\"1\" id=\"2\">x</a>");
    let a = doc.find_first("a", None).unwrap();
    let element = a.as_element().unwrap();
    assert_eq!(element.attribute("id").as_deref(), Some("1"));
    assert_eq!(element.attributes().len(), 1);
    assert_eq!(error_kinds(&sink), vec![ParseErrorKind::DuplicateAttribute]);
}

#[test]
fn utf16_input_with_bom() {
    let mut bytes = vec![0xff, 0xfe];
    for unit in "<html>hi</html>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let doc = parse(&bytes[..], None).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(tag_name(&root), "html");
    assert_eq!(text_content(&root), "hi");
}

#[test]
fn chunked_feeding_matches_one_shot() {
    let input = "<!DOCTYPE html><html><head><title>T</title></head>\
                 <body><p id=\"a\">x &amp; y</p><br></body></html>";
    let mut parser = Parser::new();
    for chunk in input.as_bytes().chunks(3) {
        parser.feed(chunk).unwrap();
    }
    let chunked = parser.finish().unwrap();
    let whole = parse_str(input, None).unwrap();
    assert_eq!(
        htmldom::serialize_to_string(&chunked),
        htmldom::serialize_to_string(&whole)
    );
}

#[test]
fn every_catalog_name_in_dom_is_lowercase() {
    let (doc, _) = parse_collect("<HTML><BODY><DIV ID=\"x\">t</DIV></BODY></HTML>");
    for node in doc.handle().traverse(TraversalOrder::Preorder) {
        if let Some(element) = node.as_element() {
            let name = element.name().to_string();
            assert_eq!(name, name.to_ascii_lowercase());
        }
    }
}

#[test]
fn preorder_visits_every_node_once() {
    let (doc, _) = parse_collect("<html><head></head><body><p>a</p><p>b</p></body></html>");
    let visited: Vec<Handle> = doc.handle().traverse(TraversalOrder::Preorder).collect();
    for (i, a) in visited.iter().enumerate() {
        for b in &visited[i + 1..] {
            assert!(!a.ptr_eq(b), "node visited twice");
        }
    }
    // document + html + head + body + two p's with a text child each
    assert_eq!(visited.len(), 8);
}

#[test]
fn character_stream_survives_with_replacements() {
    let (doc, _) = parse_collect("<p>a\u{0}b\r\nc</p>");
    let p = doc.find_first("p", None).unwrap();
    assert_eq!(text_content(&p), "a\u{fffd}b\nc");
}
