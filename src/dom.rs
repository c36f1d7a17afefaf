// Copyright 2024 The htmldom Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A simple reference-counted DOM.
//!
//! Children are owned by their parent, in insertion order; parent links
//! are weak.  Node identity is address identity: two elements with the
//! same tag and attributes are still distinct nodes.  Dropping the
//! [`Document`] drops the whole tree.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::catalog::{ElemFlags, TagName};
use crate::tendril::StrTendril;
use crate::tokenizer::Attribute;

/// An insertion-ordered attribute map with constant-time lookup by
/// name.  First occurrence wins on duplicate names.
#[derive(Default, Debug)]
pub struct Attributes {
    items: Vec<Attribute>,
    index: FxHashMap<String, usize>,
}

impl Attributes {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    pub fn get(&self, name: &str) -> Option<&StrTendril> {
        self.index.get(name).map(|&i| &self.items[i].value)
    }

    /// Insert or update, returning whether the name was new.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.items[i].value = StrTendril::from_slice(value);
                false
            },
            None => {
                self.index.insert(name.to_string(), self.items.len());
                self.items.push(Attribute {
                    name: StrTendril::from_slice(name),
                    value: StrTendril::from_slice(value),
                });
                true
            },
        }
    }

    /// Insert only if the name is not present yet.  Returns whether the
    /// attribute was taken.
    pub(crate) fn insert_unique(&mut self, attr: Attribute) -> bool {
        if self.index.contains_key(&*attr.name) {
            return false;
        }
        self.index.insert(attr.name.to_string(), self.items.len());
        self.items.push(attr);
        true
    }
}

/// An element: tag name, content-model flags, attributes.
pub struct Element {
    name: TagName,
    flags: ElemFlags,
    attrs: RefCell<Attributes>,
}

impl Element {
    fn new(name: TagName, attrs: Attributes) -> Element {
        let flags = name.flags();
        Element {
            name,
            flags,
            attrs: RefCell::new(attrs),
        }
    }

    pub fn name(&self) -> &TagName {
        &self.name
    }

    pub fn flags(&self) -> ElemFlags {
        self.flags
    }

    pub fn is_void(&self) -> bool {
        self.flags.contains(ElemFlags::VOID)
    }

    /// The attribute value for `name`, if set.
    pub fn attribute(&self, name: &str) -> Option<StrTendril> {
        self.attrs.borrow().get(name).cloned()
    }

    /// Set an attribute, returning whether the name was new.
    pub fn set_attribute(&self, name: &str, value: &str) -> bool {
        self.attrs.borrow_mut().set(name, value)
    }

    pub fn attributes(&self) -> Ref<'_, Attributes> {
        self.attrs.borrow()
    }
}

/// The different kinds of nodes in the DOM.
pub enum NodeData {
    /// The `Document` itself.
    Document,

    /// A `DOCTYPE` with name, optional public and system ids, and the
    /// force-quirks flag the tokenizer computed for it.
    Doctype {
        name: StrTendril,
        public_id: Option<StrTendril>,
        system_id: Option<StrTendril>,
        force_quirks: bool,
    },

    /// A text node.
    Text(RefCell<StrTendril>),

    /// A comment.
    Comment(StrTendril),

    /// An element.
    Element(Element),
}

/// A DOM node.
pub struct Node {
    /// This node's data.
    pub data: NodeData,
    /// Parent node; weak, the parent owns us.
    parent: Cell<Option<WeakHandle>>,
    /// Children, in insertion order.
    children: RefCell<Vec<Handle>>,
}

impl Node {
    fn new(data: NodeData) -> Node {
        Node {
            data,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
        }
    }
}

/// Reference to a DOM node.
#[derive(Clone)]
pub struct Handle(Rc<Node>);

impl Deref for Handle {
    type Target = Node;
    fn deref(&self) -> &Node {
        &self.0
    }
}

/// Weak reference to a DOM node, used for parent pointers.
pub type WeakHandle = Weak<Node>;

fn new_node(data: NodeData) -> Handle {
    Handle(Rc::new(Node::new(data)))
}

pub(crate) fn new_element(name: TagName) -> Handle {
    new_node(NodeData::Element(Element::new(name, Attributes::default())))
}

/// Build an element from a start tag's attribute list.  The list is
/// already duplicate-free, but first-wins either way.
pub(crate) fn new_element_with_attrs(name: TagName, attrs: Vec<Attribute>) -> Handle {
    let mut map = Attributes::default();
    for attr in attrs {
        map.insert_unique(attr);
    }
    new_node(NodeData::Element(Element::new(name, map)))
}

pub(crate) fn new_text(text: &str) -> Handle {
    new_node(NodeData::Text(RefCell::new(StrTendril::from_slice(text))))
}

pub(crate) fn new_comment(text: StrTendril) -> Handle {
    new_node(NodeData::Comment(text))
}

pub(crate) fn new_doctype(
    name: StrTendril,
    public_id: Option<StrTendril>,
    system_id: Option<StrTendril>,
    force_quirks: bool,
) -> Handle {
    new_node(NodeData::Doctype {
        name,
        public_id,
        system_id,
        force_quirks,
    })
}

fn append_to_existing_text(prev: &Handle, text: &str) -> bool {
    match prev.data {
        NodeData::Text(ref existing) => {
            existing.borrow_mut().push_slice(text);
            true
        },
        _ => false,
    }
}

impl Handle {
    /// Address identity; the only equality the DOM has.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakHandle {
        Rc::downgrade(&self.0)
    }

    pub fn parent(&self) -> Option<Handle> {
        let weak = self.parent.take()?;
        let parent = weak.upgrade();
        self.parent.set(Some(weak));
        parent.map(Handle)
    }

    pub fn children(&self) -> Ref<'_, Vec<Handle>> {
        self.children.borrow()
    }

    /// Append `child`, which must not already have a parent.
    pub fn append_child(&self, child: Handle) {
        let previous_parent = child.parent.replace(Some(self.downgrade()));
        assert!(previous_parent.is_none(), "node appended twice");
        self.children.borrow_mut().push(child);
    }

    /// Append text, merging into a trailing text node if there is one.
    pub(crate) fn append_text(&self, text: &str) {
        {
            let children = self.children.borrow();
            if let Some(last) = children.last() {
                if append_to_existing_text(last, text) {
                    return;
                }
            }
        }
        self.append_child(new_text(text));
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self.data {
            NodeData::Element(ref element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.as_element()
            .is_some_and(|element| element.name().as_str() == name)
    }

    /// The contents of a text node.
    pub fn text(&self) -> Option<StrTendril> {
        match self.data {
            NodeData::Text(ref text) => Some(text.borrow().clone()),
            _ => None,
        }
    }

    /// Iterate over this subtree in the given order.  `ChildrenOnly`
    /// yields the direct children; `Preorder` yields the node itself
    /// first, depth first; `Postorder` is the exact reverse of
    /// `Preorder`.
    pub fn traverse(&self, order: TraversalOrder) -> Traverse {
        match order {
            TraversalOrder::Preorder => Traverse {
                inner: TraverseInner::Preorder {
                    root: Some(self.clone()),
                    stack: Vec::new(),
                },
            },
            TraversalOrder::Postorder => {
                let mut items: Vec<Handle> = self.traverse(TraversalOrder::Preorder).collect();
                items.reverse();
                Traverse {
                    inner: TraverseInner::Fixed(items.into_iter()),
                }
            },
            TraversalOrder::ChildrenOnly => {
                let items: Vec<Handle> = self.children.borrow().clone();
                Traverse {
                    inner: TraverseInner::Fixed(items.into_iter()),
                }
            },
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data {
            NodeData::Document => write!(f, "Document"),
            NodeData::Doctype { ref name, .. } => write!(f, "Doctype({name})"),
            NodeData::Text(ref text) => write!(f, "Text({:?})", &**text.borrow()),
            NodeData::Comment(ref text) => write!(f, "Comment({:?})", &**text),
            NodeData::Element(ref element) => write!(f, "Element({})", element.name()),
        }
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TraversalOrder {
    Preorder,
    Postorder,
    ChildrenOnly,
}

/// Tree iterator; see [`Handle::traverse`].
pub struct Traverse {
    inner: TraverseInner,
}

enum TraverseInner {
    Preorder {
        root: Option<Handle>,
        stack: Vec<(Handle, usize)>,
    },
    Fixed(std::vec::IntoIter<Handle>),
}

impl Iterator for Traverse {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        match self.inner {
            TraverseInner::Preorder {
                ref mut root,
                ref mut stack,
            } => {
                if let Some(r) = root.take() {
                    stack.push((r.clone(), 0));
                    return Some(r);
                }
                loop {
                    let next_child = {
                        let (node, idx) = stack.last_mut()?;
                        let children = node.children.borrow();
                        match children.get(*idx) {
                            Some(child) => {
                                let child = child.clone();
                                *idx += 1;
                                Some(child)
                            },
                            None => None,
                        }
                    };
                    match next_child {
                        Some(child) => {
                            stack.push((child.clone(), 0));
                            return Some(child);
                        },
                        None => {
                            stack.pop();
                        },
                    }
                }
            },
            TraverseInner::Fixed(ref mut items) => items.next(),
        }
    }
}

/// The DOM; the result of parsing.
pub struct Document {
    handle: Handle,
}

impl Document {
    pub fn new() -> Document {
        Document {
            handle: new_node(NodeData::Document),
        }
    }

    /// The document node itself.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// The doctype child, if the document has one.
    pub fn doctype(&self) -> Option<Handle> {
        self.handle
            .children()
            .iter()
            .find(|child| matches!(child.data, NodeData::Doctype { .. }))
            .cloned()
    }

    /// The first element child; the root of a well-formed document.
    pub fn root(&self) -> Option<Handle> {
        self.handle
            .children()
            .iter()
            .find(|child| child.as_element().is_some())
            .cloned()
    }

    pub fn create_element(&self, name: &str) -> Handle {
        new_element(TagName::from_str(name))
    }

    pub fn create_text(&self, text: &str) -> Handle {
        new_text(text)
    }

    pub fn create_comment(&self, text: &str) -> Handle {
        new_comment(StrTendril::from_slice(text))
    }

    /// The first element named `name` in preorder, starting from `from`
    /// (or the whole document).
    pub fn find_first(&self, name: &str, from: Option<&Handle>) -> Option<Handle> {
        let start = from.unwrap_or(&self.handle);
        start
            .traverse(TraversalOrder::Preorder)
            .find(|node| node.is_element_named(name))
    }
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(f: &mut fmt::Formatter<'_>, node: &Handle, depth: usize) -> fmt::Result {
            writeln!(f, "{:indent$}{node:?}", "", indent = depth * 2)?;
            for child in node.children().iter() {
                walk(f, child, depth + 1)?;
            }
            Ok(())
        }
        walk(f, &self.handle, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::TagId;

    fn elem(name: &str) -> Handle {
        new_element(TagName::from_str(name))
    }

    #[test]
    fn append_sets_parent_and_order() {
        let parent = elem("div");
        let a = elem("a");
        let b = elem("b");
        parent.append_child(a.clone());
        parent.append_child(b.clone());
        assert_eq!(parent.children().len(), 2);
        assert!(parent.children()[0].ptr_eq(&a));
        assert!(parent.children()[1].ptr_eq(&b));
        assert!(a.parent().unwrap().ptr_eq(&parent));
        assert!(parent.parent().is_none());
    }

    #[test]
    fn text_merges_into_trailing_text_node() {
        let parent = elem("p");
        parent.append_text("a");
        parent.append_text("b");
        assert_eq!(parent.children().len(), 1);
        assert_eq!(&*parent.children()[0].text().unwrap(), "ab");
        parent.append_child(elem("br"));
        parent.append_text("c");
        assert_eq!(parent.children().len(), 3);
    }

    #[test]
    fn attributes_preserve_insertion_order() {
        let node = elem("a");
        let element = node.as_element().unwrap();
        assert!(element.set_attribute("href", "x"));
        assert!(element.set_attribute("title", "y"));
        assert!(!element.set_attribute("href", "z"));
        let names: Vec<String> = element
            .attributes()
            .iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, vec!["href", "title"]);
        assert_eq!(&*element.attribute("href").unwrap(), "z");
        assert_eq!(element.attribute("missing"), None);
    }

    #[test]
    fn insert_unique_is_first_wins() {
        let mut attrs = Attributes::default();
        let attr = |n: &str, v: &str| Attribute {
            name: StrTendril::from_slice(n),
            value: StrTendril::from_slice(v),
        };
        assert!(attrs.insert_unique(attr("id", "1")));
        assert!(!attrs.insert_unique(attr("id", "2")));
        assert_eq!(&**attrs.get("id").unwrap(), "1");
        assert_eq!(attrs.len(), 1);
    }

    fn sample_tree() -> (Document, Handle, Handle, Handle, Handle) {
        // html -> (head, body -> (p -> text))
        let doc = Document::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        let p = doc.create_element("p");
        doc.handle().append_child(html.clone());
        html.append_child(head.clone());
        html.append_child(body.clone());
        body.append_child(p.clone());
        p.append_text("x");
        (doc, html, head, body, p)
    }

    #[test]
    fn preorder_visits_each_node_once() {
        let (doc, html, head, body, p) = sample_tree();
        let order: Vec<Handle> = doc.handle().traverse(TraversalOrder::Preorder).collect();
        assert_eq!(order.len(), 6);
        assert!(order[0].ptr_eq(doc.handle()));
        assert!(order[1].ptr_eq(&html));
        assert!(order[2].ptr_eq(&head));
        assert!(order[3].ptr_eq(&body));
        assert!(order[4].ptr_eq(&p));
        assert!(order[5].text().is_some());
    }

    #[test]
    fn postorder_is_reverse_of_preorder() {
        let (doc, ..) = sample_tree();
        let pre: Vec<Handle> = doc.handle().traverse(TraversalOrder::Preorder).collect();
        let post: Vec<Handle> = doc.handle().traverse(TraversalOrder::Postorder).collect();
        assert_eq!(pre.len(), post.len());
        for (a, b) in pre.iter().zip(post.iter().rev()) {
            assert!(a.ptr_eq(b));
        }
    }

    #[test]
    fn children_only_is_insertion_order() {
        let (_, html, head, body, _) = sample_tree();
        let kids: Vec<Handle> = html.traverse(TraversalOrder::ChildrenOnly).collect();
        assert_eq!(kids.len(), 2);
        assert!(kids[0].ptr_eq(&head));
        assert!(kids[1].ptr_eq(&body));
    }

    #[test]
    fn no_structural_equality() {
        let a = elem("div");
        let b = elem("div");
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn document_queries() {
        let (doc, html, _, body, p) = sample_tree();
        assert!(doc.root().unwrap().ptr_eq(&html));
        assert!(doc.doctype().is_none());
        assert!(doc.find_first("p", None).unwrap().ptr_eq(&p));
        assert!(doc.find_first("p", Some(&body)).unwrap().ptr_eq(&p));
        assert!(doc.find_first("table", None).is_none());
    }

    #[test]
    fn element_flags_come_from_the_catalog() {
        let br = elem("br");
        assert!(br.as_element().unwrap().is_void());
        assert_eq!(
            br.as_element().unwrap().name().id(),
            Some(TagId::Br)
        );
        let div = elem("div");
        assert!(!div.as_element().unwrap().is_void());
    }
}
