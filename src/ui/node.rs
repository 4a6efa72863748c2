//! Immutable view tree
//!
//! Views are plain data built from the application state on every render
//! pass. The reconciler diffs two of these trees; the terminal painter walks
//! the retained one.

use std::collections::BTreeMap;

/// A node in the view tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
        }
    }

    /// Depth-first search for the first element carrying `class`
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        let el = self.as_element()?;
        if el.has_class(class) {
            return Some(el);
        }
        el.children.iter().find_map(|c| c.find_class(class))
    }

    /// Number of nodes in the subtree, including this one
    pub fn size(&self) -> usize {
        match self {
            Node::Text(_) => 1,
            Node::Element(el) => 1 + el.children.iter().map(Node::size).sum::<usize>(),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

/// Element node: tag, optional identity key, attributes, children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub key: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Identity key; elements with different keys are never patched into each other
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append an optional child (conditional subtrees)
    pub fn maybe(mut self, node: Option<impl Into<Node>>) -> Self {
        if let Some(node) = node {
            self.children.push(node.into());
        }
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|c| c.split_whitespace().any(|part| part == class))
            .unwrap_or(false)
    }
}

/// `<div class="...">`
pub fn div(class: &str) -> Element {
    Element::new("div").class(class)
}

/// `<span class="...">text</span>`
pub fn span(class: &str, text: impl Into<String>) -> Element {
    let el = Element::new("span");
    let el = if class.is_empty() { el } else { el.class(class) };
    el.child(Node::text(text))
}

/// `<i class="icon ...">label</i>`, used for clickable controls
pub fn icon(class: &str, label: impl Into<String>) -> Element {
    Element::new("i")
        .class(format!("icon {class}"))
        .child(Node::text(label))
}
