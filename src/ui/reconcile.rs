//! View tree reconciler
//!
//! `diff` compares two view trees and emits the patch operations needed to
//! turn the first into the second; `apply` replays them onto a retained tree.
//! Nodes are addressed by their child-index path from the root.
//!
//! Children are matched by position. Within one parent the operations are
//! ordered so every path stays valid while replaying: nested edits on the
//! shared prefix first, then removals from the end, then appends.

use thiserror::Error;

use super::node::{Element, Node};

/// Child-index path from the root (empty = the root itself)
pub type NodePath = Vec<usize>;

/// A single view mutation
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Swap the node at `path` for a new subtree
    Replace { path: NodePath, node: Node },
    SetAttr {
        path: NodePath,
        name: String,
        value: String,
    },
    RemoveAttr { path: NodePath, name: String },
    /// Insert `node` as child `index` of the element at `path`
    Insert {
        path: NodePath,
        index: usize,
        node: Node,
    },
    /// Remove child `index` of the element at `path`
    Remove { path: NodePath, index: usize },
}

/// Ordered list of mutations produced by `diff`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("no node at path {0:?}")]
    InvalidPath(NodePath),
    #[error("node at path {0:?} is text, expected an element")]
    NotAnElement(NodePath),
    #[error("child index {index} out of bounds at path {path:?}")]
    IndexOutOfBounds { path: NodePath, index: usize },
}

/// Compute the patch turning `prev` into `next`
pub fn diff(prev: &Node, next: &Node) -> Patch {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_node(prev, next, &mut path, &mut ops);
    Patch { ops }
}

fn diff_node(prev: &Node, next: &Node, path: &mut NodePath, ops: &mut Vec<PatchOp>) {
    match (prev, next) {
        (Node::Text(a), Node::Text(b)) => {
            if a != b {
                ops.push(PatchOp::Replace {
                    path: path.clone(),
                    node: next.clone(),
                });
            }
        }
        (Node::Element(a), Node::Element(b)) if a.tag == b.tag && a.key == b.key => {
            diff_attrs(a, b, path, ops);
            diff_children(a, b, path, ops);
        }
        _ => ops.push(PatchOp::Replace {
            path: path.clone(),
            node: next.clone(),
        }),
    }
}

fn diff_attrs(prev: &Element, next: &Element, path: &NodePath, ops: &mut Vec<PatchOp>) {
    for name in prev.attrs.keys() {
        if !next.attrs.contains_key(name) {
            ops.push(PatchOp::RemoveAttr {
                path: path.clone(),
                name: name.clone(),
            });
        }
    }
    for (name, value) in &next.attrs {
        if prev.attrs.get(name) != Some(value) {
            ops.push(PatchOp::SetAttr {
                path: path.clone(),
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
}

fn diff_children(prev: &Element, next: &Element, path: &mut NodePath, ops: &mut Vec<PatchOp>) {
    let shared = prev.children.len().min(next.children.len());

    for (i, (a, b)) in prev.children.iter().zip(&next.children).enumerate() {
        path.push(i);
        diff_node(a, b, path, ops);
        path.pop();
    }

    for index in (shared..prev.children.len()).rev() {
        ops.push(PatchOp::Remove {
            path: path.clone(),
            index,
        });
    }

    for (index, node) in next.children.iter().enumerate().skip(shared) {
        ops.push(PatchOp::Insert {
            path: path.clone(),
            index,
            node: node.clone(),
        });
    }
}

/// Replay `patch` onto the retained tree, returning the updated root
pub fn apply(root: Node, patch: &Patch) -> Result<Node, PatchError> {
    let mut root = root;
    for op in &patch.ops {
        apply_op(&mut root, op)?;
    }
    Ok(root)
}

fn apply_op(root: &mut Node, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Replace { path, node } => {
            *node_at(root, path)? = node.clone();
        }
        PatchOp::SetAttr { path, name, value } => {
            element_at(root, path)?
                .attrs
                .insert(name.clone(), value.clone());
        }
        PatchOp::RemoveAttr { path, name } => {
            element_at(root, path)?.attrs.remove(name);
        }
        PatchOp::Insert { path, index, node } => {
            let el = element_at(root, path)?;
            if *index > el.children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                });
            }
            el.children.insert(*index, node.clone());
        }
        PatchOp::Remove { path, index } => {
            let el = element_at(root, path)?;
            if *index >= el.children.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                });
            }
            el.children.remove(*index);
        }
    }
    Ok(())
}

fn node_at<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Node, PatchError> {
    let mut node = root;
    for (depth, &index) in path.iter().enumerate() {
        node = match node {
            Node::Element(el) => el
                .children
                .get_mut(index)
                .ok_or_else(|| PatchError::InvalidPath(path[..=depth].to_vec()))?,
            Node::Text(_) => return Err(PatchError::InvalidPath(path[..=depth].to_vec())),
        };
    }
    Ok(node)
}

fn element_at<'a>(root: &'a mut Node, path: &[usize]) -> Result<&'a mut Element, PatchError> {
    match node_at(root, path)? {
        Node::Element(el) => Ok(el),
        Node::Text(_) => Err(PatchError::NotAnElement(path.to_vec())),
    }
}
