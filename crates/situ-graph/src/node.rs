//! Tree nodes and path addressing.

use indexmap::IndexMap;

use crate::value::{ExternalArray, Value};

/// A node in the exchange graph.
///
/// A node is either a leaf holding a [`Value`] or an interior node with
/// named children kept in insertion order. Paths are `/`-separated;
/// empty segments are ignored, so `"a//b/"` addresses the same node as
/// `"a/b"`. Writing through a path creates the intermediate nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    value: Option<Value>,
    children: IndexMap<String, Node>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Node {
    /// An empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// This node's leaf value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Make this node a leaf holding `value`, dropping any children.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.children.clear();
        self.value = Some(value.into());
    }

    /// Set the leaf at `path`, creating intermediate nodes.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        self.fetch_mut(path).set_value(value);
    }

    /// Set a string leaf at `path`.
    pub fn set_string(&mut self, path: &str, value: &str) {
        self.set(path, value);
    }

    /// Set an external array reference at `path`.
    pub fn set_external(&mut self, path: &str, external: ExternalArray) {
        self.set(path, external);
    }

    /// Append `item` to the string list at `path`, creating it if needed.
    ///
    /// A non-list leaf at `path` is replaced by a one-element list.
    pub fn append_string(&mut self, path: &str, item: &str) {
        let node = self.fetch_mut(path);
        match &mut node.value {
            Some(Value::StrList(list)) => list.push(item.to_owned()),
            _ => node.set_value(vec![item.to_owned()]),
        }
    }

    /// The node at `path`, if present. The empty path is `self`.
    pub fn fetch(&self, path: &str) -> Option<&Node> {
        let mut node = self;
        for seg in segments(path) {
            node = node.children.get(seg)?;
        }
        Some(node)
    }

    /// The node at `path`, creating it and any missing parents.
    pub fn fetch_mut(&mut self, path: &str) -> &mut Node {
        let mut node = self;
        for seg in segments(path) {
            node.value = None;
            node = node.children.entry(seg.to_owned()).or_default();
        }
        node
    }

    /// The leaf value at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fetch(path).and_then(Node::value)
    }

    /// Whether a node exists at `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.fetch(path).is_some()
    }

    /// Detach and return the node at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Node> {
        let segs: Vec<&str> = segments(path).collect();
        let (last, parents) = segs.split_last()?;
        let mut node = self;
        for seg in parents {
            node = node.children.get_mut(*seg)?;
        }
        node.children.shift_remove(*last)
    }

    /// Direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the node has neither a value nor children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Drop the value and every child.
    pub fn reset(&mut self) {
        self.value = None;
        self.children.clear();
    }

    /// Every leaf below this node as `(path, value)`, depth first.
    pub fn leaves(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        self.collect_leaves(String::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: String, out: &mut Vec<(String, &'a Value)>) {
        if let Some(v) = &self.value {
            out.push((prefix, v));
            return;
        }
        for (name, child) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            child.collect_leaves(path, out);
        }
    }
}
