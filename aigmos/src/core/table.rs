//! The `#` tree store.
//!
//! A table is an unbounded tree rooted at an implicit dict. Every node is
//! either a dict of named children or a scalar leaf.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub type Branch = BTreeMap<String, TableNode>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableNode {
    Leaf(String),
    Dict(Branch),
}

impl TableNode {
    pub fn leaf(text: impl Into<String>) -> Self {
        Self::Leaf(text.into())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            Self::Dict(_) => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Branch> {
        match self {
            Self::Dict(branch) => Some(branch),
            Self::Leaf(_) => None,
        }
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Self::Dict(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    root: Branch,
}

impl Table {
    pub fn root(&self) -> &Branch {
        &self.root
    }

    /// Look up a node. The empty path never resolves.
    pub fn get(&self, path: &[String]) -> Option<&TableNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(first)?;
        for segment in rest {
            node = node.as_dict()?.get(segment)?;
        }
        Some(node)
    }

    /// Mutable dict at `path`; the empty path is the root.
    fn branch_mut(&mut self, path: &[String]) -> Option<&mut Branch> {
        let mut branch = &mut self.root;
        for segment in path {
            branch = match branch.get_mut(segment)? {
                TableNode::Dict(child) => child,
                TableNode::Leaf(_) => return None,
            };
        }
        Some(branch)
    }

    /// Walk `path`, creating missing dicts. Fails when a leaf is in the way.
    pub fn ensure_dict(&mut self, path: &[String]) -> Result<&mut Branch> {
        let mut branch = &mut self.root;
        for segment in path {
            let next = branch
                .entry(segment.clone())
                .or_insert_with(|| TableNode::Dict(Branch::new()));
            branch = match next {
                TableNode::Dict(child) => child,
                TableNode::Leaf(_) => bail!("Path collision at '{segment}'"),
            };
        }
        Ok(branch)
    }

    /// Write a leaf, refusing to replace a dict.
    pub fn set_leaf(&mut self, path: &[String], text: &str) -> Result<()> {
        let (key, parent) = split_last(path)?;
        let branch = self.ensure_dict(parent)?;
        if branch.get(key).is_some_and(TableNode::is_dict) {
            bail!("Cannot overwrite dict node with scalar");
        }
        branch.insert(key.clone(), TableNode::leaf(text));
        Ok(())
    }

    /// Append to a leaf (creating it empty first), refusing dicts.
    pub fn append_leaf(&mut self, path: &[String], text: &str) -> Result<()> {
        let (key, parent) = split_last(path)?;
        let branch = self.ensure_dict(parent)?;
        let current = match branch.get(key) {
            Some(TableNode::Dict(_)) => bail!("Cannot overwrite dict node with scalar"),
            Some(TableNode::Leaf(current)) => current.as_str(),
            None => "",
        };
        let joined = format!("{current}{text}");
        branch.insert(key.clone(), TableNode::Leaf(joined));
        Ok(())
    }

    /// Place `node` at `path`, overwriting whatever was there.
    pub fn set_node(&mut self, path: &[String], node: TableNode) -> Result<()> {
        let (key, parent) = split_last(path)?;
        self.ensure_dict(parent)?.insert(key.clone(), node);
        Ok(())
    }

    /// Detach and return the node at `path`, if any.
    pub fn remove(&mut self, path: &[String]) -> Result<Option<TableNode>> {
        let (key, parent) = split_last(path)?;
        Ok(self
            .branch_mut(parent)
            .and_then(|branch| branch.remove(key)))
    }

    /// All leaves under `base` as `(path, text)`, in path order.
    ///
    /// A leaf `base` yields itself; a missing `base` yields nothing. The empty
    /// `base` walks the whole table.
    pub fn leaves(&self, base: &[String]) -> Vec<(Vec<String>, String)> {
        let mut out = Vec::new();
        if base.is_empty() {
            collect_branch(&self.root, &mut Vec::new(), &mut out);
            return out;
        }
        if let Some(node) = self.get(base) {
            collect_node(node, &mut base.to_vec(), &mut out);
        }
        out
    }
}

fn split_last(path: &[String]) -> Result<(&String, &[String])> {
    match path.split_last() {
        Some(parts) => Ok(parts),
        None => bail!("Empty # path"),
    }
}

fn collect_node(node: &TableNode, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
    match node {
        TableNode::Leaf(text) => out.push((path.clone(), text.clone())),
        TableNode::Dict(branch) => collect_branch(branch, path, out),
    }
}

fn collect_branch(branch: &Branch, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
    // BTreeMap order makes the depth-first walk sorted by path.
    for (key, child) in branch {
        path.push(key.clone());
        collect_node(child, path, out);
        path.pop();
    }
}
