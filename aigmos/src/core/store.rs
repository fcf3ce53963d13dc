//! In-memory symbolic store.
//!
//! Three shapes share the root/sub idea:
//! - kvlists: root -> sub -> key -> scalar (`$` lives under `texts`)
//! - lists:   root -> sub -> ordered scalars (`&` lives under `routines`)
//! - tables:  one unbounded tree (`#`)
//!
//! Roots are fixed schema anchors. Guards below reject unknown roots and
//! missing subs with stable messages.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};

use super::table::Table;

pub const TEXTS_ROOT: &str = "texts";
pub const ROUTINES_ROOT: &str = "routines";
pub const TABLES_ROOT: &str = "tables";

pub const KV_ROOTS: &[&str] = &[TEXTS_ROOT];
pub const LIST_ROOTS: &[&str] = &[ROUTINES_ROOT];

pub type KvSub = BTreeMap<String, String>;
pub type KvRoot = BTreeMap<String, KvSub>;
pub type ListRoot = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    kvlists: BTreeMap<String, KvRoot>,
    lists: BTreeMap<String, ListRoot>,
    tables: Table,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            kvlists: KV_ROOTS
                .iter()
                .map(|root| (root.to_string(), KvRoot::new()))
                .collect(),
            lists: LIST_ROOTS
                .iter()
                .map(|root| (root.to_string(), ListRoot::new()))
                .collect(),
            tables: Table::default(),
        }
    }
}

impl Store {
    pub fn kvlists(&self) -> &BTreeMap<String, KvRoot> {
        &self.kvlists
    }

    pub fn lists(&self) -> &BTreeMap<String, ListRoot> {
        &self.lists
    }

    pub fn tables(&self) -> &Table {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut Table {
        &mut self.tables
    }

    pub fn kv_root(&self, root: &str) -> Result<&KvRoot> {
        self.kvlists
            .get(root)
            .ok_or_else(|| anyhow!("Unknown kv root: {root}"))
    }

    pub fn kv_root_mut(&mut self, root: &str) -> Result<&mut KvRoot> {
        self.kvlists
            .get_mut(root)
            .ok_or_else(|| anyhow!("Unknown kv root: {root}"))
    }

    pub fn kv_sub(&self, root: &str, sub: &str) -> Result<&KvSub> {
        self.kv_root(root)?
            .get(sub)
            .ok_or_else(|| anyhow!("Sub not found: kv/{root}/{sub}"))
    }

    pub fn kv_sub_mut(&mut self, root: &str, sub: &str) -> Result<&mut KvSub> {
        self.kv_root_mut(root)?
            .get_mut(sub)
            .ok_or_else(|| anyhow!("Sub not found: kv/{root}/{sub}"))
    }

    pub fn list_root(&self, root: &str) -> Result<&ListRoot> {
        self.lists
            .get(root)
            .ok_or_else(|| anyhow!("Unknown list root: {root}"))
    }

    pub fn list_root_mut(&mut self, root: &str) -> Result<&mut ListRoot> {
        self.lists
            .get_mut(root)
            .ok_or_else(|| anyhow!("Unknown list root: {root}"))
    }

    pub fn list_sub(&self, root: &str, sub: &str) -> Result<&Vec<String>> {
        self.list_root(root)?
            .get(sub)
            .ok_or_else(|| anyhow!("Sub not found: list/{root}/{sub}"))
    }

    pub fn list_sub_mut(&mut self, root: &str, sub: &str) -> Result<&mut Vec<String>> {
        self.list_root_mut(root)?
            .get_mut(sub)
            .ok_or_else(|| anyhow!("Sub not found: list/{root}/{sub}"))
    }

    pub fn texts(&self) -> Result<&KvRoot> {
        self.kv_root(TEXTS_ROOT)
    }

    pub fn texts_mut(&mut self) -> Result<&mut KvRoot> {
        self.kv_root_mut(TEXTS_ROOT)
    }

    pub fn text_sub(&self, sub: &str) -> Result<&KvSub> {
        self.kv_sub(TEXTS_ROOT, sub)
    }

    pub fn text_sub_mut(&mut self, sub: &str) -> Result<&mut KvSub> {
        self.kv_sub_mut(TEXTS_ROOT, sub)
    }

    pub fn routines(&self) -> Result<&ListRoot> {
        self.list_root(ROUTINES_ROOT)
    }

    pub fn routines_mut(&mut self) -> Result<&mut ListRoot> {
        self.list_root_mut(ROUTINES_ROOT)
    }

    pub fn routine(&self, name: &str) -> Result<&Vec<String>> {
        self.list_sub(ROUTINES_ROOT, name)
    }

    pub fn routine_mut(&mut self, name: &str) -> Result<&mut Vec<String>> {
        self.list_sub_mut(ROUTINES_ROOT, name)
    }
}
