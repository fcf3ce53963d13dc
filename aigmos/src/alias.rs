//! The user-facing command surface.
//!
//! Users never type `sys.*` primitives. Every line must start with a surface
//! alias, which expands by replacing the head token.

use std::collections::BTreeMap;

pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("mk", "sys.mk"),
    ("rm", "sys.rm"),
    ("ls", "sys.ls"),
    ("add.item", "sys.add.item"),
    ("cat", "sys.cat"),
    ("cp", "sys.cp"),
    ("mv", "sys.mv"),
    ("import.file", "sys.io.import.file"),
    ("import.many", "sys.io.import.many"),
    ("export.file", "sys.io.export.file"),
    ("export.many", "sys.io.export.many"),
    ("plan", "sys.plan"),
    ("plan.show", "sys.plan.show"),
    ("plan.rm", "sys.plan.rm"),
    ("run", "sys.run"),
    ("status", "sys.status"),
    ("pause", "sys.pause"),
    ("stop", "sys.stop"),
    ("ON", "sys.ev.on"),
    ("ON.show", "sys.ev.show"),
    ("ON.reset", "sys.ev.reset"),
    ("Q", "sys.q.chat"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(BUILTIN_ALIASES.iter().map(|(name, exp)| (name.to_string(), exp.to_string())))
    }
}

impl AliasTable {
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            aliases: aliases.into_iter().collect(),
        }
    }

    /// Built-ins overlaid with `extra`.
    pub fn with_overrides(extra: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        table
            .aliases
            .extend(extra.iter().map(|(name, exp)| (name.clone(), exp.clone())));
        table
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Sorted alias names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn expand(&self, parts: &[String]) -> Option<Vec<String>> {
        let (head, rest) = parts.split_first()?;
        let expansion = self.aliases.get(head)?;
        let mut out: Vec<String> = expansion.split_whitespace().map(str::to_string).collect();
        out.extend_from_slice(rest);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn expands_head_only() {
        let table = AliasTable::default();
        assert_eq!(table.expand(&toks("ls ls")), Some(toks("sys.ls ls")));
        assert_eq!(table.expand(&toks("sys.ls")), None);
    }

    #[test]
    fn overrides_extend_the_surface() {
        let extra = BTreeMap::from([("show".to_string(), "sys.cat".to_string())]);
        let table = AliasTable::with_overrides(&extra);
        assert!(table.contains("show"));
        assert!(table.contains("mk"));
        assert_eq!(table.names().next(), Some("ON"));
    }
}
