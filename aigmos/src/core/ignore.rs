//! Gitignore-style `.ignore` rules.
//!
//! Rules cascade: a directory's `.ignore` adds to the rules inherited from
//! its parents, and the last matching rule decides. Each rule matches the
//! candidate's path relative to the directory that declared it.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

pub const IGNORE_FILE: &str = ".ignore";

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    base_dir: PathBuf,
    pattern: String,
    negated: bool,
    dir_only: bool,
    anchored: bool,
    regex: Regex,
}

impl IgnoreRule {
    pub fn compile(base_dir: &Path, negated: bool, raw: &str) -> Result<Self> {
        let anchored = raw.starts_with('/');
        let mut pattern = raw.strip_prefix('/').unwrap_or(raw);
        let dir_only = pattern.ends_with('/');
        if dir_only {
            pattern = &pattern[..pattern.len() - 1];
        }

        let mut rx = String::from("^");
        // Slash-free, unanchored patterns match at any depth.
        if !anchored && !pattern.contains('/') {
            rx.push_str("(?:.*/)?");
        }
        rx.push_str(&glob_to_regex(pattern));
        rx.push_str(if dir_only { "(?:$|/.*$)" } else { "$" });

        let regex = Regex::new(&rx).with_context(|| format!("invalid ignore pattern: {raw}"))?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            pattern: raw.to_string(),
            negated,
            dir_only,
            anchored,
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let Ok(rel) = path.strip_prefix(&self.base_dir) else {
            return false;
        };
        let rel = posix(rel);
        !rel.is_empty() && self.regex.is_match(&rel)
    }
}

/// Parse the contents of one `.ignore` file declared in `base_dir`.
///
/// Patterns that fail to compile are skipped with a warning.
pub fn parse_rules(base_dir: &Path, contents: &str) -> Vec<IgnoreRule> {
    contents
        .lines()
        .filter_map(parse_line)
        .filter_map(|(negated, pattern)| {
            match IgnoreRule::compile(base_dir, negated, &pattern) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    tracing::warn!(dir = %base_dir.display(), err = %format!("{err:#}"), "skipping ignore rule");
                    None
                }
            }
        })
        .collect()
}

/// Last match wins; no match means not ignored.
pub fn is_ignored(path: &Path, is_dir: bool, rules: &[IgnoreRule]) -> bool {
    rules
        .iter()
        .rev()
        .find(|rule| rule.matches(path, is_dir))
        .is_some_and(|rule| !rule.negated)
}

/// `(negated, pattern)`, or `None` for blanks and comments.
fn parse_line(line: &str) -> Option<(bool, String)> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut line = line;
    if line.ends_with(' ') && !line.ends_with("\\ ") {
        line = line.trim_end_matches(' ');
    }
    let (negated, rest) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let pattern = unescape(rest);
    (!pattern.is_empty()).then_some((negated, pattern))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut escaped = false;
    for ch in raw.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    if escaped {
        out.push('\\');
    }
    out
}

/// `*` stays within a segment, `**` crosses segments, `**/` may match
/// nothing, `?` is one non-slash char and `[...]` is a class without `/`.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                let mut j = i;
                while j + 1 < chars.len() && chars[j + 1] == '*' {
                    j += 1;
                }
                if j == i {
                    out.push_str("[^/]*");
                } else if chars.get(j + 1) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    j += 1;
                } else {
                    out.push_str(".*");
                }
                i = j;
            }
            '?' => out.push_str("[^/]"),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    let body: String = chars[i + 1..end].iter().collect();
                    let body = match body.strip_prefix('!') {
                        Some(rest) => format!("^{rest}"),
                        None => body,
                    };
                    out.push('[');
                    out.push_str(&body.replace('/', ""));
                    out.push(']');
                    i = end;
                }
                None => out.push_str(&regex::escape("[")),
            },
            ch => out.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    out
}

fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if matches!(chars.get(j), Some('!' | '^')) {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn posix(rel: &Path) -> String {
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
