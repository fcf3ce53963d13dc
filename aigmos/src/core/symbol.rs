//! Sigil parsing for symbolic references.
//!
//! `$sub[:key]` texts, `&name[:idx]` routine steps, `#a:b:c` table paths and
//! `%name` runners.

use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sigil {
    Text,
    Routine,
    Table,
    Runner,
}

impl Sigil {
    pub fn of(token: &str) -> Option<Self> {
        match token.chars().next()? {
            '$' => Some(Self::Text),
            '&' => Some(Self::Routine),
            '#' => Some(Self::Table),
            '%' => Some(Self::Runner),
            _ => None,
        }
    }
}

/// `$sub` or `$sub:key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRef<'a> {
    pub sub: &'a str,
    pub key: Option<&'a str>,
}

/// `&name` or `&name:idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRef<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

pub fn parse_text(token: &str) -> Result<TextRef<'_>> {
    let Some(body) = token.strip_prefix('$').filter(|body| !body.is_empty()) else {
        bail!("Expected $<sub> or $<sub>:<key>");
    };
    match body.split_once(':') {
        None => Ok(TextRef {
            sub: body,
            key: None,
        }),
        Some((sub, key)) if !sub.is_empty() && !key.is_empty() => Ok(TextRef {
            sub,
            key: Some(key),
        }),
        Some(_) => bail!("Expected $<sub>:<key>"),
    }
}

pub fn parse_routine(token: &str) -> Result<&str> {
    match token.strip_prefix('&') {
        Some(name) if !name.is_empty() => Ok(name),
        _ => bail!("Expected &<name>"),
    }
}

pub fn parse_runner(token: &str) -> Result<&str> {
    match token.strip_prefix('%') {
        Some(name) if !name.is_empty() => Ok(name),
        _ => bail!("Expected %<name>"),
    }
}

pub fn parse_table(token: &str) -> Result<Vec<String>> {
    let Some(body) = token.strip_prefix('#').filter(|body| !body.is_empty()) else {
        bail!("Expected #<path>");
    };
    let path: Vec<String> = body.split(':').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        bail!("Invalid # path");
    }
    Ok(path)
}

/// Destination-style step reference: `&name` appends, `&name:idx` addresses.
pub fn parse_step(token: &str) -> Result<StepRef<'_>> {
    let Some(body) = token.strip_prefix('&').filter(|body| !body.is_empty()) else {
        bail!("Expected &<name> or &<name>:<idx>");
    };
    match body.split_once(':') {
        None => Ok(StepRef {
            name: body,
            index: None,
        }),
        Some((name, idx)) => Ok(StepRef {
            name,
            index: Some(parse_index(idx)?),
        }),
    }
}

/// Source-style step reference that must carry an index.
///
/// `missing` is the error reported when the `:idx` part is absent.
pub fn parse_indexed_step<'a>(token: &'a str, missing: &str) -> Result<(&'a str, usize)> {
    let body = token.strip_prefix('&').unwrap_or(token);
    let Some((name, idx)) = body.split_once(':') else {
        bail!("{missing}");
    };
    Ok((name, parse_index(idx)?))
}

/// Non-negative decimal index.
pub fn parse_index(raw: &str) -> Result<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Index must be integer");
    }
    match raw.parse() {
        Ok(idx) => Ok(idx),
        Err(_) => bail!("Index must be integer"),
    }
}

pub fn table_token(path: &[String]) -> String {
    format!("#{}", path.join(":"))
}
