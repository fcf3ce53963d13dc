//! Trigger symbols and edge-latch bookkeeping.
//!
//! A trigger symbol is any token ending in `.trg` that resolves to an
//! integer: `%runner.trg`, `$sub:key.trg` or `#a:b.trg`. Unresolvable
//! symbols read as `0`.

pub const TRG_SUFFIX: &str = ".trg";

/// Reserved value: bindings for the symbol are purged when it is observed.
pub const PURGE: i64 = 3;

pub const DONE: u8 = 1;
pub const FAILED: u8 = 2;
pub const STOPPED: u8 = 3;

const RUNNER_CONTROL: &[&str] = &["run", "status", "pause", "stop"];

pub fn is_trigger_symbol(token: &str) -> bool {
    token.ends_with(TRG_SUFFIX)
}

/// `*` matches every symbol, `*<suffix>` matches by suffix, anything else
/// is an exact match.
pub fn matches_pattern(symbol: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_prefix('*') {
        Some(suffix) => symbol.ends_with(suffix),
        None => symbol == pattern,
    }
}

/// Lenient integer read: anything unparsable is `0`.
pub fn parse_value(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// `%name.trg` -> `name`.
pub fn runner_symbol(token: &str) -> Option<&str> {
    token.strip_prefix('%')?.strip_suffix(TRG_SUFFIX)
}

/// `$sub:key.trg` -> `(sub, key.trg)`.
pub fn text_symbol(token: &str) -> Option<(&str, &str)> {
    let body = token.strip_prefix('$')?;
    let (sub, key) = body.split_once(':')?;
    key.ends_with(TRG_SUFFIX).then_some((sub, key))
}

/// `#a:b.trg` -> `[a, b.trg]`; empty segments are dropped.
pub fn table_symbol(token: &str) -> Option<Vec<String>> {
    let body = token.strip_prefix('#')?;
    let path: Vec<String> = body
        .split(':')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    path.last()
        .is_some_and(|last| last.ends_with(TRG_SUFFIX))
        .then_some(path)
}

/// Replace every token `resolve` knows with its integer value.
///
/// Returns `None` when nothing was replaced.
pub fn substitute(parts: &[String], resolve: impl Fn(&str) -> Option<i64>) -> Option<Vec<String>> {
    let mut changed = false;
    let out = parts
        .iter()
        .map(|token| match resolve(token) {
            Some(value) => {
                changed = true;
                value.to_string()
            }
            None => token.clone(),
        })
        .collect();
    changed.then_some(out)
}

/// `run %x ...`, `status %x`, `pause %x`, `stop %x`.
pub fn is_runner_control(parts: &[String]) -> bool {
    match parts {
        [head, target, ..] => RUNNER_CONTROL.contains(&head.as_str()) && target.starts_with('%'),
        _ => false,
    }
}

pub fn is_runner_control_line(line: &str) -> bool {
    let parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    is_runner_control(&parts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latch {
    /// Value 3 observed: drop every binding for the symbol.
    Purge,
    /// Value 0 observed: the symbol may fire again.
    Rearm,
    /// Non-zero value on an armed symbol: fire matching bindings once.
    Fire,
    /// Non-zero value on a disarmed symbol.
    Hold,
}

/// Advance one symbol's latch given its current value.
pub fn step_latch(armed: &mut bool, value: i64) -> Latch {
    if value == PURGE {
        return Latch::Purge;
    }
    if value == 0 {
        *armed = true;
        return Latch::Rearm;
    }
    if !*armed {
        return Latch::Hold;
    }
    *armed = false;
    Latch::Fire
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn symbol_shapes() {
        assert_eq!(runner_symbol("%build.trg"), Some("build"));
        assert_eq!(runner_symbol("%build"), None);
        assert_eq!(text_symbol("$flags:go.trg"), Some(("flags", "go.trg")));
        assert_eq!(text_symbol("$flags.trg"), None);
        assert_eq!(
            table_symbol("#a::b.trg"),
            Some(vec!["a".to_string(), "b.trg".to_string()])
        );
        assert_eq!(table_symbol("#a:b"), None);
    }

    #[test]
    fn patterns() {
        assert!(matches_pattern("%x.trg", "*"));
        assert!(matches_pattern("%x.trg", "*.trg"));
        assert!(matches_pattern("%x.trg", "%x.trg"));
        assert!(!matches_pattern("%x.trg", "%y.trg"));
    }

    #[test]
    fn substitute_reports_changes() {
        let resolve = |token: &str| (token == "%a.trg").then_some(1);
        assert_eq!(
            substitute(&toks("echo %a.trg"), resolve),
            Some(toks("echo 1"))
        );
        assert_eq!(substitute(&toks("echo x"), resolve), None);
    }

    #[test]
    fn runner_control_detection() {
        assert!(is_runner_control_line("run %x &r"));
        assert!(is_runner_control_line("stop %x"));
        assert!(!is_runner_control_line("run ls"));
        assert!(!is_runner_control_line("status"));
    }

    #[test]
    fn latch_fires_once_per_edge() {
        let mut armed = true;
        assert_eq!(step_latch(&mut armed, 1), Latch::Fire);
        assert_eq!(step_latch(&mut armed, 1), Latch::Hold);
        assert_eq!(step_latch(&mut armed, 2), Latch::Hold);
        assert_eq!(step_latch(&mut armed, 0), Latch::Rearm);
        assert_eq!(step_latch(&mut armed, 2), Latch::Fire);
        assert_eq!(step_latch(&mut armed, PURGE), Latch::Purge);
    }

    #[test]
    fn parse_value_is_lenient() {
        assert_eq!(parse_value(" 2 "), 2);
        assert_eq!(parse_value("abc"), 0);
        assert_eq!(parse_value(""), 0);
    }
}
