//! Fixpoint token expansion.
//!
//! Expanders run in order; the first one that changes the tokens wins the
//! pass. Expansion stops when no expander changes anything, fails when a
//! token list repeats, and fails when the pass budget runs out.

use std::collections::HashSet;

use anyhow::{Result, bail};

/// Rewrites a token list, or returns `None` when it does not apply.
pub type Expander<'a> = dyn Fn(&[String]) -> Option<Vec<String>> + 'a;

pub fn expand(mut parts: Vec<String>, max_passes: usize, expanders: &[&Expander<'_>]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    for _ in 0..max_passes {
        if !seen.insert(parts.clone()) {
            bail!("Expansion loop detected");
        }
        let next = expanders
            .iter()
            .find_map(|expander| expander(&parts).filter(|next| *next != parts));
        match next {
            Some(next) => parts = next,
            None => return Ok(parts),
        }
    }
    bail!("Expansion depth exceeded (max_passes={max_passes})")
}
