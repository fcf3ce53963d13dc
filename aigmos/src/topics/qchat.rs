//! `Q <text...>`: one chat turn against the Q service.
//!
//! Symbol tokens in the prompt are replaced by what `cat` shows for them.
//! Only the assistant text is returned.

use anyhow::{Result, anyhow, bail};
use qclient::{ChatMessage, ChatOptions, QChat};
use tracing::debug;

use crate::console::Console;
use crate::core::symbol::Sigil;
use crate::registry::CommandSpec;
use crate::reply::Reply;

pub const COMMANDS: &[CommandSpec] = &[CommandSpec::new(
    "sys.q.chat",
    q_chat,
    "LLM chat (returns only assistant text)",
    "Q <text...>",
)
.values_from(0)];

fn expand_prompt(console: &Console, parts: &[String]) -> Result<String> {
    let mut out = Vec::with_capacity(parts.len());
    for token in parts {
        match Sigil::of(token) {
            Some(Sigil::Text | Sigil::Routine | Sigil::Table) => {
                let cat = ["sys.cat".to_string(), token.clone()];
                let value = console
                    .dispatch_internal(&cat)
                    .map_err(|err| anyhow!("Q symbol expansion failed for {token}: {err:#}"))?;
                out.push(value.render().unwrap_or_default());
            }
            _ => out.push(token.clone()),
        }
    }
    Ok(out.join(" ").trim().to_string())
}

fn q_chat(console: &Console, args: &[String]) -> Result<Reply> {
    let prompt = expand_prompt(console, args)?;
    if prompt.is_empty() {
        return Ok(Reply::from(""));
    }

    let cfg = &console.config().q;
    if !cfg.is_configured() {
        bail!("Q config missing: [q].base_url is not set");
    }
    let client = QChat::new(cfg.clone())?;
    debug!(chars = prompt.len(), "Q chat");
    let text = client
        .chat_blocking(&[ChatMessage::user(prompt)], &ChatOptions::default())
        .map_err(|err| {
            let cfg = client.config();
            anyhow!(
                "Q failed (base_url={}, model={}, timeout_ms={}) :: {err}",
                cfg.base_url,
                cfg.model,
                cfg.timeout_ms
            )
        })?;
    Ok(Reply::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::ConsoleConfig;

    #[test]
    fn prompt_symbols_expand_through_cat() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        console.execute("add.item $ctx:topic rust");
        let parts: Vec<String> = ["explain", "$ctx:topic", "briefly"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            expand_prompt(&console, &parts).expect("prompt"),
            "explain rust briefly"
        );
        let bad = vec!["$ctx:missing".to_string()];
        assert_eq!(
            expand_prompt(&console, &bad).unwrap_err().to_string(),
            "Q symbol expansion failed for $ctx:missing: Key not found"
        );
    }

    #[test]
    fn unconfigured_q_is_an_error() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        assert_eq!(
            console.execute("Q hello").as_deref(),
            Some("Error: Q config missing: [q].base_url is not set")
        );
        assert_eq!(console.execute("Q").as_deref(), Some(""));
    }
}
