//! Connection settings for the Q service.

use serde::{Deserialize, Serialize};

use crate::error::{QError, QResult};

pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Q client configuration.
///
/// Embedded as the `[q]` table of the console config. `base_url` has no
/// default: Q stays disabled until it is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QConfig {
    /// Service root, e.g. `http://127.0.0.1:8787`.
    pub base_url: String,

    /// Overall deadline for one chat in milliseconds. `0` waits forever.
    pub timeout_ms: u64,

    /// Delay between status polls. `0` yields without sleeping.
    pub poll_interval_ms: u64,

    pub model: String,
}

impl Default for QConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 8000,
            poll_interval_ms: 200,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl QConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Trim and canonicalize fields; fails when `base_url` is empty.
    pub fn normalized(mut self) -> QResult<Self> {
        let base_url = self.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(QError::Config("base_url missing/empty".to_string()));
        }
        self.base_url = base_url.to_string();

        let model = self.model.trim();
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };
        Ok(self)
    }

    /// `true` once a service URL has been configured.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_strips_trailing_slashes() {
        let cfg = QConfig::new("  http://localhost:8787// ")
            .normalized()
            .expect("normalize");
        assert_eq!(cfg.base_url, "http://localhost:8787");
        assert_eq!(cfg.model, DEFAULT_MODEL);
    }

    #[test]
    fn normalized_rejects_empty_base_url() {
        let err = QConfig::default().normalized().unwrap_err();
        assert!(err.to_string().contains("base_url missing/empty"));
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let cfg = QConfig {
            model: "   ".to_string(),
            ..QConfig::new("http://q")
        }
        .normalized()
        .expect("normalize");
        assert_eq!(cfg.model, DEFAULT_MODEL);
    }
}
