//! Handler replies and pipeline outcomes.

/// What a `sys.*` handler returns on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Rendered one item per line.
    Lines(Vec<String>),
    Nothing,
}

impl Reply {
    pub fn ok() -> Self {
        Self::Text("OK".to_string())
    }

    pub fn render(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Lines(lines) => Some(lines.join("\n")),
            Self::Nothing => None,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Result of pushing one line through the console pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(Reply),
    /// Refused before dispatch: not on the surface, or no such primitive.
    Rejected(String),
    /// Expansion or handler error.
    Failed(String),
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Reply(_))
    }

    pub fn render(self) -> Option<String> {
        match self {
            Self::Reply(reply) => reply.render(),
            Self::Rejected(message) => Some(message),
            Self::Failed(message) => Some(format!("Error: {message}")),
        }
    }
}
