use serde::{Deserialize, Serialize};

use crate::error::StatementError;

/// Per-proxy settings.
///
/// Structured diagnostics are opt-in per proxy instance rather than
/// process-wide: with `log_statements` off the proxy never touches `tracing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Emit a `tracing` debug event for every intercepted operation.
    pub log_statements: bool,
    /// Attached to every diagnostic event so several proxies can be told apart.
    pub label: Option<String>,
}

impl ProxyOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ProxyOptionsBuilder {
        ProxyOptionsBuilder::new()
    }

    /// Parse options from a JSON document; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns `StatementError::ConfigError` if the document is not valid options JSON.
    pub fn from_json(json: &str) -> Result<Self, StatementError> {
        serde_json::from_str(json)
            .map_err(|e| StatementError::ConfigError(format!("invalid proxy options: {e}")))
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }
}

/// Fluent builder for `ProxyOptions`.
#[derive(Debug, Clone, Default)]
pub struct ProxyOptionsBuilder {
    opts: ProxyOptions,
}

impl ProxyOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log_statements(mut self, log_statements: bool) -> Self {
        self.opts.log_statements = log_statements;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.opts.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ProxyOptions {
        self.opts
    }
}
