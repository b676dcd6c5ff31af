//! Error taxonomy shared by the coevo crates.
//!
//! Randomness-driven rejections are never errors. Everything that reaches an
//! [`EcoError`] is either a configuration inconsistency caught before a chain
//! starts or a structural invariant violation that would corrupt the chain.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`EcoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (comparison labels, indices, values).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum EcoError {
    /// Inconsistent run or model configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Violated model invariant (negative size, frequency outside (0, 1), dangling event).
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Operator misuse or an operator incompatible with the model.
    #[error("operator error: {0}")]
    Operator(ErrorInfo),
    /// Invalid prior distribution parameters.
    #[error("prior error: {0}")]
    Prior(ErrorInfo),
    /// Randomness and categorical draw errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl EcoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            EcoError::Config(info)
            | EcoError::Model(info)
            | EcoError::Operator(info)
            | EcoError::Prior(info)
            | EcoError::Rng(info)
            | EcoError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`EcoError::Model`] invariant violation.
    pub fn invariant(code: impl Into<String>, message: impl Into<String>) -> Self {
        EcoError::Model(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`EcoError::Config`] inconsistency.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        EcoError::Config(ErrorInfo::new(code, message))
    }
}
