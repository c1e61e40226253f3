//! Engine-level error types.

use thiserror::Error;

/// Errors surfaced by the workflow engine.
///
/// Variants group into the taxonomy the engine guarantees to callers:
/// not-found, invalid-state, expression failure, and storage failure.
/// Timer-creation failures are logged by the router and never surface here.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("definition parse error: {0}")]
    DefinitionParse(String),
    #[error("definition invalid: {0}")]
    DefinitionInvalid(String),
    #[error("flow not found: {0}")]
    FlowNotFound(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("flow instance not found: {0}")]
    FlowInstanceNotFound(String),
    #[error("node instance not found: {0}")]
    NodeInstanceNotFound(String),
    /// Acting on a non-pending node instance, a non-candidate acting,
    /// or a stop-guard rejection.
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("expression `{expression}` failed: {message}")]
    Expression { expression: String, message: String },
    #[error("expression `{0}` cancelled before completion")]
    ExpressionCancelled(String),
    #[error("storage error during {context}: {message}")]
    Storage { context: String, message: String },
}

impl FlowError {
    /// Wrap a storage failure with the operation that issued it.
    pub fn storage(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        FlowError::Storage {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn expression(expression: impl Into<String>, message: impl std::fmt::Display) -> Self {
        FlowError::Expression {
            expression: expression.into(),
            message: message.to_string(),
        }
    }

    /// True for the invalid-state rejection class (never retried by callers).
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, FlowError::InvalidState(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FlowError::FlowNotFound(_)
                | FlowError::NodeNotFound(_)
                | FlowError::FlowInstanceNotFound(_)
                | FlowError::NodeInstanceNotFound(_)
        )
    }
}
