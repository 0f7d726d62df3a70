//! Error category classification

use serde::{Deserialize, Serialize};

/// Classification of core errors by caller-visible semantics
///
/// The transport boundary maps categories to status codes; clients use
/// [`ErrorCategory::is_retryable`] to decide whether resubmitting the
/// same request can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller must fix the input
    Validation,
    /// Record absent under this tenant (or not this tenant's)
    NotFound,
    /// Lost a race; retrying the same request may succeed
    Conflict,
    /// Business rule blocked the operation
    Precondition,
    /// Infrastructure fault
    System,
}

impl ErrorCategory {
    /// Whether resubmitting the identical request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::System)
    }

    /// String name for structured logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Precondition => "precondition",
            Self::System => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorCategory::Conflict.is_retryable());
        assert!(ErrorCategory::System.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Precondition.is_retryable());
    }
}
