use thiserror::Error;

/// Outcome of a call guarded by a [`crate::CircuitBreaker`].
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker did not admit the call; the guarded operation never ran.
    #[error("circuit breaker '{name}' does not permit further calls")]
    Rejected { name: String },

    /// The guarded operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

impl<E> CallError<E> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, CallError::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_names_breaker() {
        let err: CallError<String> = CallError::Rejected {
            name: "kafka".to_string(),
        };
        assert!(err.is_rejected());
        assert!(err.to_string().contains("kafka"));
    }

    #[test]
    fn test_inner_displays_wrapped_error() {
        let err: CallError<&str> = CallError::Inner("boom");
        assert!(!err.is_rejected());
        assert_eq!(err.to_string(), "boom");
    }
}
