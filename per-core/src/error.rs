use thiserror::Error;

/// Main error type for PER encoding and decoding
#[derive(Error, Debug)]
pub enum PerError {
    /// The refill source is permanently exhausted
    #[error("End of data: need {needed} bits, have {available}")]
    EndOfData { needed: usize, available: usize },

    /// The refill source has nothing more for now; retry once more data arrives
    #[error("Need more input: need {needed} bits, have {available}")]
    NeedMoreInput { needed: usize, available: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Flush failed: {0}")]
    Flush(String),

    #[error("Caller contract violation: {0}")]
    ContractViolation(String),

    #[error("Malformed PER stream: {0}")]
    Malformed(String),
}

impl PerError {
    /// Whether the failure is due to missing input rather than bad input
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PerError::EndOfData { .. } | PerError::NeedMoreInput { .. }
        )
    }

    /// Whether the same call may succeed after more input is supplied
    pub fn is_retryable(&self) -> bool {
        matches!(self, PerError::NeedMoreInput { .. })
    }
}

/// Result type alias for PER operations
pub type PerResult<T> = Result<T, PerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_classification() {
        let eod = PerError::EndOfData { needed: 8, available: 3 };
        let pending = PerError::NeedMoreInput { needed: 8, available: 3 };
        let malformed = PerError::Malformed("bad".to_string());

        assert!(eod.is_insufficient_data());
        assert!(!eod.is_retryable());
        assert!(pending.is_insufficient_data());
        assert!(pending.is_retryable());
        assert!(!malformed.is_insufficient_data());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: PerError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, PerError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
