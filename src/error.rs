use thiserror::Error;

/// Failure taxonomy for everything the assistant does on behalf of the user.
///
/// Stale results are deliberately not an error: a request whose token lost the
/// race is discarded without any user-visible effect (see the orchestrator's
/// `DispatchOutcome`).
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("{feature} configuration is missing. Check environment variables.")]
    ConfigurationMissing { feature: &'static str },

    #[error("Unsupported file type: {0}. Please upload a PDF or DOCX resume.")]
    UnsupportedFileType(String),

    /// The vendor was never reached (connect failure, timeout, dropped
    /// connection). Eligible for automatic retry.
    #[error("{service} did not respond: {reason}")]
    VendorTransient { service: &'static str, reason: String },

    /// The vendor answered with an error status. Never retried automatically.
    #[error("{service} error ({status}): {message}")]
    VendorTerminal {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The vendor reported a failure without an HTTP status (a failed job,
    /// an unreadable document, a malformed response body).
    #[error("{service} failed: {message}")]
    VendorFailure { service: &'static str, message: String },

    #[error("{service} timed out after {waited_secs}s")]
    Timeout { service: &'static str, waited_secs: u64 },
}

impl AssistantError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::VendorTransient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        let transient = AssistantError::VendorTransient {
            service: "completion",
            reason: "connection reset".to_string(),
        };
        assert!(transient.is_retryable());

        let terminal = AssistantError::VendorTerminal {
            service: "completion",
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(!terminal.is_retryable());

        let timeout = AssistantError::Timeout {
            service: "transcription",
            waited_secs: 120,
        };
        assert!(!timeout.is_retryable());
    }
}
