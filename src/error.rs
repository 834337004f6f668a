use thiserror::Error;

/// Why the intake check turned a file away. Never retryable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("File too large. Maximum size is 50MB (current: {size_mib:.2}MB)")]
    TooLarge { size_mib: f64 },
    #[error("Invalid file type. Please upload WAV, MP3, OGG, or FLAC files.")]
    UnsupportedType,
}

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The server answered with a non-success status. `error` is the
    /// `error` field of the JSON body, when there was one.
    #[error("server responded with status {status}")]
    Status { status: u16, error: Option<String> },
    /// No usable response: connection refused, reset, unreadable body.
    #[error("request failed: {0}")]
    Transport(String),
    /// The response arrived but its audio payload could not be decoded.
    #[error("could not decode processed audio: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Precondition failures of controller actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Please select an audio file first")]
    NoFile,
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("There is no failed attempt to retry")]
    NothingToRetry,
    #[error("There is no processed audio to download")]
    NoResult,
}

/// User-facing message for a failed transform attempt.
pub fn describe_failure(err: &ServiceError) -> String {
    match err {
        ServiceError::Status { status: 413, .. } => {
            "File too large. Please use a smaller file (max 50MB).".to_string()
        }
        ServiceError::Status { status: 503, .. } => {
            "Server is currently unavailable. Please try again in a moment.".to_string()
        }
        ServiceError::Status { status, error } => {
            let detail = error
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Server error ({status})"));
            if *status >= 500 {
                format!("Server error: {detail}. You can retry processing.")
            } else {
                detail
            }
        }
        ServiceError::Transport(_) => "Failed to process audio. Please try again.".to_string(),
        ServiceError::Decode(_) => {
            "The server returned audio that could not be decoded.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, error: Option<&str>) -> ServiceError {
        ServiceError::Status {
            status,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn payload_too_large_ignores_server_body() {
        let msg = describe_failure(&status(413, Some("Request Entity Too Large")));
        assert_eq!(msg, "File too large. Please use a smaller file (max 50MB).");
    }

    #[test]
    fn unavailable_has_fixed_message() {
        let msg = describe_failure(&status(503, Some("maintenance")));
        assert!(msg.contains("unavailable"));
        assert!(!msg.contains("maintenance"));
    }

    #[test]
    fn other_server_errors_are_annotated_as_retryable() {
        let msg = describe_failure(&status(500, Some("Processing failed: bad header")));
        assert_eq!(
            msg,
            "Server error: Processing failed: bad header. You can retry processing."
        );

        let msg = describe_failure(&status(502, None));
        assert_eq!(msg, "Server error: Server error (502). You can retry processing.");
    }

    #[test]
    fn client_errors_pass_server_text_through() {
        let msg = describe_failure(&status(400, Some("Hum frequency must be 50 or 60 Hz")));
        assert_eq!(msg, "Hum frequency must be 50 or 60 Hz");

        assert_eq!(describe_failure(&status(404, None)), "Server error (404)");
        assert_eq!(describe_failure(&status(400, Some(""))), "Server error (400)");
    }

    #[test]
    fn transport_failure_has_generic_message() {
        let msg = describe_failure(&ServiceError::Transport("connection refused".into()));
        assert_eq!(msg, "Failed to process audio. Please try again.");
    }

    #[test]
    fn rejection_reports_size_with_two_decimals() {
        let r = Rejection::TooLarge { size_mib: 50.000_000_95 };
        assert_eq!(
            r.to_string(),
            "File too large. Maximum size is 50MB (current: 50.00MB)"
        );
    }
}
