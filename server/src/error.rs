//! Grepable error codes shared by relay-facing errors.

/// Grepable error code and retryable flag for structured error logs.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
