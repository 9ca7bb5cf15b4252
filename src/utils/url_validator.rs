//! Validation of URLs submitted for shortening.
//!
//! Input is checked but never rewritten: the short code is a hash of the
//! exact submitted string.

use url::Url;

/// Reasons a submitted URL is rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlValidationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

/// Trims surrounding whitespace and checks that the result is an absolute
/// HTTP(S) URL with a host.
///
/// # Errors
///
/// See [`UrlValidationError`].
///
/// # Examples
///
/// ```ignore
/// assert_eq!(validate_url("  https://example.com\n").unwrap(), "https://example.com");
/// assert!(validate_url("javascript:alert(1)").is_err());
/// ```
pub fn validate_url(input: &str) -> Result<&str, UrlValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(trimmed)
}
