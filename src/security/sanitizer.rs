//! Data sanitization for logging and input validation
//!
//! Tokens, emails and URLs pass through here before they are logged.
//! Sign-in and registration fields are validated before they are sent.

use thiserror::Error;

const MAX_SEGMENT_LENGTH: usize = 128;

/// Errors that can occur during input validation
#[derive(Debug, Error, PartialEq)]
pub enum SanitizerError {
    /// Input contains control characters or null bytes
    #[error("Invalid input for {0}: contains control characters")]
    InvalidInput(&'static str),

    /// Required field is empty
    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{0} exceeds maximum length of {1}")]
    TooLong(&'static str, usize),

    /// Input cannot be used as a single URL path segment
    #[error("{0} is not a valid path segment")]
    InvalidSegment(&'static str),
}

/// Sanitizer for sensitive data
pub struct Sanitizer;

impl Sanitizer {
    /// Sanitizes an email address for safe logging
    ///
    /// # Examples
    ///
    /// ```
    /// use newsfeed_client::security::Sanitizer;
    ///
    /// assert_eq!(Sanitizer::sanitize_email("john.doe@example.com"), "jo...@example.com");
    /// assert_eq!(Sanitizer::sanitize_email("a@b.com"), "***@b.com");
    /// ```
    pub fn sanitize_email(email: &str) -> String {
        if let Some(at_pos) = email.find('@') {
            let (local, domain) = email.split_at(at_pos);
            if local.chars().count() > 2 {
                let prefix: String = local.chars().take(2).collect();
                format!("{}...{}", prefix, domain)
            } else {
                format!("***{}", domain)
            }
        } else {
            "***".to_string()
        }
    }

    /// Sanitizes a token for safe logging, keeping only the last 4 characters
    ///
    /// # Examples
    ///
    /// ```
    /// use newsfeed_client::security::Sanitizer;
    ///
    /// assert_eq!(Sanitizer::sanitize_token("eyJhbGciOiJIUzI1NiJ9.payload.sig4"), "***sig4");
    /// assert_eq!(Sanitizer::sanitize_token("abc"), "****");
    /// ```
    pub fn sanitize_token(token: &str) -> String {
        let count = token.chars().count();
        if count > 4 {
            let tail: String = token.chars().skip(count - 4).collect();
            format!("***{}", tail)
        } else {
            "****".to_string()
        }
    }

    /// Removes query parameters and fragments from a URL
    ///
    /// ```
    /// use newsfeed_client::security::Sanitizer;
    ///
    /// assert_eq!(
    ///     Sanitizer::sanitize_url("https://api.example.com/api/chat/sessions/?limit=20"),
    ///     "https://api.example.com/api/chat/sessions/"
    /// );
    /// ```
    pub fn sanitize_url(url: &str) -> String {
        url.split(['?', '#']).next().unwrap_or(url).to_string()
    }

    /// Validates a user-supplied field such as a username or password
    pub fn validate_field(
        field: &'static str,
        input: &str,
        max_length: usize,
    ) -> Result<(), SanitizerError> {
        if input.is_empty() {
            return Err(SanitizerError::EmptyInput(field));
        }

        if input.chars().count() > max_length {
            return Err(SanitizerError::TooLong(field, max_length));
        }

        if input.chars().any(|c| c.is_control()) {
            return Err(SanitizerError::InvalidInput(field));
        }

        Ok(())
    }

    /// Validates an identifier that is interpolated into a URL path
    ///
    /// Only ASCII letters, digits, `-`, `_` and `.` are accepted, and `.`/`..`
    /// are rejected, so the value always names exactly one segment.
    pub fn validate_path_segment(field: &'static str, input: &str) -> Result<(), SanitizerError> {
        Self::validate_field(field, input, MAX_SEGMENT_LENGTH)?;

        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
        if !input.chars().all(allowed) || input == "." || input == ".." {
            return Err(SanitizerError::InvalidSegment(field));
        }
        Ok(())
    }
}
