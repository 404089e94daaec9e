use thiserror::Error;

/// Error types for the scrobbling pipeline.
///
/// Variants split into two groups. [`ScrobbleError::Argument`],
/// [`ScrobbleError::Auth`], [`ScrobbleError::Read`] and [`ScrobbleError::Parse`]
/// are fatal: they stop the run before any row is submitted. A
/// [`ScrobbleError::Submission`] belongs to a single row and is counted by the
/// scrobble loop, which then moves on to the next row.
///
/// # Error Handling Examples
///
/// ```rust
/// use csv_scrobbler::ScrobbleError;
///
/// fn describe(err: &ScrobbleError) -> &'static str {
///     match err {
///         ScrobbleError::Auth { .. } => "check your username and password",
///         ScrobbleError::Submission { .. } => "Last.fm rejected this track",
///         ScrobbleError::Parse(_) | ScrobbleError::Read { .. } => "fix the input file",
///         _ => "something else went wrong",
///     }
/// }
///
/// let err = ScrobbleError::Parse("unbalanced quote".to_string());
/// assert_eq!(describe(&err), "fix the input file");
/// ```
#[derive(Error, Debug)]
pub enum ScrobbleError {
    /// Invalid or missing command line arguments.
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// Last.fm rejected the credentials during `auth.getMobileSession`.
    ///
    /// `payload` holds the complete JSON body the service answered with.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Last.fm error code (e.g. 4 for invalid credentials)
        code: i64,
        /// Human readable message from the service
        message: String,
        /// Raw response body
        payload: serde_json::Value,
    },

    /// Last.fm rejected a single `track.scrobble` call.
    #[error("Scrobble rejected: {message}")]
    Submission {
        /// Last.fm error code
        code: i64,
        /// Human readable message from the service
        message: String,
        /// Raw response body
        payload: serde_json::Value,
    },

    /// The CSV input could not be read.
    #[error("Failed to read {source_name}: {source}")]
    Read {
        /// File path, or `stdin`
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV input was malformed.
    #[error("Failed to parse CSV: {0}")]
    Parse(String),

    /// HTTP/network related errors.
    ///
    /// This includes connection failures, timeouts, DNS errors, and other
    /// low-level networking issues.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with something that is not the expected JSON.
    #[error("Unexpected response from Last.fm: {0}")]
    InvalidResponse(String),
}
