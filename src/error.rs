//! Error types for punch operations and configuration loading.

use reqwest::StatusCode;

/// Everything that can go wrong while fetching a snapshot or submitting a punch.
///
/// None of these are fatal: the caller logs the error, keeps the current
/// state and lets the user try again.
#[derive(Debug, thiserror::Error)]
pub enum PunchError {
    // ─────────────────────────────────────────────────────────────────────
    // Remote failures
    // ─────────────────────────────────────────────────────────────────────
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // ─────────────────────────────────────────────────────────────────────
    // Client-side checks
    // ─────────────────────────────────────────────────────────────────────
    #[error("already checked in")]
    AlreadyCheckedIn,

    #[error("not checked in")]
    NotCheckedIn,

    #[error("checkout available in {remaining_secs}s")]
    CheckoutLocked { remaining_secs: i64 },

    #[error("missing {0}")]
    MissingSelection(&'static str),

    #[error("a note is required when leaving before the schedule is met")]
    NoteRequired,

    #[error("another punch is still being submitted")]
    Busy,

    #[error("auth token is not a valid header value")]
    InvalidToken,

    #[error("attendance data inconsistent: {0}")]
    Inconsistent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("unknown timezone: {0}")]
    Timezone(String),

    #[error("could not decrypt API token: {0}")]
    Decrypt(String),
}

pub type PunchResult<T> = Result<T, PunchError>;
