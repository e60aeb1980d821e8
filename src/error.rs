use thiserror::Error;

/// Errors produced by the registration and roster workflows.
///
/// Every failure is tagged at the boundary where it occurs and surfaced
/// to the caller; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum Error {
    /// A required form field is missing or empty. Caught before any
    /// network call; carries the field name.
    #[error("{0} is required")]
    ValidationRejected(String),

    /// The chosen category is not configured for the event.
    #[error("Unknown category \"{0}\" for event \"{1}\"")]
    UnknownCategory(String, String),

    /// The category is full per the most recent count.
    #[error("The {0} category is full")]
    CapacityExceeded(String),

    /// A submission is already in flight for this form session.
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    /// The proof-of-payment file could not be converted or stored.
    #[error("Failed to store proof of payment: {0}")]
    UploadFailure(String),

    /// The registration row was rejected by the table.
    #[error("Failed to save registration: {0}")]
    InsertFailure(String),

    /// A flight/status mutation was rejected.
    #[error("Failed to update registration {0}: {1}")]
    UpdateFailure(i64, String),

    /// The roster export could not be serialized. Local to the session;
    /// no network boundary is involved.
    #[error("Failed to export roster: {0}")]
    ExportFailure(String),

    /// Generic transport failure with no usable response.
    #[error("Network error: {0}")]
    NetworkFailure(String),

    /// The roster session has not presented the shared password.
    #[error("Not authenticated")]
    NotAuthenticated,
}
