use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not load data: {0}")]
    DataFetch(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

/// Failures from the authentication provider and role resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect email or password, please try again.")]
    InvalidCredential,

    #[error("Too many failed login attempts. Please try again later.")]
    TooManyRequests,

    #[error("No user role found in the database.")]
    NoRole,

    #[error("Unknown role '{0}'. Please contact the administrator.")]
    UnknownRole(String),

    #[error("Role lookup failed: {0}")]
    Lookup(String),

    #[error("Not signed in")]
    NotSignedIn,
}

pub type Result<T> = std::result::Result<T, FleetError>;
