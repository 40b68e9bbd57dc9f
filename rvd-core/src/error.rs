/// Error types for the surveillance data library
use thiserror::Error;

/// Main error type for loading and parsing surveillance data
#[derive(Error, Debug)]
pub enum RvdError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Bad response status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Failed to decode a JSON payload
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Failed to read an SVG chart
    #[error("Failed to parse SVG: {0}")]
    SvgParse(#[from] quick_xml::Error),

    /// Failed to read or write a local file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A calendar week label did not resolve to a date
    #[error("Invalid calendar week label: {0}")]
    InvalidWeekLabel(String),

    /// A record is missing a field the caller required
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A diagnosis code that is not one of the SARI columns
    #[error("Unknown diagnosis: {0}")]
    UnknownDiagnosis(String),

    /// A feed was fetched but yielded nothing usable
    #[error("No data in {0}")]
    EmptyFeed(String),

    /// Every data source of a load cycle failed
    #[error("No data source could be loaded ({attempted} attempted)")]
    AllSourcesFailed { attempted: usize },
}

/// Type alias for Results using RvdError
pub type Result<T> = std::result::Result<T, RvdError>;
