// error.rs: fatal conditions of a scrub run
use thiserror::Error;

/// Every variant aborts the run. Partial sanitization is never an option.
#[derive(Debug, Error)]
pub enum ScrubError {
    #[error("malformed COPY header: {0}")]
    MalformedHeader(String),

    #[error("row in {table} has {found} fields, header declares {expected} (input line {line})")]
    RowShape { table: String, expected: usize, found: usize, line: u64 },

    #[error("malformed JSON in column {column}: {source}")]
    MalformedJson {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize JSON for column {column}: {source}")]
    JsonSerialize {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("column {0} holds JSON that is not an object")]
    JsonNotObject(String),

    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),

    #[error("invalid policy config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScrubError>;
