use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Item number outside the instrument
    #[error("{instrument}: item {item} does not exist")]
    IllegalQuestion { instrument: String, item: u32 },

    /// Rating outside the instrument scale
    #[error("{instrument}: rating {rating} for item {item} is outside the scale")]
    IllegalAnswer {
        instrument: String,
        item: u32,
        rating: u8,
    },

    /// Unanswered item
    #[error("{instrument}: item {item} has not been answered")]
    NotFulfilled { instrument: String, item: u32 },

    #[error("{instrument}: invalid subscale partition: {reason}")]
    InvalidPartition { instrument: String, reason: String },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("missing answers for instrument: {0}")]
    MissingInstrument(String),

    #[error("{field}: {value:?} is not an allowed value")]
    IllegalDemographic { field: String, value: String },

    #[error("missing demographic field: {0}")]
    MissingDemographic(String),

    #[error("{column}: cannot read {value:?}")]
    IllegalValue { column: String, value: String },

    #[error("record has no value for column {0}")]
    MissingColumn(String),

    #[error("storage holds a different schema (expected columns {expected:?}, found {found:?})")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("storage holds rows of schema version {found}, expected {expected}")]
    SchemaVersion { expected: i64, found: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage connection lock poisoned")]
    Poisoned,
}
