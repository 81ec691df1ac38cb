use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Everything that can go wrong between a scraped snapshot and a submitted
/// timetable. Empty datasets and empty filter views are normal states, not
/// errors, and have no variant here.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("malformed clock time {value:?}: {source}")]
    MalformedTime {
        value: String,
        #[source]
        source: chrono::format::ParseError,
    },

    #[error("unknown day code {0:?}")]
    UnknownDay(String),

    #[error("unknown class type {0:?}")]
    UnknownClassType(String),

    #[error("class ends at or before it starts ({start}..{end})")]
    InvertedInterval { start: u16, end: u16 },

    #[error("cannot read snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("schedule index {index} out of range, view holds {len}")]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("submission rejected: {0}")]
    Submission(String),
}
