//! Error types for structural extraction.

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("could not find {0}")]
    NotFound(&'static str),
    #[error("<{tag}> is missing its `{attribute}` attribute")]
    MissingAttribute {
        tag: &'static str,
        attribute: &'static str,
    },
    #[error("schedule row {row} has a blank index and no earlier row to inherit one from")]
    MissingIndex { row: usize },
    #[error("invalid time range {text:?}, expected HHMM-HHMM")]
    InvalidTime { text: String },
}
