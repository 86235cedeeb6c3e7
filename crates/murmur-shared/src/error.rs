use thiserror::Error;

/// A document arriving from the store failed boundary validation.
///
/// Such documents are quarantined by the subscriber rather than being
/// materialized with missing fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required field is absent from the document.
    #[error("document {document_id} is missing required field '{field}'")]
    MissingField {
        document_id: String,
        field: &'static str,
    },

    /// A field is present but carries the wrong JSON type.
    #[error("document {document_id} field '{field}' has the wrong type")]
    WrongType {
        document_id: String,
        field: &'static str,
    },

    /// The timestamp field holds a string that is not RFC 3339.
    #[error("document {document_id} has an unparseable timestamp: {value}")]
    BadTimestamp { document_id: String, value: String },
}
