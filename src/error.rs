use thiserror::Error;

use crate::schema::RequiredField;

/// Fatal and user-choice failures raised by the intake pipeline.
///
/// Everything else (I/O, CSV decoding, CLI plumbing) travels as
/// `anyhow::Error` with context attached at the call site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Required column(s) still missing after mapping: {}", join_fields(.missing))]
    MissingColumns { missing: Vec<RequiredField> },
    #[error(
        "Error converting the date column: row {row} has '{value}'. Please ensure your dates are in a standard format."
    )]
    UnparseableDate { row: usize, value: String },
    #[error("Unknown required field '{0}'")]
    UnknownField(String),
    #[error("Invalid mapping '{0}': expected FIELD=COLUMN")]
    InvalidSelection(String),
}

fn join_fields(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}
