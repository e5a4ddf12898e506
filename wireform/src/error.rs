use thiserror::Error;

/// The single failure kind surfaced by every encode/decode operation.
///
/// Messages identify the offending type identifier and the operation that
/// failed. No error is recovered internally: partial output written before an
/// encode failure is not unwound, and a decode failure occurs before any
/// user-visible value is returned.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A type identifier is neither registered nor constructible.
    #[error("unknown type `{id}` while {op}")]
    UnknownType { id: String, op: &'static str },

    /// The allow-list rejected a decode target.
    #[error("type `{id}` is not an allowed decode target")]
    DisallowedType { id: String },

    /// A value does not match the declared schema (missing or unexpected
    /// field, wrong element count, bad arity, unknown enum variant).
    #[error("schema mismatch for `{id}`: {detail}")]
    SchemaMismatch { id: String, detail: String },

    /// Malformed tokens in the underlying wire format.
    #[error("malformed {format} input: {detail}")]
    WireFormat { format: &'static str, detail: String },

    /// A value could not be reconstructed or was of an unexpected runtime
    /// type.
    #[error("cannot reflect `{id}`: {detail}")]
    Reflection { id: String, detail: String },

    /// An underlying stream error, passed through.
    #[error("stream error: {0}")]
    StreamIo(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn unknown(id: impl Into<String>, op: &'static str) -> Self {
        Self::UnknownType { id: id.into(), op }
    }

    pub(crate) fn disallowed(id: impl Into<String>) -> Self {
        Self::DisallowedType { id: id.into() }
    }

    pub(crate) fn schema(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            id: id.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn wire(format: &'static str, detail: impl Into<String>) -> Self {
        Self::WireFormat {
            format,
            detail: detail.into(),
        }
    }

    pub(crate) fn reflection(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Reflection {
            id: id.into(),
            detail: detail.into(),
        }
    }
}
