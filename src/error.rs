use thiserror::Error;

/// Errors produced by signature/delta production and delta reading.
///
/// Variants correspond to the failure kinds an octodiff-compatible tool
/// must distinguish: configuration problems are the caller's fault and
/// are reported before any I/O happens, while the remaining variants
/// reflect a malformed or truncated byte stream.
#[derive(Debug, Error)]
pub enum Error {
    /// A `chunk_size` outside `[128, 31744]` was requested.
    #[error("invalid signature chunk size: {0}")]
    InvalidConfig(String),

    /// A read, write, or seek on an underlying stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The signature stream's header or a chunk record was malformed.
    #[error("corrupt signature: {0}")]
    CorruptSignature(String),

    /// The delta stream's header or a command was malformed.
    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    /// A hash or rolling-checksum algorithm name was not recognized.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A caller-supplied callback passed to [`crate::delta_reader::DeltaReader::apply`]
    /// returned an error; it is surfaced unchanged.
    #[error(transparent)]
    Callback(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
