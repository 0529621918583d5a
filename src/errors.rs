use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the BTC SPV proto.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Failure of a primitive read from the binary stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    #[error("not enough bytes for {0}")]
    TruncatedInput(&'static str),

    #[error("invalid encoding for {0}")]
    InvalidEncoding(&'static str),
}

/// Failure to frame or unframe a message envelope.
///
/// These indicate a corrupted or adversarial byte stream; a connection
/// that hits one cannot trust any subsequent bytes and must reset.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    #[error("message header is truncated")]
    TruncatedHeader,

    #[error("unknown network magic")]
    BadMagic,

    #[error("payload checksum mismatch")]
    BadChecksum,

    #[error("declared payload length does not match available bytes")]
    LengthMismatch,

    #[error("declared payload length exceeds maximum")]
    PayloadTooLarge,
}

/// Failure to decode a payload into its typed message.
///
/// Unlike [`FramingError`], a payload decode failure is recoverable: the
/// envelope's declared length already told the connection where the next
/// message starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("failed to parse field {name}: {source}")]
    Field {
        name: &'static str,
        source: StreamError,
    },

    #[error("field value out of range: {0}")]
    OutOfRange(&'static str),

    #[error("unsupported command {0:?}")]
    UnsupportedCommand(String),
}

/// Maps a primitive stream failure to a named-field decode failure.
pub(crate) fn field(name: &'static str) -> impl FnOnce(StreamError) -> DecodeError {
    move |source| DecodeError::Field { name, source }
}

/// Outcome of a failed partial merkle tree verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MerkleError {
    /// The proof is structurally valid but derives a different root.
    #[error("derived merkle root does not match the block header")]
    MerkleMismatch,

    /// The flag/hash sequence does not describe a well-formed tree.
    #[error("malformed partial merkle proof: {0}")]
    MalformedProof(&'static str),
}

/// Transport-level connection failure.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection already established")]
    AlreadyConnected,

    #[error("connection is not established")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
