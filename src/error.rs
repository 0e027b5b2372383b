use std::io;

/// Errors that can occur while reading a serialized set or map back into an [`Engine`](crate::engine::Engine).
///
/// Every other public operation in this crate is either infallible or panics on programmer error
/// (mixing node identifiers across engines, evaluating a terminal as a nonterminal); only loading
/// untrusted or possibly-truncated byte streams can fail in a way callers are expected to handle.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("not an IP set/map stream: bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("stream length field ({declared}) does not match bytes actually read ({actual})")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("truncated stream: expected {expected} more bytes, found {found}")]
    Truncated { expected: u64, found: u64 },

    #[error("node record references unassigned serialized id {0}")]
    DanglingReference(i32),

    #[error(transparent)]
    Io(#[from] io::Error),
}
