//! Error type and Return values used by the Serialization.

use serde::ser;

/// Represents all possible errors that can happen during Serialization.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The value contains a type that is not directly representable in
    /// Solidity types.
    ///
    /// For example floating point numbers, maps and enums. We don't pick a
    /// representation for those on our own, as it would force a specific
    /// representation on the Solidity side.
    #[error("type is not representable in abi encoding: {0}")]
    TypeNotRepresentable(&'static str),
    /// The type is representable in Solidity but dynamic (`bytes`, `string`,
    /// `T[]`). Signed snapshots only ever contain static types, so the
    /// serializer does not implement head/tail encoding.
    #[error("dynamic type is not supported: {0}")]
    DynamicTypeNotSupported(&'static str),
    /// A byte string that does not fit into a single slot was given where a
    /// fixed-size `bytesN` value was expected.
    #[error("fixed-size bytes must be at most 32 bytes long, got {0}")]
    BytesTooLong(usize),
    /// Raised through [ser::Error::custom()], e.g. by hand-written
    /// `Serialize` implementations.
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: core::fmt::Display,
    {
        Error::Custom(msg.to_string())
    }
}

/// Alias for `Result` using the [Error] returned by the Serializer.
pub type Result<T> = core::result::Result<T, Error>;
