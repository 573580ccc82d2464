use std::borrow::Cow;
use std::collections::TryReserveError;

/// A type alias for handling errors throughout meshletize
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required buffer was missing or empty, or a size parameter was outside
    /// of its supported range.
    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>),

    /// A triangle, subset or adjacency entry referenced an element past the end
    /// of its table.
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    /// An error that occurred while allocating scratch memory
    #[error("memory error: {0}")]
    OutOfMemory(Cow<'static, str>),

    /// An unexpected I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[inline]
    pub(crate) fn invalid_argument(msg: &'static str) -> Self {
        Self::InvalidArgument(Cow::Borrowed(msg))
    }

    #[inline]
    pub(crate) fn invalid_argument_dynamic(msg: String) -> Self {
        Self::InvalidArgument(Cow::Owned(msg))
    }

    #[inline]
    pub(crate) fn out_of_range(msg: String) -> Self {
        Self::IndexOutOfRange(msg)
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Self::OutOfMemory(Cow::Owned(err.to_string()))
    }
}
