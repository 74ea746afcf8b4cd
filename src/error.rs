use std::collections::TryReserveError;
use std::fmt;
pub use Error::*;

/// Everything that can go wrong in the pipeline
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Function called with invalid arguments, e.g. scale outside (0, 100]
    ValueOutOfRange = 100,
    /// Either the system/process really hit a limit, or some data like image size was ridiculously wrong
    OutOfMemory,
    /// Progress callback said to stop, or a newer conversion superseded this one
    Aborted,
    /// Fewer pixels than width×height
    BufferTooSmall,
    /// The image has no pixels yet (zero width or height). Try again once it's decoded
    NotReady,
    /// The codec could not make sense of the input bytes
    DecodeFailed,
    /// The codec failed to serialize the raster
    EncodeFailed,
    /// Input the pipeline has no way to handle, e.g. a palette over [`MAX_COLORS`](crate::MAX_COLORS)
    Unsupported,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Aborted => "ABORTED",
            Self::BufferTooSmall => "BUFFER_TOO_SMALL",
            Self::NotReady => "NOT_READY",
            Self::DecodeFailed => "DECODE_FAILED",
            Self::EncodeFailed => "ENCODE_FAILED",
            Self::Unsupported => "UNSUPPORTED",
        })
    }
}

impl From<TryReserveError> for Error {
    #[cold]
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

#[test]
fn display_codes() {
    assert_eq!("NOT_READY", NotReady.to_string());
    assert_eq!("ABORTED", Aborted.to_string());
    let boxed: Box<dyn std::error::Error> = Box::new(ValueOutOfRange);
    assert_eq!("VALUE_OUT_OF_RANGE", boxed.to_string());
}
