//! Error taxonomy for the SANE wire protocol engine.
//!
//! [`Status`] is the wire-level enum; [`Error`] is the richer Rust-side
//! error a caller actually matches on. Only one kind, [`Error::Protocol`],
//! carries a [`Status`]. Everything else is a defect in the transport,
//! the stream framing, the caller's own state machine usage, or an option
//! value that disagrees with its descriptor.

use std::fmt;
use std::io;

/// A SANE status word. `Good` never appears inside
/// [`Error::Protocol`]; a `Good` status means the call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Good,
    Unsupported,
    Cancelled,
    DeviceBusy,
    Invalid,
    Eof,
    Jammed,
    NoDocs,
    CoverOpen,
    IoError,
    NoMem,
    AccessDenied,
    /// A wire value outside the range SANE 1.0.3 defines.
    Unknown(u32),
}

impl Status {
    pub const fn from_word(word: u32) -> Self {
        match word {
            0 => Self::Good,
            1 => Self::Unsupported,
            2 => Self::Cancelled,
            3 => Self::DeviceBusy,
            4 => Self::Invalid,
            5 => Self::Eof,
            6 => Self::Jammed,
            7 => Self::NoDocs,
            8 => Self::CoverOpen,
            9 => Self::IoError,
            10 => Self::NoMem,
            11 => Self::AccessDenied,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Self::Good => 0,
            Self::Unsupported => 1,
            Self::Cancelled => 2,
            Self::DeviceBusy => 3,
            Self::Invalid => 4,
            Self::Eof => 5,
            Self::Jammed => 6,
            Self::NoDocs => 7,
            Self::CoverOpen => 8,
            Self::IoError => 9,
            Self::NoMem => 10,
            Self::AccessDenied => 11,
            Self::Unknown(word) => word,
        }
    }

    pub const fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }

    /// `Ok(())` for `Good`, `Err(Error::Protocol(self))` otherwise.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_good() {
            Ok(())
        } else {
            Err(Error::Protocol(self))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Good => "good",
            Self::Unsupported => "operation is not supported",
            Self::Cancelled => "operation was cancelled",
            Self::DeviceBusy => "device is busy; retry later",
            Self::Invalid => "data is invalid (includes no such option)",
            Self::Eof => "no more data available",
            Self::Jammed => "document feeder jammed",
            Self::NoDocs => "document feeder out of documents",
            Self::CoverOpen => "scanner cover is open",
            Self::IoError => "error during device I/O",
            Self::NoMem => "out of memory",
            Self::AccessDenied => "access to resource has been denied",
            Self::Unknown(word) => return write!(f, "unknown status ({word})"),
        };
        f.write_str(msg)
    }
}

/// Every way a [`crate::session::Session`] or device operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any SANE RPC returned a status other than `Good`.
    #[error("SANE protocol error: {0}")]
    Protocol(Status),

    /// The control or data socket failed, timed out, or closed mid-reply.
    /// Fatal: the session must be discarded.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// A malformed or oversized data-channel record.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// The caller invoked an operation illegal for the session's current
    /// state (e.g. opening a device while one is already open).
    #[error("invalid operation for current session state: {0}")]
    InvalidState(&'static str),

    /// A value passed to `set` disagrees with the option descriptor's
    /// declared type.
    #[error("value does not match option constraint: {0}")]
    ConstraintViolation(&'static str),

    /// The credential provider could not answer an authorization
    /// challenge for the given resource.
    #[error("authorization denied for resource {0:?}")]
    AuthDenied(String),
}

impl Error {
    pub const fn invalid_state(msg: &'static str) -> Self {
        Self::InvalidState(msg)
    }

    pub const fn constraint_violation(msg: &'static str) -> Self {
        Self::ConstraintViolation(msg)
    }
}

/// Framing-level failures on the record-framed data channel.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// A record length word exceeded `i32::MAX` bytes.
    #[error("record of {0} bytes exceeds the supported maximum")]
    RecordTooLarge(u32),

    /// The stream produced more bytes than the frame's expected size.
    #[error("received {actual} bytes but expected at most {expected}")]
    TruncatedRead { expected: u32, actual: u32 },

    /// A 16-bit sample buffer had an odd number of bytes, so byte-pair
    /// swapping cannot be performed.
    #[error("16-bit sample buffer has odd length {0}")]
    UnalignedSamples(usize),

    /// A status byte other than end-of-file followed the end-of-records
    /// sentinel.
    #[error("stream ended with unexpected status {0}")]
    UnexpectedStatus(Status),

    /// A device-list entry's pointer word was a genuine null; the wire
    /// quirk of always treating it as present does not extend to silently
    /// skipping a real zero.
    #[error("device-list entry {0} had a null pointer")]
    NullDevicePointer(usize),
}
