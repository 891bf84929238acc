//! Error taxonomy for every stage of the pipeline.
//!
//! Each component owns a small error enum; [`CycleError`] wraps them so the
//! convergence loop can propagate any of them with `?`. None of these errors
//! are recovered from inside the pipeline: the caller reports them and exits.

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Invalid substitution key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key has no characters at all.
    Empty,
    /// A character that is not an ASCII decimal digit.
    NonDigit { position: usize, found: char },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "key must contain at least one digit"),
            Self::NonDigit { position, found } => {
                write!(f, "key character {found:?} at position {position} is not a decimal digit")
            }
        }
    }
}

impl std::error::Error for KeyError {}

// ---------------------------------------------------------------------------
// Fetch configuration
// ---------------------------------------------------------------------------

/// Fetch settings that could never yield a usable batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Batches must hold a non-zero, even number of integers so every
    /// sample lands in exactly one folded word.
    BatchLen { len: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchLen { len } => {
                write!(f, "batch length {len} is invalid: must be even and at least 2")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Entropy status
// ---------------------------------------------------------------------------

/// A kernel entropy counter could not be opened, read or parsed.
#[derive(Debug)]
pub enum StatusError {
    Unavailable { path: PathBuf, source: io::Error },
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Random-source client
// ---------------------------------------------------------------------------

/// Failure while fetching or parsing a batch from the remote source.
#[derive(Debug)]
pub enum FetchError {
    /// Name resolution, socket creation or connect failed.
    Connect { host: String, port: u16, source: io::Error },
    /// The peer did not answer within the configured read timeout.
    Timeout { host: String },
    /// The upstream source throttled us. Never retried.
    QuotaExceeded { message: String },
    /// Fewer digit runs than requested were found in the body.
    Parse { expected: usize, found: usize },
    /// A digit run does not fit in a narrow (16-bit) integer.
    ValueOutOfRange { index: usize, value: String },
    /// No blank line separates the header block from the body.
    MissingBody,
    /// Non-success HTTP status without a recognisable error body.
    HttpStatus { code: u16 },
    /// The accumulated response exceeded the configured cap.
    ResponseTooLarge { limit: usize },
    /// Any other I/O failure while talking to the peer.
    Io(io::Error),
}

impl FetchError {
    /// Whether a fresh connection attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { host, port, source } => {
                write!(f, "cannot connect to {host}:{port}: {source}")
            }
            Self::Timeout { host } => write!(f, "timed out waiting for {host}"),
            Self::QuotaExceeded { message } => write!(f, "quota exceeded: {message}"),
            Self::Parse { expected, found } => {
                write!(f, "expected {expected} integers in response, found {found}")
            }
            Self::ValueOutOfRange { index, value } => {
                write!(f, "integer #{index} ({value}) does not fit in 16 bits")
            }
            Self::MissingBody => write!(f, "response has no header/body boundary"),
            Self::HttpStatus { code } => write!(f, "server answered with HTTP status {code}"),
            Self::ResponseTooLarge { limit } => {
                write!(f, "response exceeds the {limit} byte limit")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pool injector
// ---------------------------------------------------------------------------

/// Failure while handing a batch to the kernel random device.
#[derive(Debug)]
pub enum InjectError {
    /// The device node could not be opened for writing.
    DeviceUnavailable { path: PathBuf, source: io::Error },
    /// Opening the device or issuing the ioctl needs more privilege.
    PermissionDenied { path: PathBuf },
    /// The kernel refused the `RNDADDENTROPY` request.
    Rejected { path: PathBuf, source: io::Error },
    /// Entropy injection is only implemented for Linux.
    Unsupported,
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable { path, source } => {
                write!(f, "cannot open {}: {source}", path.display())
            }
            Self::PermissionDenied { path } => {
                write!(f, "permission denied on {}. Are you root?", path.display())
            }
            Self::Rejected { path, source } => {
                write!(f, "cannot call ioctl on {}: {source}", path.display())
            }
            Self::Unsupported => write!(f, "entropy injection is only supported on Linux"),
        }
    }
}

impl std::error::Error for InjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DeviceUnavailable { source, .. } | Self::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Convergence loop
// ---------------------------------------------------------------------------

/// Terminal failure of the convergence loop.
#[derive(Debug)]
pub enum CycleError {
    Status(StatusError),
    Fetch(FetchError),
    Inject(InjectError),
    /// The opt-in cycle cap was hit before the pool filled up.
    CycleLimitReached { cycles: u64 },
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(e) => write!(f, "{e}"),
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Inject(e) => write!(f, "{e}"),
            Self::CycleLimitReached { cycles } => {
                write!(f, "entropy pool still not full after {cycles} cycles")
            }
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Status(e) => Some(e),
            Self::Fetch(e) => Some(e),
            Self::Inject(e) => Some(e),
            Self::CycleLimitReached { .. } => None,
        }
    }
}

impl From<StatusError> for CycleError {
    fn from(e: StatusError) -> Self {
        Self::Status(e)
    }
}

impl From<FetchError> for CycleError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<InjectError> for CycleError {
    fn from(e: InjectError) -> Self {
        Self::Inject(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connect_errors_are_retryable() {
        let connect = FetchError::Connect {
            host: "example.org".into(),
            port: 80,
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(connect.is_retryable());
        assert!(
            !FetchError::QuotaExceeded {
                message: "Error: used your quota".into()
            }
            .is_retryable()
        );
        assert!(!FetchError::Timeout { host: "x".into() }.is_retryable());
    }

    #[test]
    fn test_cycle_error_chains_source() {
        use std::error::Error;
        let err = CycleError::from(InjectError::PermissionDenied {
            path: "/dev/random".into(),
        });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("Are you root?"));
    }

    #[test]
    fn test_key_error_mentions_position() {
        let err = KeyError::NonDigit {
            position: 3,
            found: 'x',
        };
        assert!(err.to_string().contains("position 3"));
    }

    #[test]
    fn test_config_error_names_length() {
        let err = ConfigError::BatchLen { len: 3 };
        assert!(err.to_string().contains("batch length 3"));
    }
}
