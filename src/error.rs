use std::error;
use std::fmt;
use std::io;

/// Fatal errors of an echo run
///
/// Anything that can go wrong with a single echo request (send failure, malformed reply, timeout)
/// is not an `Error` but an [`Outcome`](crate::session::Outcome) of that sequence. The variants
/// here abort the run before or while it is being set up.
#[derive(Debug)]
pub enum Error {
    /// Run parameters rejected before the first packet goes out
    Config(String),
    /// The destination could not be turned into an IPv4 address
    Resolve(String),
    /// The raw ICMP transport could not be opened or configured
    Transport(io::Error),
    /// The echo request cannot be encoded with the given payload
    Encode(EncodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "invalid configuration: {}", msg),
            Error::Resolve(msg) => write!(f, "could not resolve destination: {}", msg),
            Error::Transport(e) => write!(f, "could not open raw ICMP transport: {}", e),
            Error::Encode(e) => write!(f, "could not encode echo request: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

/// Inputs the codec refuses to turn into an echo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload does not fit into a single IPv4 datagram
    PayloadTooLarge { len: usize, max: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::PayloadTooLarge { len, max } => {
                write!(f, "payload of {} bytes exceeds the maximum of {} bytes", len, max)
            }
        }
    }
}

impl error::Error for EncodeError {}

/// Received bytes that cannot be an ICMP message
///
/// A well-formed message of a type we do not care about is not a decode error; it decodes to
/// [`EchoKind::Other`](crate::packet::EchoKind::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the 8 byte ICMP header
    Truncated { len: usize },
    /// The checksum carried in the header does not match the message
    Checksum { expected: u16, found: u16 },
    /// Bytes of a protocol other than ICMP for IPv4
    Protocol(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { len } => {
                write!(f, "truncated message of {} bytes", len)
            }
            DecodeError::Checksum { expected, found } => write!(
                f,
                "checksum mismatch (expected {:#06x}, found {:#06x})",
                expected, found
            ),
            DecodeError::Protocol(protocol) => write!(f, "unsupported protocol {}", protocol),
        }
    }
}

impl error::Error for DecodeError {}
