//! Echo Codec
//!
//! Turns echo requests into ready-to-send ICMP buffers and raw received bytes back into typed
//! messages. Both directions are pure transforms over byte slices; the packet views and the
//! checksum routine come from [`pnet`](pnet).
//!
//! [pnet]: https://docs.rs/pnet/

use pnet::packet::icmp::{IcmpType, IcmpTypes};

pub use reply::decode;
pub use request::{encode, encode_reply};

mod reply;
mod request;

/// Length of the ICMP header: type, code, checksum, identifier and sequence number
pub const ICMP_HEADER_LEN: usize = 8;

/// Largest payload that fits into one IPv4 datagram next to the IP and ICMP headers
pub const MAX_PAYLOAD_LEN: usize = 65_535 - 20 - ICMP_HEADER_LEN;

/// Protocol number of ICMP for IPv4, the only family understood by the codec
pub const PROTOCOL_ICMP: u8 = 1;

/// Classification of a decoded message by its type field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    Request,
    Reply,

    // Anything else, carrying the raw type for display
    Other(u8),
}

impl EchoKind {
    /// The value of the ICMP type field for this kind
    pub fn icmp_type(self) -> IcmpType {
        match self {
            EchoKind::Request => IcmpTypes::EchoRequest,
            EchoKind::Reply => IcmpTypes::EchoReply,
            EchoKind::Other(ty) => IcmpType::new(ty),
        }
    }

    /// Human readable name of the ICMP type
    pub fn describe(self) -> &'static str {
        describe_type(self.icmp_type())
    }
}

#[allow(non_upper_case_globals)]
impl From<IcmpType> for EchoKind {
    fn from(ty: IcmpType) -> Self {
        match ty {
            IcmpTypes::EchoReply => Self::Reply,
            IcmpTypes::EchoRequest => Self::Request,
            other => Self::Other(other.0),
        }
    }
}

/// Name the ICMP types one is likely to see on a raw socket
#[allow(non_upper_case_globals)]
fn describe_type(ty: IcmpType) -> &'static str {
    use pnet::packet::icmp::IcmpTypes::*;
    match ty {
        EchoReply => "echo reply",
        EchoRequest => "echo request",
        DestinationUnreachable => "destination unreachable",
        SourceQuench => "source quench",
        RedirectMessage => "redirect",
        TimeExceeded => "time exceeded",
        ParameterProblem => "parameter problem",
        Timestamp => "timestamp request",
        TimestampReply => "timestamp reply",
        _ => "unknown type",
    }
}

/// A decoded ICMP message
///
/// For [`EchoKind::Request`] and [`EchoKind::Reply`] the identifier, sequence number and payload
/// are read from the echo body. For [`EchoKind::Other`] they are whatever occupies the same
/// offsets and carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    pub kind: EchoKind,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoMessage {
    /// Return `true` if this is an echo message carrying the given identifier
    pub fn is_echo_from(&self, identifier: u16) -> bool {
        match self.kind {
            EchoKind::Request | EchoKind::Reply => self.identifier == identifier,
            EchoKind::Other(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_icmp_type() {
        assert_eq!(EchoKind::from(IcmpTypes::EchoReply), EchoKind::Reply);
        assert_eq!(EchoKind::from(IcmpTypes::EchoRequest), EchoKind::Request);
        assert_eq!(EchoKind::from(IcmpTypes::TimeExceeded), EchoKind::Other(11));
        assert_eq!(EchoKind::Other(3).describe(), "destination unreachable");
        assert_eq!(EchoKind::Other(200).describe(), "unknown type");
    }

    #[test]
    fn round_trip_request() {
        let bytes = encode(0xbeef, 7, b"PING").unwrap();
        let msg = decode(PROTOCOL_ICMP, &bytes).unwrap();

        assert_eq!(msg.kind, EchoKind::Request);
        assert_eq!(msg.code, 0);
        assert_eq!(msg.identifier, 0xbeef);
        assert_eq!(msg.sequence, 7);
        assert_eq!(msg.payload, b"PING".to_vec());
        assert!(msg.is_echo_from(0xbeef));
        assert!(!msg.is_echo_from(0xbeee));
    }

    #[test]
    fn round_trip_across_identifiers_and_payloads() {
        let payloads: [&[u8]; 4] = [b"", b"a", b"odd", &[0xff; 57]];
        for &(id, seq) in &[(0u16, 0u16), (1, 1), (0xffff, 0xffff), (0x1234, 0x8000)] {
            for payload in payloads.iter() {
                let msg = decode(PROTOCOL_ICMP, &encode(id, seq, payload).unwrap()).unwrap();
                assert_eq!(msg.kind, EchoKind::Request);
                assert_eq!((msg.identifier, msg.sequence), (id, seq));
                assert_eq!(&msg.payload[..], *payload);
            }
        }
    }

    #[test]
    fn reply_preserves_payload() {
        for payload in [&b""[..], &b"PING"[..], &[0u8, 1, 2, 3, 4][..]].iter() {
            let bytes = encode_reply(42, 3, payload).unwrap();
            let msg = decode(PROTOCOL_ICMP, &bytes).unwrap();

            assert_eq!(msg.kind, EchoKind::Reply);
            assert_eq!(msg.identifier, 42);
            assert_eq!(msg.sequence, 3);
            assert_eq!(&msg.payload[..], *payload);
        }
    }
}
