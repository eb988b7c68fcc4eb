use pnet::packet::icmp::{echo_reply::EchoReplyPacket, IcmpPacket};
use pnet::packet::Packet;
use pnet::packet::util::checksum;

use super::{EchoKind, EchoMessage, ICMP_HEADER_LEN, PROTOCOL_ICMP};
use crate::error::DecodeError;

/// Decode raw bytes into an ICMP message
///
/// The bytes must start at the ICMP header, i.e. the IP header has already been stripped by the
/// transport. Only ICMP for IPv4 is understood, `protocol` must be
/// [`PROTOCOL_ICMP`](super::PROTOCOL_ICMP).
///
/// A message with a valid header but a type other than echo request or echo reply is not an
/// error. It decodes to [`EchoKind::Other`] so the caller can report what it received.
///
/// # Errors
///
/// Fails if `protocol` is not ICMP for IPv4, if there are fewer bytes than the ICMP header holds,
/// or if the checksum does not match.
pub fn decode(protocol: u8, bytes: &[u8]) -> Result<EchoMessage, DecodeError> {
    if protocol != PROTOCOL_ICMP {
        return Err(DecodeError::Protocol(protocol));
    }

    if bytes.len() < ICMP_HEADER_LEN {
        return Err(DecodeError::Truncated { len: bytes.len() });
    }

    // Both views only require the 8 byte header to be present
    let (icmp, echo) = match (IcmpPacket::new(bytes), EchoReplyPacket::new(bytes)) {
        (Some(icmp), Some(echo)) => (icmp, echo),
        _ => return Err(DecodeError::Truncated { len: bytes.len() }),
    };

    let found = icmp.get_checksum();
    let expected = checksum(icmp.packet(), 1);
    if found != expected {
        return Err(DecodeError::Checksum { expected, found });
    }

    let kind = EchoKind::from(icmp.get_icmp_type());
    trace!("Decoded ICMP {} ({} bytes)", kind.describe(), bytes.len());

    // Identifier and sequence number sit at the same offsets in requests and replies
    Ok(EchoMessage {
        kind,
        code: icmp.get_icmp_code().0,
        identifier: echo.get_identifier(),
        sequence: echo.get_sequence_number(),
        payload: echo.payload().to_vec(),
    })
}
