use pnet::packet::icmp::{echo_request::MutableEchoRequestPacket, IcmpCode, IcmpType, IcmpTypes};
use pnet::packet::Packet;
use pnet::packet::util::checksum;

use super::{ICMP_HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::EncodeError;

/// Encode an echo request
///
/// Produces type 8, code 0, the given identifier and sequence number in network byte order,
/// followed by the payload verbatim. The checksum is computed over the whole message and is
/// already in place, so the buffer can be handed to the transport as is.
///
/// # Errors
///
/// Fails if the payload does not fit into a single IPv4 datagram.
pub fn encode(identifier: u16, sequence: u16, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_echo(IcmpTypes::EchoRequest, identifier, sequence, payload)
}

/// Encode an echo reply
///
/// Same layout as [`encode`] with type 0. This is what a responder sends back for a request it
/// received, with identifier, sequence number and payload copied over.
pub fn encode_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_echo(IcmpTypes::EchoReply, identifier, sequence, payload)
}

// Echo request and echo reply share the same layout, only the type field differs
fn encode_echo(
    icmp_type: IcmpType,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    // The buffer always covers the header, so the view can be created
    let mut packet = match MutableEchoRequestPacket::owned(vec![0; ICMP_HEADER_LEN + payload.len()])
    {
        Some(packet) => packet,
        None => unreachable!("buffer is at least one header long"),
    };
    packet.set_icmp_type(icmp_type);
    packet.set_icmp_code(IcmpCode::new(0));
    packet.set_identifier(identifier);
    packet.set_sequence_number(sequence);
    packet.set_payload(payload);

    // The checksum field is the second 16-bit word and is skipped while summing
    let sum = checksum(packet.packet(), 1);
    packet.set_checksum(sum);

    Ok(packet.packet().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_icmp_echo_request_packet() {
        let packet = encode(1234, 1, b"PING").expect("Failed encoding echo request");

        assert_eq!(
            packet,
            vec![0x08, 0x00, 0x54, 0x9c, 0x04, 0xd2, 0x00, 0x01, b'P', b'I', b'N', b'G']
        );
    }

    #[test]
    fn header_layout() {
        let packet = encode(0x0102, 0x0304, &[0u8; 20]).unwrap();

        // The 5 - 6th byte are reserved for the identifier
        assert_eq!(&packet[4..6], &[0x01, 0x02]);

        // The 7 - 8th byte are reserved for the sequence number
        assert_eq!(&packet[6..8], &[0x03, 0x04]);

        // 20 bytes payload + 8 bytes header
        assert_eq!(packet.len(), 28);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode(9, 9, b"same").unwrap(), encode(9, 9, b"same").unwrap());
        assert_eq!(encode(9, 9, b"").unwrap().len(), ICMP_HEADER_LEN);
    }

    #[test]
    fn checksum_matches_header() {
        // Odd length payloads are padded with a zero byte for the sum
        let packet = encode(0xabcd, 17, b"odd").unwrap();
        assert_eq!(checksum(&packet, 1), u16::from_be_bytes([packet[2], packet[3]]));
    }

    #[test]
    fn reply_differs_in_type_only() {
        let request = encode(5, 6, b"PING").unwrap();
        let reply = encode_reply(5, 6, b"PING").unwrap();

        assert_eq!(reply[0], 0);
        assert_eq!(&reply[4..], &request[4..]);

        // Type 8 is worth 0x0800 in the sum
        let request_sum = u16::from_be_bytes([request[2], request[3]]);
        let reply_sum = u16::from_be_bytes([reply[2], reply[3]]);
        assert_eq!(reply_sum, request_sum.wrapping_add(0x0800));
    }

    #[test]
    fn reject_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            encode(1, 1, &payload),
            Err(EncodeError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1,
                max: MAX_PAYLOAD_LEN,
            })
        );
        assert!(encode(1, 1, &payload[1..]).is_ok());
    }
}
