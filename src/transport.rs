//! Raw ICMP transport
//!
//! The session talks to the network through the [`Transport`] trait: send a buffer to an address,
//! and wait for the next datagram until a deadline. [`IcmpTransport`] is the real thing, a
//! [`pnet`](pnet) layer 4 channel for ICMP over IPv4. It needs raw socket privileges (root or
//! `CAP_NET_RAW` on Linux).
//!
//! [pnet]: https://docs.rs/pnet/

use pnet::packet::icmp::IcmpPacket;
use pnet::packet::Packet;
use pnet::transport::{TransportReceiver, TransportSender};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

/// Size of the receive buffer of the transport channel
const BUFFER_SIZE: usize = 4096;

/// A datagram handed over by the transport
///
/// `bytes` starts at the ICMP header, any IP header has already been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub peer: IpAddr,
}

/// Send and receive raw ICMP messages
///
/// A transport is owned by exactly one session. Whatever OS resources it holds are released when
/// it is dropped.
pub trait Transport {
    /// Send an encoded ICMP message to `dest`
    fn send_to(&mut self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize>;

    /// Block until the next datagram arrives or `deadline` passes
    ///
    /// Returns `Ok(None)` if the deadline passed without a datagram. Must not return later than
    /// shortly after the deadline.
    fn recv_until(&mut self, deadline: Instant) -> io::Result<Option<Datagram>>;
}

/// Raw ICMPv4 transport channel
pub struct IcmpTransport {
    tx: TransportSender,
    rx: TransportReceiver,
}

impl IcmpTransport {
    /// Open new channel for ICMP over IPv4
    ///
    /// If `ttl` is given it is applied to all outgoing packets, otherwise the system default is
    /// used.
    ///
    /// # Errors
    ///
    /// Errors during the construction of the pnet [`transport_channel`](tc) are transparently
    /// propagated back to the caller. Binding to a specific local address is not supported by the
    /// channel, so any `bind` other than `0.0.0.0` is refused.
    ///
    /// [tc]: https://docs.rs/pnet/latest/pnet/transport/fn.transport_channel.html
    pub fn open(bind: Ipv4Addr, ttl: Option<u8>) -> io::Result<Self> {
        use pnet::packet::ip::IpNextHeaderProtocols::Icmp;
        use pnet::transport::{self, TransportChannelType::*, TransportProtocol::*};

        if !bind.is_unspecified() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot bind raw ICMP channel to {}", bind),
            ));
        }

        trace!("Opening transport channel to transmit ICMP packets");

        let (mut tx, rx) = transport::transport_channel(BUFFER_SIZE, Layer4(Ipv4(Icmp)))?;
        if let Some(ttl) = ttl {
            info!("Set time to live: {}", ttl);
            tx.set_ttl(ttl)?;
        }
        Ok(Self { tx, rx })
    }
}

impl Transport for IcmpTransport {
    fn send_to(&mut self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize> {
        let packet = IcmpPacket::new(packet).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "buffer too short for an ICMP header")
        })?;
        self.tx.send_to(packet, IpAddr::V4(dest))
    }

    fn recv_until(&mut self, deadline: Instant) -> io::Result<Option<Datagram>> {
        use pnet::transport::icmp_packet_iter;

        let remaining = match socket_timeout(deadline, Instant::now()) {
            Some(remaining) => remaining,
            None => return Ok(None),
        };

        let mut incoming = icmp_packet_iter(&mut self.rx);
        match incoming.next_with_timeout(remaining)? {
            Some((packet, peer)) => Ok(Some(Datagram {
                bytes: packet.packet().to_vec(),
                peer,
            })),
            None => Ok(None),
        }
    }
}

/// Time left until `deadline` as a socket receive timeout, `None` once it has passed
///
/// The socket timeout only has microsecond resolution and a zero timeout means waiting forever,
/// so anything below one microsecond counts as expired.
fn socket_timeout(deadline: Instant, now: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(now);
    if remaining < Duration::from_micros(1) {
        None
    } else {
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuse_specific_bind_address() {
        // Fails before any socket is opened, so no privileges are needed
        let err = IcmpTransport::open(Ipv4Addr::new(192, 0, 2, 1), None)
            .err()
            .expect("Bind address should be refused");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn expired_below_one_microsecond() {
        let now = Instant::now();

        assert_eq!(socket_timeout(now, now), None);
        assert_eq!(socket_timeout(now + Duration::from_nanos(500), now), None);
        assert_eq!(socket_timeout(now + Duration::from_nanos(999), now), None);
        assert_eq!(socket_timeout(now, now + Duration::from_millis(5)), None);
        assert_eq!(
            socket_timeout(now + Duration::from_micros(1), now),
            Some(Duration::from_micros(1))
        );
        assert_eq!(
            socket_timeout(now + Duration::from_millis(50), now),
            Some(Duration::from_millis(50))
        );
    }
}
