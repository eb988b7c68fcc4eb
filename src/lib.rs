//! # ECHOPROBE reachability probe
//!
//! This crate provides the components of a minimal ping: it sends ICMP echo requests to a single
//! IPv4 host, waits for the echo replies, and reports round-trip times and packet loss. It
//! consists of two major components:
//! - The echo codec in [`packet`], which turns echo requests into checksummed wire bytes and
//!   received bytes back into typed messages
//! - The [`Session`](session::Session), which owns the raw transport, drives one request/reply
//!   exchange per sequence number and accumulates the [`Stats`](stats::Stats) of the run
//!
//! Each request is timestamped right before it is handed to the transport and again right after
//! its reply has been received. Requests never overlap: the next one is only sent once the
//! outcome of the previous one is known.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use std::net::{IpAddr, Ipv4Addr};

use crate::error::Error;
use crate::session::{MatchPolicy, RunParams};

pub mod cli;
pub mod error;
pub mod logger;
pub mod packet;
pub mod report;
pub mod session;
pub mod stats;
pub mod transport;

/// Application configuration
///
/// The `Config` is produced by the command line interface and consumed by the binary, which
/// resolves the destination, opens a session and runs it with `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dest: Dest,
    pub params: RunParams,
    pub ttl: Option<u8>,
    pub bind: Ipv4Addr,
    pub policy: MatchPolicy,
}

/// Destination for ping
///
/// The user can choose to either provide an IP-address or a host name as destination for the ping.
/// Host names are looked up, addresses are reverse looked up for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dest {
    Ip(IpAddr),
    Host(String),
}

impl Dest {
    /// Turn the destination into an IPv4 address and a name to display
    ///
    /// # Errors
    ///
    /// IPv6 addresses are refused, as are host names without any IPv4 address. A failed lookup of
    /// a host name is reported as is; a failed reverse lookup only means the address is displayed
    /// as the name.
    pub fn resolve(&self) -> Result<(Ipv4Addr, String), Error> {
        // These functions are not used anywhere else in the application
        use dns_lookup::{lookup_addr, lookup_host};

        match self {
            Dest::Ip(IpAddr::V4(addr)) => {
                let host = match lookup_addr(&IpAddr::V4(*addr)) {
                    Ok(host) => {
                        info!("Resolved IP {} to host {}", addr, host);
                        host
                    }
                    Err(e) => {
                        debug!("Reverse lookup of {} failed: {}", addr, e);
                        addr.to_string()
                    }
                };
                Ok((*addr, host))
            }
            Dest::Ip(IpAddr::V6(addr)) => Err(Error::Resolve(format!(
                "{} is an IPv6 address, only IPv4 is supported",
                addr
            ))),
            Dest::Host(host) => {
                let addrs = lookup_host(host)
                    .map_err(|e| Error::Resolve(format!("{}: {}", host, e)))?;
                let addr = addrs
                    .into_iter()
                    .find_map(|addr| match addr {
                        IpAddr::V4(addr) => Some(addr),
                        IpAddr::V6(_) => None,
                    })
                    .ok_or_else(|| Error::Resolve(format!("{} has no IPv4 address", host)))?;

                info!("Resolved host {} to IP {}", host, addr);

                Ok((addr, host.clone()))
            }
        }
    }
}
