//! Command line interface

use clap::ArgMatches;
use std::error::Error;
use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use super::{Config, Dest};
use crate::logger::StdLogger;
use crate::packet::{ICMP_HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::session::{MatchPolicy, RunParams};

/// Largest payload that fits an Ethernet frame without fragmentation
const UNFRAGMENTED_PAYLOAD_LEN: usize = 1500 - 20 - ICMP_HEADER_LEN;

/// Application initialization
pub struct App;

impl App {
    /// Retrieve user input from command line
    ///
    /// The user can modify the following parameters of the application:
    /// - destination: Either as IPv4 address or domain name (required)
    /// - count: The number of echo requests (default 4)
    /// - timeout: The time to wait for each reply (default 3,000ms)
    /// - interval: The pause between two requests (default 1,000ms)
    /// - payload: The text carried by each request (default "PING")
    /// - size: Random payload of the given size instead of the text
    /// - ttl: The time to live for packets (default: system setting)
    /// - bind: The local address (only 0.0.0.0 is supported by the raw channel)
    /// - loose: Accept the first echo reply even if it was not meant for this process
    ///
    /// On invalid input the usage is printed and the process exits.
    pub fn parse_args() -> Result<Config, Box<dyn Error>> {
        let matches = Self::app().get_matches();
        Self::from_matches(&matches)
    }

    /// Same as [`parse_args`](App::parse_args), but from an explicit argument list and without
    /// exiting on invalid input
    pub fn parse_from<I, T>(args: I) -> Result<Config, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::app().get_matches_from_safe(args)?;
        Self::from_matches(&matches)
    }

    // Define CLI interface here
    fn app() -> clap::App<'static, 'static> {
        clap_app!(echoprobe =>
            (version: crate_version!())
            (about: "Send ICMP echo requests to a host and report round-trip times")
            (@arg destination: +required "Host name or IPv4 address")
            (@arg verbose: -v --verbose +multiple "Sets the level of verbosity")
            (@arg count: -c --count +takes_value "Number of echo requests to send")
            (@arg timeout: -o --timeout +takes_value "Time to wait for each reply (in ms)")
            (@arg interval: -i --interval +takes_value "Pause between requests (in ms)")
            (@arg payload: -p --payload +takes_value conflicts_with[size] "Payload text")
            (@arg size: -s --size +takes_value "Send random payload of this size (in Bytes)")
            (@arg ttl: -t --ttl +takes_value "Sets the time to live (TTL)")
            (@arg bind: -b --bind +takes_value "Local address to send from")
            (@arg loose: --loose "Accept the first echo reply, even if meant for another process"))
    }

    fn from_matches(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
        StdLogger::init(matches.occurrences_of("verbose"));

        // Default for count is 4 requests
        let count = matches.value_of("count").unwrap_or("4").parse::<usize>()?;

        // Default for timeout is 3 secs
        let timeout = matches
            .value_of("timeout")
            .unwrap_or("3000")
            .parse::<u64>()
            .map(Duration::from_millis)?;

        // Default for interval is 1 sec
        let interval = matches
            .value_of("interval")
            .unwrap_or("1000")
            .parse::<u64>()
            .map(Duration::from_millis)?;

        let payload = match matches.value_of("size") {
            Some(size) => {
                let size = size.parse::<usize>()?;
                (0..size).map(|_| rand::random::<u8>()).collect()
            }
            None => matches.value_of("payload").unwrap_or("PING").as_bytes().to_vec(),
        };

        let params = RunParams {
            count,
            timeout,
            interval,
            payload,
        };
        params.validate()?;

        if params.payload.len() > MAX_PAYLOAD_LEN {
            return Err(format!(
                "payload of {} bytes exceeds the maximum of {} bytes",
                params.payload.len(),
                MAX_PAYLOAD_LEN
            )
            .into());
        }
        if params.payload.len() > UNFRAGMENTED_PAYLOAD_LEN {
            warn!("Beware of the Maximum Transmission Unit supported by your network device");
            warn!("If you do not receive any responses, try a smaller packet size");
        }

        // Default for time to live is the system setting
        let ttl = match matches.value_of("ttl") {
            Some(val) => Some(val.parse::<u8>()?),
            None => None,
        };

        let bind = matches.value_of("bind").unwrap_or("0.0.0.0").parse::<Ipv4Addr>()?;

        let policy = if matches.is_present("loose") {
            info!("Accepting echo replies regardless of their identifier");
            MatchPolicy::FirstReply
        } else {
            MatchPolicy::Strict
        };

        // This function never returns with an error
        let dest = matches
            .value_of("destination")
            .map(|val| {
                if let Ok(ip) = val.parse::<Ipv4Addr>() {
                    return Dest::Ip(IpAddr::V4(ip));
                };
                if let Ok(ip) = val.parse::<Ipv6Addr>() {
                    return Dest::Ip(IpAddr::V6(ip));
                };

                // If the input provided is not a valid destination, it will fail
                // during dns resolution
                Dest::Host(val.to_string())
            })
            .ok_or("missing destination")?;

        trace!("Parsed configuration.");

        Ok(Config {
            dest,
            params,
            ttl,
            bind,
            policy,
        })
    }
}
