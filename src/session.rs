//! Probe Session
//!
//! A `Session` owns one raw ICMP transport for as long as it lives and drives the echo exchange
//! with a single target: one request at a time, each followed by a bounded wait for its reply.
//! Every sequence number ends in exactly one [`Outcome`], which is published as a [`ProbeEvent`]
//! and folded into the [`Stats`] of the run.
//!
//! There is never more than one request outstanding, so no table of pending requests is needed to
//! attribute a reply. Overlapping probes would need one, keyed by sequence number and fed by a
//! separate receive loop.

use crossbeam::channel::Sender;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{DecodeError, Error};
use crate::packet::{self, EchoKind, EchoMessage, PROTOCOL_ICMP};
use crate::stats::Stats;
use crate::transport::{Datagram, IcmpTransport, Transport};

/// A thread-safe boolean representing the receipt of an signal interrupt
pub type InterruptSignal = Arc<AtomicBool>;

/// How often an interrupt is checked while sleeping between requests
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which received datagrams count as the reply to the outstanding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Only an echo reply carrying the session's identifier and the current sequence number is
    /// accepted. Other echo replies and the session's own requests seen on loopback are skipped
    /// and the wait goes on within the same deadline.
    Strict,

    /// The first echo reply is accepted, whoever it belongs to.
    FirstReply,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::Strict
    }
}

/// Parameters of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    /// Number of echo requests, sequence numbers run from 1 to `count`
    pub count: usize,
    /// How long to wait for the reply to each request
    pub timeout: Duration,
    /// Pause between one outcome and the next request
    pub interval: Duration,
    pub payload: Vec<u8>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            count: 4,
            timeout: Duration::from_secs(3),
            interval: Duration::from_secs(1),
            payload: b"PING".to_vec(),
        }
    }
}

impl RunParams {
    /// Reject parameters a run cannot be started with
    pub fn validate(&self) -> Result<(), Error> {
        if self.count == 0 {
            return Err(Error::Config("count must be positive".into()));
        }
        if self.timeout == Duration::from_secs(0) {
            return Err(Error::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Terminal state of one sequence number
#[derive(Debug)]
pub enum Outcome {
    /// A matching echo reply arrived
    Success {
        rtt: Duration,
        peer: IpAddr,
        payload: Vec<u8>,
    },

    /// Nothing acceptable arrived before the deadline
    Timeout,

    /// The request could not be handed to the transport and was not counted as sent
    SendError(io::Error),

    /// Bytes arrived that are not a valid ICMP message
    DecodeError { peer: IpAddr, error: DecodeError },

    /// A valid ICMP message arrived that is not the expected echo reply
    UnexpectedType {
        peer: IpAddr,
        kind: EchoKind,
        code: u8,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Success { .. } => true,
            _ => false,
        }
    }
}

/// Notification published once per sequence number
#[derive(Debug)]
pub struct ProbeEvent {
    pub sequence: u16,
    pub sent_at: Instant,
    pub outcome: Outcome,
}

// What to do with a decoded datagram while waiting for a reply
enum Verdict {
    Accept,
    Skip,
    Unexpected,
}

/// Echo exchange with one target over an exclusively owned transport
///
/// The transport is released when the session is dropped, whichever way the caller leaves.
pub struct Session<T: Transport = IcmpTransport> {
    target: Ipv4Addr,
    identifier: u16,
    policy: MatchPolicy,
    interrupt: Option<InterruptSignal>,
    transport: T,
}

impl Session<IcmpTransport> {
    /// Open a raw ICMP transport and create a session for `target` on top of it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the transport cannot be opened, most commonly for lack of
    /// raw socket privileges.
    pub fn open(target: Ipv4Addr, bind: Ipv4Addr, ttl: Option<u8>) -> Result<Self, Error> {
        let transport = IcmpTransport::open(bind, ttl).map_err(Error::Transport)?;
        Ok(Self::with_transport(target, transport))
    }
}

impl<T: Transport> Session<T> {
    /// Create a session on top of an already opened transport
    ///
    /// The identifier of all requests is derived from the process id, masked to 16 bits.
    pub fn with_transport(target: Ipv4Addr, transport: T) -> Self {
        Self {
            target,
            identifier: (std::process::id() & 0xffff) as u16,
            policy: MatchPolicy::default(),
            interrupt: None,
            transport,
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop the run early once `signal` is raised
    ///
    /// The signal is checked before each request and while pausing between requests. A request
    /// that is already out is still waited for.
    pub fn with_interrupt(mut self, signal: InterruptSignal) -> Self {
        self.interrupt = Some(signal);
        self
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn target(&self) -> Ipv4Addr {
        self.target
    }

    /// Send a sequence of echo requests
    ///
    /// Main loop of the session. For each sequence number one request is encoded and sent, then
    /// the session blocks until its reply arrives or `params.timeout` has passed since the send.
    /// The outcome is published on `events` and counted; a failed send does not count as sent
    /// and skips the wait. Between two requests the session sleeps for `params.interval`.
    ///
    /// Per-request failures never abort the run. If nobody listens on `events` any more the
    /// run continues regardless.
    ///
    /// # Errors
    ///
    /// Fails before the first request if the parameters are invalid or the payload cannot be
    /// encoded.
    pub fn run(&mut self, params: &RunParams, events: &Sender<ProbeEvent>) -> Result<Stats, Error> {
        params.validate()?;

        // Same payload for every request, so it either always encodes or never
        packet::encode(self.identifier, 0, &params.payload)?;

        debug!(
            "Start session with {} (id={:#06x}, {} requests)",
            self.target, self.identifier, params.count
        );

        let mut stats = Stats::new();
        for n in 1..=params.count {
            if self.is_interrupted() {
                info!("Interrupted after {} of {} requests", n - 1, params.count);
                break;
            }

            // Wraps around after 65535 requests
            let sequence = n as u16;
            let event = self.probe(sequence, params, &mut stats);
            let _ = events.send(event);

            if n < params.count {
                self.pause(params.interval);
            }
        }

        debug!("Session with {} done: {:?}", self.target, stats);
        Ok(stats)
    }

    /// Drive one sequence number to its outcome
    fn probe(&mut self, sequence: u16, params: &RunParams, stats: &mut Stats) -> ProbeEvent {
        let request = packet::encode(self.identifier, sequence, &params.payload);

        // Stop time and send packet out into the aether
        let sent_at = Instant::now();
        let sent = request
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
            .and_then(|request| self.transport.send_to(&request, self.target));

        let outcome = match sent {
            Ok(_) => {
                stats.record_sent();
                trace!("Sent icmp_seq={} to {}", sequence, self.target);
                self.await_reply(sequence, sent_at, sent_at + params.timeout)
            }
            Err(e) => {
                warn!("Error occurred during send of icmp_seq={}: {}", sequence, e);
                Outcome::SendError(e)
            }
        };

        match &outcome {
            Outcome::Success { rtt, .. } => stats.record_reply(*rtt),
            Outcome::Timeout => info!("Request icmp_seq={} timed out", sequence),
            Outcome::DecodeError { peer, error } => {
                warn!("Malformed reply from {} to icmp_seq={}: {}", peer, sequence, error)
            }
            Outcome::UnexpectedType { peer, kind, .. } => {
                warn!("Unexpected ICMP {} from {} to icmp_seq={}", kind.describe(), peer, sequence)
            }
            Outcome::SendError(_) => (),
        }

        ProbeEvent {
            sequence,
            sent_at,
            outcome,
        }
    }

    /// Wait for the reply to the outstanding request until `deadline`
    fn await_reply(&mut self, sequence: u16, sent_at: Instant, deadline: Instant) -> Outcome {
        loop {
            let Datagram { bytes, peer } = match self.transport.recv_until(deadline) {
                Ok(Some(datagram)) => datagram,
                Ok(None) => return Outcome::Timeout,

                // Nothing more will arrive in time if the socket itself fails
                Err(e) => {
                    error!("Error occurred while reading incoming: {}", e);
                    return Outcome::Timeout;
                }
            };
            let rtt = sent_at.elapsed();

            let msg = match packet::decode(PROTOCOL_ICMP, &bytes) {
                Ok(msg) => msg,
                Err(error) => return Outcome::DecodeError { peer, error },
            };

            match self.judge(&msg, sequence) {
                Verdict::Accept => {
                    return Outcome::Success {
                        rtt,
                        peer,
                        payload: msg.payload,
                    }
                }
                Verdict::Skip => debug!(
                    "Skipping ICMP {} from {} (id={:#06x}, seq={})",
                    msg.kind.describe(),
                    peer,
                    msg.identifier,
                    msg.sequence
                ),
                Verdict::Unexpected => {
                    return Outcome::UnexpectedType {
                        peer,
                        kind: msg.kind,
                        code: msg.code,
                    }
                }
            }
        }
    }

    /// Decide whether a decoded message answers the outstanding request
    fn judge(&self, msg: &EchoMessage, sequence: u16) -> Verdict {
        match (self.policy, msg.kind) {
            (MatchPolicy::FirstReply, EchoKind::Reply) => Verdict::Accept,
            (MatchPolicy::FirstReply, _) => Verdict::Unexpected,

            (MatchPolicy::Strict, EchoKind::Reply) => {
                if msg.is_echo_from(self.identifier) && msg.sequence == sequence {
                    Verdict::Accept
                } else {
                    Verdict::Skip
                }
            }
            // Our own request, looped back when pinging a local address
            (MatchPolicy::Strict, EchoKind::Request) if msg.is_echo_from(self.identifier) => {
                Verdict::Skip
            }
            (MatchPolicy::Strict, _) => Verdict::Unexpected,
        }
    }

    /// Sleep for `interval`, waking early if interrupted
    fn pause(&self, interval: Duration) {
        let signal = match &self.interrupt {
            Some(signal) => signal,
            None => return thread::sleep(interval),
        };

        let wake = Instant::now() + interval;
        while !signal.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= wake {
                break;
            }
            thread::sleep(POLL_INTERVAL.min(wake - now));
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .map_or(false, |signal| signal.load(Ordering::SeqCst))
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        trace!("Closing transport for session with {}", self.target);
    }
}
