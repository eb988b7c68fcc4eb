use crossbeam::channel::Receiver;
use std::thread::{self, JoinHandle};

use crate::session::{Outcome, ProbeEvent};

/// Render one event as a line of ping output
pub fn format_event(event: &ProbeEvent) -> String {
    let seq = event.sequence;
    match &event.outcome {
        Outcome::Success { rtt, peer, payload } => {
            let mut line = format!(
                "{} bytes from {}: icmp_seq={} time={:.3} ms",
                payload.len(),
                peer,
                seq,
                rtt.as_secs_f64() * 1000f64
            );
            // Binary payloads are left out
            match std::str::from_utf8(payload) {
                Ok(text) if !text.is_empty() => {
                    line.push_str(" payload=");
                    line.push_str(text);
                }
                _ => {}
            }
            line
        }
        Outcome::Timeout => format!("Request timeout for icmp_seq={}", seq),
        Outcome::SendError(e) => format!("Could not send icmp_seq={}: {}", seq, e),
        Outcome::DecodeError { peer, error } => {
            format!("Malformed reply from {}: icmp_seq={} {}", peer, seq, error)
        }
        Outcome::UnexpectedType { peer, kind, code } => format!(
            "From {}: icmp_seq={} {} (type={} code={})",
            peer,
            seq,
            kind.describe(),
            kind.icmp_type().0,
            code
        ),
    }
}

/// Print events as they come in
///
/// The printing thread ends once every `Sender` of the channel is gone, i.e. after the session
/// has finished its run. Join the handle before printing the summary to keep the output in order.
pub fn spawn_printer(events: Receiver<ProbeEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        trace!("Start printing thread for probe events");

        for event in events.iter() {
            println!("{}", format_event(&event));
        }

        trace!("Shutting down printing thread");
    })
}

/// Header line announcing a session
pub fn format_header(host: &str, addr: &str, payload_len: usize) -> String {
    format!("PING {} ({}): {} bytes of data", host, addr, payload_len)
}
