use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

/// Summary statistics of one echo run
///
/// Zero-initialized when a run starts, updated once per sequence number by the session and
/// handed to the caller as a read-only snapshot at the end of the run.
///
/// Only the totals needed to report loss and round-trip times are kept, not the individual
/// results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    sent: usize,
    received: usize,
    total_rtt: Duration,
    min_rtt: Option<Duration>,
    max_rtt: Option<Duration>,

    // Sum of squared round-trip times in seconds, for the deviation
    sum_sq: f64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request that has left through the transport
    pub(crate) fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// Count a matching echo reply and its round-trip time
    pub(crate) fn record_reply(&mut self, rtt: Duration) {
        debug_assert!(self.received < self.sent, "reply without request");

        self.received += 1;
        self.total_rtt += rtt;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |min| min.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |max| max.max(rtt)));
        self.sum_sq += rtt.as_secs_f64().powi(2);
    }

    /// Number of requests handed to the transport without error
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Number of matching echo replies
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn lost(&self) -> usize {
        self.sent - self.received
    }

    /// Share of lost requests in percent, `0.0` if nothing was sent
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0f64;
        }
        self.lost() as f64 * 100f64 / self.sent as f64
    }

    pub fn total_rtt(&self) -> Duration {
        self.total_rtt
    }

    /// Mean round-trip time, `None` without any reply
    pub fn average_rtt(&self) -> Option<Duration> {
        if self.received == 0 {
            return None;
        }
        // Duration only divides by u32, beyond that go through floating point seconds
        match u32::try_from(self.received) {
            Ok(received) => Some(self.total_rtt / received),
            Err(_) => Some(Duration::from_secs_f64(
                self.total_rtt.as_secs_f64() / self.received as f64,
            )),
        }
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt
    }

    pub fn max_rtt(&self) -> Option<Duration> {
        self.max_rtt
    }

    /// Population standard deviation of the round-trip times, `None` without any reply
    pub fn mdev_rtt(&self) -> Option<Duration> {
        let avg = self.average_rtt()?.as_secs_f64();
        let variance = self.sum_sq / self.received as f64 - avg * avg;

        // Rounding can push the variance of identical samples slightly below zero
        Some(Duration::from_secs_f64(variance.max(0f64).sqrt()))
    }
}

fn as_millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000f64
}

/// Summary lines in the classic ping layout
///
/// Loss is reported in % with 1 decimal, times in ms with 3 decimals. The line with round-trip
/// times is left out if no reply arrived.
impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packets transmitted, {} packets received, {} lost, {:.1}% packet loss",
            self.sent,
            self.received,
            self.lost(),
            self.loss_percent()
        )?;

        if let (Some(min), Some(avg), Some(max), Some(mdev)) = (
            self.min_rtt,
            self.average_rtt(),
            self.max_rtt,
            self.mdev_rtt(),
        ) {
            write!(
                f,
                "\nround-trip min/avg/max/mdev = {:.3}/{:.3}/{:.3}/{:.3} ms",
                as_millis(min),
                as_millis(avg),
                as_millis(max),
                as_millis(mdev)
            )?;
        }
        Ok(())
    }
}
