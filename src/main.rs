#[macro_use]
extern crate log;

use crossbeam::channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};

use echoprobe::{
    cli::App,
    report,
    session::{InterruptSignal, Session},
};

fn main() {
    let config = match App::parse_args() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not parse provided argument: {}", e);
            std::process::exit(1);
        }
    };

    let (addr, host) = match config.dest.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    trace!("Set up new probe session");

    let signal = InterruptSignal::new(AtomicBool::new(false));
    let set_signal = signal.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        set_signal.store(true, Ordering::SeqCst);
        trace!("Registered signal interrupt -- Signalling shut down to session")
    }) {
        warn!("Could not install interrupt handler: {}", e);
    }

    let mut session = match Session::open(addr, config.bind, config.ttl) {
        Ok(session) => session.with_policy(config.policy).with_interrupt(signal),
        Err(e) => {
            error!("Could not configure ping session: {}", e);
            warn!("Sending raw ICMP packets requires root or the CAP_NET_RAW capability");
            std::process::exit(1);
        }
    };

    println!(
        "{}",
        report::format_header(&host, &addr.to_string(), config.params.payload.len())
    );

    trace!("Start ping session");

    let (events, incoming) = unbounded();
    let printer = report::spawn_printer(incoming);
    let result = session.run(&config.params, &events);

    // Closes the transport and lets the printer drain the channel
    drop(session);
    drop(events);
    if printer.join().is_err() {
        warn!("Printing thread panicked");
    }

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            error!("An error occurred during a running ping session: {}", e);
            std::process::exit(1);
        }
    };

    trace!("Successfully ended ping session");

    println!();
    println!("--- {} ping statistics ---", host);
    println!("{}", stats);

    trace!("Shutting down...");
}
