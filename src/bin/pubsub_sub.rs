//! Minimal subscribe smoke-test binary: `pubsub-sub <topic> [timeout_seconds]`.

use std::env;
use std::process::ExitCode;

use pubsub_bus::{Channel, SubscribeOutcome};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: pubsub-sub <topic> [timeout_seconds]");
        return ExitCode::FAILURE;
    }
    let topic = &args[1];
    let timeout_seconds: f64 = match args.get(2).map(|s| s.parse()) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            eprintln!("timeout_seconds must be a number");
            return ExitCode::FAILURE;
        }
        None => 0.0,
    };

    let mut channel = match Channel::open(topic) {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("failed to open channel: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = channel.open_for_reading() {
        eprintln!("failed to open channel for reading: {e}");
        return ExitCode::FAILURE;
    }

    let result = pubsub_bus::subscribe(&mut channel, timeout_seconds, |message| {
        println!(
            "[{}] {}: {}",
            message.id,
            message.topic,
            String::from_utf8_lossy(&message.content)
        );
    });

    let exit = match result {
        Ok(SubscribeOutcome::Processed(count)) => {
            println!("processed {count} message(s)");
            ExitCode::SUCCESS
        }
        Ok(SubscribeOutcome::Signaled) => {
            println!("stopped by signal");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("subscribe failed: {e}");
            ExitCode::FAILURE
        }
    };

    if let Err(e) = channel.close() {
        eprintln!("failed to close channel: {e}");
    }
    exit
}
